//! Module statement rewriting.
//!
//! After type stripping, every module still carries its `import`/`export`
//! statements. This pass parses the JavaScript, replaces each module-level
//! statement with plain code against the registry's `require`/`exports`
//! pair, and leaves every other byte of the source untouched. The spans
//! oxc reports are byte offsets, so the rewrite is a straight splice.
//!
//! Alongside the rewritten body it collects the specifiers the module
//! requests and the export surface it presents, which is all the graph
//! walker needs to link the module without a second parse.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier,
    Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::config::is_identifier_shaped;
use crate::error::{BuildError, BuildResult};
use crate::shim::js_string;

pub struct RewriteOptions<'a> {
    /// Bare specifiers the host satisfies instead of the registry.
    pub externals: &'a [String],
    /// When set, a default import from an external binds the module object
    /// itself. Hosts that hand out CommonJS modules through `require` have
    /// no separate `default` slot.
    pub cjs_externals: bool,
}

/// The exports a module declares, before `export *` targets are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSurface {
    pub named: Vec<String>,
    pub has_default: bool,
    /// Specifiers of `export * from` statements, in source order.
    pub stars: Vec<String>,
}

pub struct RewrittenModule {
    /// Factory body: runs with `require`, `module` and `exports` in scope.
    pub body: String,
    /// Deduplicated specifiers this module imports, in source order.
    pub requests: Vec<String>,
    pub surface: ExportSurface,
}

pub fn rewrite_module(
    source: &str,
    path: &Path,
    options: &RewriteOptions,
) -> BuildResult<RewrittenModule> {
    let allocator = Allocator::default();
    let parser_ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !parser_ret.errors.is_empty() {
        let errors: Vec<String> = parser_ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(BuildError::Compile {
            path: path.to_path_buf(),
            message: format!("parse errors: {}", errors.join("; ")),
        });
    }

    let mut patches: Vec<(Span, String)> = Vec::new();
    let mut requests: Vec<String> = Vec::new();
    let mut surface = ExportSurface::default();
    let mut temps = 0usize;

    for stmt in &parser_ret.program.body {
        match stmt {
            Statement::ImportDeclaration(import) => {
                if import.import_kind.is_type() {
                    patches.push((import.span, String::new()));
                    continue;
                }
                let module = import.source.value.as_str();
                push_request(&mut requests, module);

                let mut text = String::new();
                match &import.specifiers {
                    Some(specifiers) if !specifiers.is_empty() => {
                        let handle = next_temp(&mut temps);
                        text.push_str(&format!(
                            "const {handle} = require({});",
                            js_string(module)
                        ));
                        let module_is_default = options.cjs_externals
                            && options.externals.iter().any(|e| e == module);
                        for specifier in specifiers {
                            match specifier {
                                ImportDeclarationSpecifier::ImportSpecifier(named) => {
                                    if named.import_kind.is_type() {
                                        continue;
                                    }
                                    text.push_str(&format!(
                                        " const {} = {};",
                                        named.local.name,
                                        member(&handle, named.imported.name().as_str())
                                    ));
                                }
                                ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                                    if module_is_default {
                                        text.push_str(&format!(
                                            " const {} = {handle};",
                                            default.local.name
                                        ));
                                    } else {
                                        text.push_str(&format!(
                                            " const {} = {handle}.default;",
                                            default.local.name
                                        ));
                                    }
                                }
                                ImportDeclarationSpecifier::ImportNamespaceSpecifier(star) => {
                                    text.push_str(&format!(
                                        " const {} = {handle};",
                                        star.local.name
                                    ));
                                }
                            }
                        }
                    }
                    // Side-effect import.
                    _ => text.push_str(&format!("require({});", js_string(module))),
                }
                patches.push((import.span, text));
            }

            Statement::ExportNamedDeclaration(export) => {
                if export.export_kind.is_type() {
                    patches.push((export.span, String::new()));
                } else if let Some(decl) = &export.declaration {
                    // `export const x = ...` keeps the declaration as a local
                    // binding and mirrors each declared name onto exports.
                    let mut text = slice(source, decl.span()).to_string();
                    for name in declared_names(decl) {
                        text.push_str(&format!(" {} = {name};", member("exports", &name)));
                        note_named(&mut surface, name);
                    }
                    patches.push((export.span, text));
                } else if let Some(from) = &export.source {
                    let module = from.value.as_str();
                    push_request(&mut requests, module);
                    let handle = next_temp(&mut temps);
                    let mut text =
                        format!("const {handle} = require({});", js_string(module));
                    for specifier in &export.specifiers {
                        if specifier.export_kind.is_type() {
                            continue;
                        }
                        let exported = specifier.exported.name().to_string();
                        let local = specifier.local.name().to_string();
                        text.push_str(&format!(
                            " {} = {};",
                            member("exports", &exported),
                            member(&handle, &local)
                        ));
                        if exported == "default" {
                            surface.has_default = true;
                        } else {
                            note_named(&mut surface, exported);
                        }
                    }
                    patches.push((export.span, text));
                } else {
                    let mut text = String::new();
                    for specifier in &export.specifiers {
                        if specifier.export_kind.is_type() {
                            continue;
                        }
                        let exported = specifier.exported.name().to_string();
                        let local = specifier.local.name().to_string();
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(&format!("{} = {local};", member("exports", &exported)));
                        if exported == "default" {
                            surface.has_default = true;
                        } else {
                            note_named(&mut surface, exported);
                        }
                    }
                    patches.push((export.span, text));
                }
            }

            Statement::ExportDefaultDeclaration(export) => {
                surface.has_default = true;
                let text = match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        let decl = slice(source, func.span);
                        match &func.id {
                            Some(id) => format!("{decl}\nexports.default = {};", id.name),
                            None => format!("exports.default = ({decl});"),
                        }
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        let decl = slice(source, class.span);
                        match &class.id {
                            Some(id) => format!("{decl}\nexports.default = {};", id.name),
                            None => format!("exports.default = ({decl});"),
                        }
                    }
                    kind => match kind.as_expression() {
                        Some(expr) => {
                            format!("exports.default = ({});", slice(source, expr.span()))
                        }
                        // TS-only declaration, erased by the transform.
                        None => String::new(),
                    },
                };
                patches.push((export.span, text));
            }

            Statement::ExportAllDeclaration(export) => {
                if export.export_kind.is_type() {
                    patches.push((export.span, String::new()));
                    continue;
                }
                let module = export.source.value.as_str();
                push_request(&mut requests, module);
                match &export.exported {
                    Some(alias) => {
                        let name = alias.name().to_string();
                        patches.push((
                            export.span,
                            format!("{} = require({});", member("exports", &name), js_string(module)),
                        ));
                        note_named(&mut surface, name);
                    }
                    None => {
                        surface.stars.push(module.to_string());
                        patches.push((
                            export.span,
                            format!("__riptide_star(exports, require({}));", js_string(module)),
                        ));
                    }
                }
            }

            _ => {}
        }
    }

    patches.sort_by_key(|(span, _)| span.start);
    let mut body = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for (span, replacement) in &patches {
        body.push_str(&source[cursor..span.start as usize]);
        body.push_str(replacement);
        cursor = span.end as usize;
    }
    body.push_str(&source[cursor..]);

    Ok(RewrittenModule { body, requests, surface })
}

fn slice(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

fn next_temp(counter: &mut usize) -> String {
    let handle = format!("__riptide_m{counter}");
    *counter += 1;
    handle
}

fn push_request(requests: &mut Vec<String>, specifier: &str) {
    if !requests.iter().any(|r| r == specifier) {
        requests.push(specifier.to_string());
    }
}

fn note_named(surface: &mut ExportSurface, name: String) {
    if !surface.named.contains(&name) {
        surface.named.push(name);
    }
}

/// Member access that survives arbitrary export names.
fn member(object: &str, name: &str) -> String {
    if is_identifier_shaped(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", js_string(name))
    }
}

/// Every name a declaration binds, including destructuring patterns.
fn declared_names(decl: &Declaration) -> Vec<String> {
    let mut names = Vec::new();
    match decl {
        Declaration::VariableDeclaration(var) => {
            for declarator in &var.declarations {
                collect_binding_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                names.push(id.name.to_string());
            }
        }
        _ => {}
    }
    names
}

fn collect_binding_names(pattern: &BindingPattern, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => names.push(id.name.to_string()),
        BindingPattern::ObjectPattern(object) => {
            for property in &object.properties {
                collect_binding_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_binding_names(element, names);
            }
            if let Some(rest) = &array.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assignment) => {
            collect_binding_names(&assignment.left, names);
        }
    }
}
