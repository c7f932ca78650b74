//! Bundle assembly.
//!
//! The graph walker hands this module a list of rewritten factories; the
//! linker wraps them in a small module registry and one of two shells:
//!
//! * browser profile: an ES module that hoists the external imports,
//!   instantiates the entry and re-exports its surface, or
//! * native profile: an expression-position IIFE that assigns the entry's
//!   exports object to a well-known global, with externals satisfied
//!   through the scope's own `require` when one exists.
//!
//! The assembled text is reparsed before it ships, so a bug in assembly
//! surfaces as a build error here rather than a runtime error in the host.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::config::is_js_identifier;
use crate::error::{BuildError, BuildResult};
use crate::shim::js_string;

use super::ResolvedSurface;

/// One rewritten module ready for the registry.
pub struct ModulePiece<'a> {
    pub id: usize,
    /// Specifier to module id, for this module's `require` calls.
    pub map: &'a BTreeMap<String, usize>,
    pub body: &'a str,
}

const RUNTIME: &str = r#"var __riptide_modules = Object.create(null);
var __riptide_cache = Object.create(null);
function __riptide_define(id, map, factory) {
  __riptide_modules[id] = { map: map, factory: factory };
}
function __riptide_require(id) {
  var cached = __riptide_cache[id];
  if (cached) return cached.exports;
  var record = __riptide_modules[id];
  var module = { exports: {} };
  __riptide_cache[id] = module;
  Object.defineProperty(module.exports, "__esModule", { value: true });
  record.factory(function (name) {
    return name in record.map ? __riptide_require(record.map[name]) : __riptide_external(name);
  }, module, module.exports);
  return module.exports;
}
function __riptide_star(target, source) {
  for (var key in source) {
    if (key !== "default" && key !== "__esModule" && !(key in target)) target[key] = source[key];
  }
  return target;
}
"#;

/// ES module shell for plugin artifacts.
pub fn assemble_browser(
    pieces: &[ModulePiece<'_>],
    externals: &BTreeSet<String>,
    surface: &ResolvedSurface,
    entry: &Path,
) -> BuildResult<String> {
    for name in &surface.named {
        if !is_js_identifier(name) {
            return Err(BuildError::InvalidExportName {
                path: entry.to_path_buf(),
                name: name.clone(),
            });
        }
    }

    let mut out = String::new();
    for (index, external) in externals.iter().enumerate() {
        out.push_str(&format!(
            "import * as __riptide_ext{index} from {};\n",
            js_string(external)
        ));
    }
    out.push_str("var __riptide_externals = Object.create(null);\n");
    for (index, external) in externals.iter().enumerate() {
        out.push_str(&format!(
            "__riptide_externals[{}] = __riptide_ext{index};\n",
            js_string(external)
        ));
    }
    out.push_str(
        "function __riptide_external(name) {\n  var provided = __riptide_externals[name];\n  if (provided) return provided;\n  throw new Error(\"Module '\" + name + \"' is not provided by the host\");\n}\n",
    );
    out.push_str(RUNTIME);
    push_defines(&mut out, pieces);
    out.push_str("var __riptide_entry = __riptide_require(0);\n");
    if surface.has_default {
        out.push_str("export default __riptide_entry.default;\n");
    }
    for name in &surface.named {
        out.push_str(&format!("export const {name} = __riptide_entry.{name};\n"));
    }
    for external in &surface.external_stars {
        out.push_str(&format!("export * from {};\n", js_string(external)));
    }
    Ok(out)
}

/// IIFE shell for native sub-modules, evaluated inside an isolated scope.
pub fn assemble_native(pieces: &[ModulePiece<'_>], namespace: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("var {namespace} = (function () {{\n"));
    out.push_str(
        "function __riptide_external(name) {\n  if (typeof require === \"function\") return require(name);\n  throw new Error(\"Module '\" + name + \"' is not available in this scope\");\n}\n",
    );
    out.push_str(RUNTIME);
    push_defines(&mut out, pieces);
    out.push_str("return __riptide_require(0);\n})();\n");
    out
}

fn push_defines(out: &mut String, pieces: &[ModulePiece<'_>]) {
    for piece in pieces {
        let mut map = String::from("{");
        for (index, (specifier, id)) in piece.map.iter().enumerate() {
            if index > 0 {
                map.push(',');
            }
            map.push_str(&format!(" {}: {id}", js_string(specifier)));
        }
        if !piece.map.is_empty() {
            map.push(' ');
        }
        map.push('}');
        out.push_str(&format!(
            "__riptide_define({}, {map}, function (require, module, exports) {{\n{}\n}});\n",
            piece.id, piece.body
        ));
    }
}

/// Reprint an assembled bundle, minifying the whitespace when asked.
///
/// Always runs, even unminified: the reparse is what catches malformed
/// output before it reaches an artifact on disk.
pub fn print(source: &str, path: &Path, minify: bool) -> BuildResult<String> {
    let allocator = Allocator::default();
    let parser_ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !parser_ret.errors.is_empty() {
        let errors: Vec<String> = parser_ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(BuildError::Compile {
            path: path.to_path_buf(),
            message: format!("assembled bundle failed to reparse: {}", errors.join("; ")),
        });
    }
    Ok(Codegen::new()
        .with_options(CodegenOptions { minify, ..CodegenOptions::default() })
        .build(&parser_ret.program)
        .code)
}
