//! TypeScript to JavaScript transpilation using oxc.
//!
//! Plugins are written in TypeScript; the graph walker runs every file
//! through this strip before rewriting its module syntax. Plain JavaScript
//! passes through unchanged apart from reprinting.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::error::{BuildError, BuildResult};

/// Transpile one module's source to JavaScript, stripping type syntax.
pub fn transpile(source: &str, path: &Path) -> BuildResult<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_default();

    let parser_ret = Parser::new(&allocator, source, source_type).parse();
    if !parser_ret.errors.is_empty() {
        let errors: Vec<String> = parser_ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(BuildError::Compile {
            path: path.to_path_buf(),
            message: format!("parse errors: {}", errors.join("; ")),
        });
    }

    let mut program = parser_ret.program;

    // Semantic analysis (required for the transformer).
    let semantic_ret = SemanticBuilder::new().build(&program);
    if !semantic_ret.errors.is_empty() {
        let errors: Vec<String> = semantic_ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(BuildError::Compile {
            path: path.to_path_buf(),
            message: format!("semantic errors: {}", errors.join("; ")),
        });
    }
    let scoping = semantic_ret.semantic.into_scoping();

    let transformer_ret = Transformer::new(&allocator, path, &TransformOptions::default())
        .build_with_scoping(scoping, &mut program);
    if !transformer_ret.errors.is_empty() {
        let errors: Vec<String> =
            transformer_ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(BuildError::Compile {
            path: path.to_path_buf(),
            message: format!("transform errors: {}", errors.join("; ")),
        });
    }

    Ok(Codegen::new().build(&program).code)
}
