//! Theme compilation.
//!
//! A theme is one CSS file whose first block comment holds a JSON
//! metadata object. The build minifies the stylesheet and re-attaches the
//! metadata as a compact JSON comment at the top, so the player can read
//! theme identity without parsing CSS.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{BuildError, BuildResult};
use crate::minify::minify_asset;

#[derive(Debug)]
pub struct CompiledTheme {
    /// Display name from metadata, falling back to the file stem.
    pub name: String,
    /// Final artifact content: metadata comment followed by minified CSS.
    pub css: String,
}

pub fn compile_theme(path: &Path) -> BuildResult<CompiledTheme> {
    let source = fs::read_to_string(path).map_err(BuildError::io(path))?;
    let metadata = extract_metadata(&source, path)?;

    let name = metadata
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "theme".to_string())
        });

    // The minifier drops comments, metadata included; re-attach it compact.
    let minified = minify_asset(path, &source)?;
    let css = format!("/*{}*/{}", serde_json::to_string(&metadata)?, minified);
    Ok(CompiledTheme { name, css })
}

fn extract_metadata(source: &str, path: &Path) -> BuildResult<Value> {
    let bad = |message: &str| BuildError::BadThemeMetadata {
        path: path.to_path_buf(),
        message: message.to_string(),
    };
    let start = source.find("/*").ok_or_else(|| bad("missing metadata comment"))? + 2;
    let end = source[start..]
        .find("*/")
        .map(|offset| start + offset)
        .ok_or_else(|| bad("unterminated metadata comment"))?;

    serde_json::from_str(source[start..end].trim()).map_err(|e| {
        BuildError::BadThemeMetadata {
            path: path.to_path_buf(),
            message: format!("metadata is not valid JSON: {e}"),
        }
    })
}
