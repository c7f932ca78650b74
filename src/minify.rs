//! Asset minifiers.
//!
//! Inline assets opt into minification per locator; themes are always
//! minified. Only markup and stylesheets are supported. Asking for anything
//! else is a build-time contract violation surfaced to the plugin author,
//! never a silent pass-through.

use std::path::Path;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use minify_html::{minify, Cfg};

use crate::error::{BuildError, BuildResult};

/// Minify by file extension. The allowlist is deliberately closed: `.html`
/// and `.css`, nothing inferred from content.
pub fn minify_asset(path: &Path, source: &str) -> BuildResult<String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => Ok(markup(source)),
        Some("css") => stylesheet(source).map_err(|message| BuildError::Minify {
            path: path.to_path_buf(),
            message,
        }),
        _ => Err(BuildError::UnsupportedMinifyTarget(path.to_path_buf())),
    }
}

/// Structural markup minification: collapses whitespace, drops comments and
/// minifies embedded style/script blocks.
pub fn markup(source: &str) -> String {
    let mut cfg = Cfg::new();
    cfg.minify_css = true;
    cfg.minify_js = true;
    let out = minify(source.as_bytes(), &cfg);
    String::from_utf8_lossy(&out).into_owned()
}

/// Stylesheet minification through the CSS toolchain; parse errors are
/// reported rather than recovered from.
pub fn stylesheet(source: &str) -> Result<String, String> {
    let mut sheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| e.to_string())?;
    let result = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}
