//! Inline asset modules.
//!
//! Imports using the `asset://` scheme pull file content straight into the
//! bundle as the default export of a synthetic module. The locator's query
//! string carries presence-only flags: `minify` runs the content through
//! the type-matched minifier first, `base64` encodes whatever the previous
//! step produced. Unknown flags are logged and ignored so a future flag
//! does not brick older build setups.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::warn;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::minify::minify_asset;
use crate::shim::{render, ShimStmt};

/// A parsed `scheme://path?flags` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    pub path: String,
    pub base64: bool,
    pub minify: bool,
}

impl ResourceLocator {
    pub fn parse(raw: &str, scheme_prefix: &str) -> BuildResult<Self> {
        let rest = raw
            .strip_prefix(scheme_prefix)
            .ok_or_else(|| BuildError::MalformedLocator(raw.to_string()))?;
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, query),
            None => (rest, ""),
        };
        if path.is_empty() {
            return Err(BuildError::MalformedLocator(raw.to_string()));
        }

        let mut base64 = false;
        let mut minify = false;
        for flag in query.split('&').filter(|flag| !flag.is_empty()) {
            match flag {
                "base64" => base64 = true,
                "minify" => minify = true,
                other => warn!(locator = raw, flag = other, "ignoring unknown asset flag"),
            }
        }
        Ok(Self { path: path.to_string(), base64, minify })
    }
}

/// A loaded asset ready to join the graph as a synthetic module.
#[derive(Debug)]
pub struct InlinedAsset {
    /// Canonical path; part of the module's interning identity.
    pub path: PathBuf,
    pub base64: bool,
    pub minify: bool,
    /// Generated module source: one default export of the content.
    pub source: String,
}

/// Resolve a locator against the importing module's directory and load
/// the asset into a synthetic module source.
pub fn load(raw: &str, importer_dir: &Path, config: &BuildConfig) -> BuildResult<InlinedAsset> {
    let locator = ResourceLocator::parse(raw, &config.resolver.scheme_prefix())?;
    let joined = importer_dir.join(&locator.path);
    let path = fs::canonicalize(&joined)
        .map_err(|source| BuildError::UnreadableAsset { path: joined.clone(), source })?;

    let payload = if locator.minify {
        let text = read_text(&path)?;
        let minified = minify_asset(&path, &text)?;
        if locator.base64 {
            BASE64.encode(minified.as_bytes())
        } else {
            minified
        }
    } else if locator.base64 {
        // Raw bytes, so images and other binary assets inline cleanly.
        let bytes = fs::read(&path)
            .map_err(|source| BuildError::UnreadableAsset { path: path.clone(), source })?;
        BASE64.encode(bytes)
    } else {
        read_text(&path)?.trim_end().to_string()
    };

    let source = render(&[ShimStmt::ExportDefaultLiteral { value: payload }]);
    Ok(InlinedAsset { path, base64: locator.base64, minify: locator.minify, source })
}

fn read_text(path: &Path) -> BuildResult<String> {
    fs::read_to_string(path)
        .map_err(|source| BuildError::UnreadableAsset { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> BuildResult<ResourceLocator> {
        ResourceLocator::parse(raw, "asset://")
    }

    #[test]
    fn parses_path_and_flags() {
        let locator = parse("asset://img/logo.svg?base64&minify").unwrap();
        assert_eq!(locator.path, "img/logo.svg");
        assert!(locator.base64);
        assert!(locator.minify);

        let bare = parse("asset://styles.css").unwrap();
        assert_eq!(bare.path, "styles.css");
        assert!(!bare.base64);
        assert!(!bare.minify);
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let locator = parse("asset://styles.css?sneaky&minify").unwrap();
        assert!(locator.minify);
        assert!(!locator.base64);
    }

    #[test]
    fn empty_paths_are_malformed() {
        assert!(parse("asset://").is_err());
        assert!(parse("asset://?minify").is_err());
    }

    #[test]
    fn plain_text_is_trailing_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("note.txt"), "hello\n\n").unwrap();
        let config = BuildConfig::default();

        let asset = load("asset://note.txt", dir.path(), &config).unwrap();
        assert_eq!(asset.source, "export default \"hello\";\n");
    }

    #[test]
    fn base64_reads_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), [0xff_u8, 0x00]).unwrap();
        let config = BuildConfig::default();

        let asset = load("asset://blob.bin?base64", dir.path(), &config).unwrap();
        assert_eq!(asset.source, "export default \"/wA=\";\n");
    }

    #[test]
    fn minify_then_base64() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s.css"), "body { color : red ; }").unwrap();
        let config = BuildConfig::default();

        let plain = load("asset://s.css?minify", dir.path(), &config).unwrap();
        assert_eq!(plain.source, "export default \"body{color:red}\";\n");

        let encoded = load("asset://s.css?minify&base64", dir.path(), &config).unwrap();
        assert_eq!(
            encoded.source,
            format!("export default {:?};\n", BASE64.encode("body{color:red}"))
        );
    }

    #[test]
    fn minifying_an_unknown_type_fails_the_build() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.json"), "{}").unwrap();
        let config = BuildConfig::default();

        let err = load("asset://data.json?minify", dir.path(), &config).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedMinifyTarget(_)));
    }

    #[test]
    fn missing_assets_are_reported_with_their_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let err = load("asset://gone.css", dir.path(), &config).unwrap_err();
        assert!(err.to_string().contains("gone.css"));
    }
}
