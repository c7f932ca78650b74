//! Plugin manifest sidecars.
//!
//! Every built plugin ships a `manifest.json` next to its artifact. The
//! hash field is an md5 digest of the artifact bytes as they landed on
//! disk: a cache-busting identity for update checks, not an integrity or
//! security measure.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{BuildError, BuildResult};

#[derive(Debug, Clone, Serialize)]
pub struct PluginManifest {
    pub name: String,
    pub description: String,
    pub author: Value,
    pub hash: String,
}

/// Digest of artifact content, 32 lowercase hex characters.
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Write the manifest next to `artifact`, digesting the bytes that were
/// actually written rather than the in-memory copy.
pub fn emit(
    artifact: &Path,
    name: String,
    description: String,
    author: Value,
) -> BuildResult<(PluginManifest, PathBuf)> {
    let bytes = fs::read(artifact).map_err(BuildError::io(artifact))?;
    let manifest = PluginManifest { name, description, author, hash: digest(&bytes) };

    let path = artifact.with_file_name("manifest.json");
    let json = serde_json::to_string(&manifest)?;
    fs::write(&path, json).map_err(BuildError::io(&path))?;
    Ok((manifest, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_lowercase_hex() {
        // Fixed md5 vector.
        assert_eq!(digest(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(digest(b"abc").len(), 32);
        assert_ne!(digest(b"abc"), digest(b"abd"));
    }

    #[test]
    fn manifest_lands_next_to_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("index.js");
        fs::write(&artifact, "export default 1;\n").unwrap();

        let (manifest, path) = emit(
            &artifact,
            "Demo".to_string(),
            "A demo plugin".to_string(),
            Value::String("ada".to_string()),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("manifest.json"));
        assert_eq!(manifest.hash, digest(b"export default 1;\n"));

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["name"], "Demo");
        assert_eq!(written["description"], "A demo plugin");
        assert_eq!(written["author"], "ada");
        assert_eq!(written["hash"], Value::String(manifest.hash.clone()));
    }

    #[test]
    fn structured_authors_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("index.js");
        fs::write(&artifact, "x").unwrap();

        let author = serde_json::json!({ "name": "ada", "url": "https://example.test" });
        let (_, path) = emit(&artifact, "Demo".into(), String::new(), author.clone()).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["author"], author);
    }
}
