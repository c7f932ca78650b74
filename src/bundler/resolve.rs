//! Import specifier classification and file resolution.
//!
//! Each specifier a module requests falls into one of four buckets:
//! a file on disk that joins the graph, a native sub-module that gets
//! bridged, an inline asset locator, or a host-provided external. Bare
//! specifiers outside the external allowlist are a hard error so a typo
//! never silently ships a broken import.

use std::path::{Path, PathBuf};

use crate::config::ResolverConfig;
use crate::error::{BuildError, BuildResult};

/// What a specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An ordinary file that becomes a module in the graph.
    File(PathBuf),
    /// A native sub-module compiled separately and bridged at runtime.
    Native(PathBuf),
    /// An inline asset locator, kept raw for the inliner to parse.
    Asset(String),
    /// Left as an import for the host environment to satisfy.
    External(String),
}

pub struct Resolver<'a> {
    pub rules: &'a ResolverConfig,
    /// Allowlist of bare specifiers for the current profile.
    pub externals: &'a [String],
    /// Whether native sub-modules are split out of this graph.
    pub native_bridging: bool,
}

impl Resolver<'_> {
    pub fn resolve(&self, specifier: &str, importer: &Path) -> BuildResult<Resolution> {
        if specifier.starts_with(&self.rules.scheme_prefix()) {
            return Ok(Resolution::Asset(specifier.to_string()));
        }

        let relative = specifier.starts_with("./") || specifier.starts_with("../");
        if relative || Path::new(specifier).is_absolute() {
            let base = if relative {
                let dir = importer.parent().unwrap_or_else(|| Path::new("."));
                dir.join(specifier)
            } else {
                PathBuf::from(specifier)
            };
            let path = probe(&base).ok_or_else(|| BuildError::UnresolvedImport {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
            })?;
            if self.native_bridging && self.rules.is_native_specifier(&path.to_string_lossy()) {
                return Ok(Resolution::Native(path));
            }
            return Ok(Resolution::File(path));
        }

        if self.externals.iter().any(|e| e == specifier) {
            return Ok(Resolution::External(specifier.to_string()));
        }
        Err(BuildError::ForbiddenExternal {
            specifier: specifier.to_string(),
            importer: importer.to_path_buf(),
            allowed: self.externals.join(", "),
        })
    }
}

/// Probe a path the way module resolution expects: the exact file first,
/// then with `.ts`/`.js` appended, then as a directory with an index file.
///
/// Extensions are appended rather than swapped so `./bridge.native`
/// finds `bridge.native.ts` instead of clobbering the infix.
fn probe(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    for ext in ["ts", "js"] {
        let candidate = append_extension(base, ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for index in ["index.ts", "index.js"] {
        let candidate = base.join(index);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
