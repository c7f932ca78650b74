//! Build pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that can occur while compiling plugins and themes.
///
/// The taxonomy is deliberately small: configuration errors (bad inputs the
/// plugin author controls), compilation errors (the compiler rejected a
/// module), and IO. Everything is fatal for the plugin being built and
/// nothing is retried; failures in one plugin never abort its siblings.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An asset referenced by a locator could not be read.
    #[error("failed to read {path}: {source}")]
    UnreadableAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A locator asked for minification of a file type we have no minifier for.
    #[error("don't know how to minify file type: {0}")]
    UnsupportedMinifyTarget(PathBuf),

    /// A locator string did not follow `<scheme>://<path>[?flags]`.
    #[error("malformed locator '{0}'")]
    MalformedLocator(String),

    /// Minifying an asset failed.
    #[error("failed to minify {path}: {message}")]
    Minify { path: PathBuf, message: String },

    /// An import specifier could not be resolved to a module.
    #[error("cannot resolve import '{specifier}' from {importer}")]
    UnresolvedImport { specifier: String, importer: PathBuf },

    /// A bare import is not part of the sanctioned external set.
    #[error("module '{specifier}' imported from {importer} is not provided by the host (allowed: {allowed})")]
    ForbiddenExternal {
        specifier: String,
        importer: PathBuf,
        allowed: String,
    },

    /// Parsing, transforming or printing a module failed.
    #[error("failed to compile {path}: {message}")]
    Compile { path: PathBuf, message: String },

    /// A module declared an export the shell cannot re-export as a binding.
    #[error("module {path} declares export '{name}' which is not a valid identifier")]
    InvalidExportName { path: PathBuf, name: String },

    /// A plugin package descriptor was missing or unparseable.
    #[error("invalid package descriptor {path}: {message}")]
    BadPackage { path: PathBuf, message: String },

    /// A theme stylesheet was missing its metadata comment or carried bad JSON.
    #[error("invalid theme metadata in {path}: {message}")]
    BadThemeMetadata { path: PathBuf, message: String },

    /// JSON serialization failed while writing a sidecar.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error outside asset reads (artifact and manifest writes, discovery).
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
