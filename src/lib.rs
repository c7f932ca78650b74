//! Build pipeline for Riptide player plugins and themes.
//!
//! Plugins are TypeScript module graphs compiled into single-file ES
//! module artifacts with a JSON manifest sidecar. Along the way the
//! compiler inlines `asset://` resources as default-export modules and
//! splits `.native.` sub-modules into isolated payloads executed through
//! the host's native bridge. Themes are CSS files with a JSON metadata
//! comment, minified and re-labelled.
//!
//! [`pipeline::build_all`] is the top-level entry; [`bundler::Bundler`]
//! compiles a single graph when embedding the pipeline elsewhere.

pub mod bundler;
pub mod config;
pub mod error;
pub mod inline;
pub mod manifest;
pub mod minify;
pub mod native;
pub mod pipeline;
pub mod shim;
pub mod theme;

pub use bundler::{Bundle, BundleProfile, Bundler};
pub use config::BuildConfig;
pub use error::{BuildError, BuildResult};
pub use pipeline::{build_all, BuildSummary};
