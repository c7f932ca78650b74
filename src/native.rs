//! Native sub-module bridging.
//!
//! A module whose file name carries the native infix never joins the
//! plugin's own graph. It is compiled on its own, for the native profile,
//! and the importing bundle receives a shim instead: the shim hands the
//! compiled payload to the host bridge, which evaluates it in an isolated
//! scope, and re-exports each declared name as a one-time snapshot read
//! through the returned scope guard.
//!
//! The guard registers its own teardown with the plugin unload hook
//! before any re-export runs, so the scope is destroyed exactly once no
//! matter how the plugin itself shuts down.

use std::path::Path;

use crate::bundler::{BundleProfile, Bundler};
use crate::config::{is_js_identifier, BuildConfig};
use crate::error::{BuildError, BuildResult};
use crate::shim::{render, ShimStmt};

const GUARD: &str = "__scope";

/// Compile a native sub-module and wrap it in its import shim.
///
/// The returned source is a synthetic module; the caller feeds it through
/// the same rewrite pipeline as any file on disk.
pub fn bridge_module(path: &Path, config: &BuildConfig) -> BuildResult<String> {
    let bundle = Bundler::new(config).compile(path, BundleProfile::Native)?;

    if let Some(star) = bundle.surface.external_stars.first() {
        return Err(BuildError::Compile {
            path: path.to_path_buf(),
            message: format!("cannot re-export `export * from \"{star}\"` across the native bridge"),
        });
    }
    for name in &bundle.surface.named {
        if !is_js_identifier(name) {
            return Err(BuildError::InvalidExportName {
                path: path.to_path_buf(),
                name: name.clone(),
            });
        }
    }

    let bridge = &config.bridge;
    let mut stmts = vec![
        ShimStmt::ImportNamed {
            module: bridge.unload_module.clone(),
            names: vec![bridge.unload_hook.clone()],
        },
        ShimStmt::AcquireScope {
            guard: GUARD.to_string(),
            register: bridge.unload_hook.clone(),
            bridge: bridge.clone(),
            code: bundle.code,
        },
    ];
    if bundle.surface.has_default {
        stmts.push(ShimStmt::ExportDefaultRead { guard: GUARD.to_string() });
    }
    for name in &bundle.surface.named {
        stmts.push(ShimStmt::ExportConstRead { guard: GUARD.to_string(), name: name.clone() });
    }
    Ok(render(&stmts))
}
