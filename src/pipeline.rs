//! Build orchestration.
//!
//! Discovers plugin directories and theme stylesheets, compiles each one,
//! and aggregates the outcome. Plugins compile on blocking worker threads
//! since the compilation itself is CPU and filesystem bound; one plugin
//! failing (or panicking) never stops its siblings, it just marks the
//! overall build as failed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::bundler::{BundleProfile, Bundler};
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::manifest;
use crate::theme;

/// The `package.json` fields the build reads. Everything else is the
/// plugin author's business.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginPackage {
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<Value>,
}

#[derive(Debug)]
pub struct BuiltPlugin {
    /// Directory name, which doubles as the artifact directory name.
    pub id: String,
    pub display_name: String,
    pub artifact: PathBuf,
    pub hash: String,
}

pub struct Failure {
    pub subject: String,
    pub error: String,
}

#[derive(Default)]
pub struct BuildSummary {
    pub plugins: Vec<BuiltPlugin>,
    pub themes: Vec<String>,
    pub failures: Vec<Failure>,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compile every plugin and theme under the configured directories.
pub async fn build_all(config: &BuildConfig, only: Option<&str>) -> anyhow::Result<BuildSummary> {
    let mut summary = BuildSummary::default();

    let mut plugin_dirs = discover_plugins(config)?;
    if let Some(only) = only {
        plugin_dirs.retain(|dir| dir_name(dir) == only);
    }

    let mut tasks = Vec::new();
    for dir in plugin_dirs {
        let config = config.clone();
        let subject = dir_name(&dir);
        let handle = tokio::task::spawn_blocking(move || build_plugin(&config, &dir));
        tasks.push((subject, handle));
    }
    for (subject, handle) in tasks {
        match handle.await {
            Ok(Ok(built)) => summary.plugins.push(built),
            Ok(Err(err)) => {
                error!(plugin = %subject, error = %err, "plugin build failed");
                summary.failures.push(Failure { subject, error: err.to_string() });
            }
            Err(join) => {
                error!(plugin = %subject, error = %join, "plugin build panicked");
                summary.failures.push(Failure { subject, error: join.to_string() });
            }
        }
    }

    for path in discover_themes(config)? {
        let subject = dir_name(&path);
        match build_theme_file(config, &path) {
            Ok(name) => summary.themes.push(name),
            Err(err) => {
                error!(theme = %subject, error = %err, "theme build failed");
                summary.failures.push(Failure { subject, error: err.to_string() });
            }
        }
    }

    Ok(summary)
}

/// Compile one plugin directory into `out_dir/<id>/index.js` plus its
/// manifest sidecar.
pub fn build_plugin(config: &BuildConfig, plugin_dir: &Path) -> BuildResult<BuiltPlugin> {
    let id = dir_name(plugin_dir);
    let package = read_package(plugin_dir)?;

    let entry = plugin_dir.join(package.main.as_deref().unwrap_or("index.js"));
    let bundle = Bundler::new(config).compile(&entry, BundleProfile::Browser)?;

    let out_dir = config.out_dir.join(&id);
    fs::create_dir_all(&out_dir).map_err(BuildError::io(&out_dir))?;
    let artifact = out_dir.join("index.js");
    fs::write(&artifact, &bundle.code).map_err(BuildError::io(&artifact))?;

    let display_name = package.display_name.clone().unwrap_or_else(|| id.clone());
    let (manifest, _) = manifest::emit(
        &artifact,
        display_name.clone(),
        package.description.clone().unwrap_or_default(),
        package.author.clone().unwrap_or(Value::Null),
    )?;

    info!(plugin = %display_name, artifact = %artifact.display(), "built plugin");
    Ok(BuiltPlugin { id, display_name, artifact, hash: manifest.hash })
}

/// Minify one theme into `out_dir/themes/`, returning its display name.
pub fn build_theme_file(config: &BuildConfig, path: &Path) -> BuildResult<String> {
    let compiled = theme::compile_theme(path)?;

    let themes_out = config.out_dir.join("themes");
    fs::create_dir_all(&themes_out).map_err(BuildError::io(&themes_out))?;
    let out = themes_out
        .join(path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("theme.css")));
    fs::write(&out, &compiled.css).map_err(BuildError::io(&out))?;

    info!(theme = %compiled.name, artifact = %out.display(), "built theme");
    Ok(compiled.name)
}

fn read_package(plugin_dir: &Path) -> BuildResult<PluginPackage> {
    let path = plugin_dir.join("package.json");
    let raw = fs::read_to_string(&path).map_err(|e| BuildError::BadPackage {
        path: path.clone(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| BuildError::BadPackage {
        path,
        message: e.to_string(),
    })
}

/// Plugin directories, sorted by name. Directories whose name starts with
/// the private prefix belong to shared code and are not built.
pub fn discover_plugins(config: &BuildConfig) -> anyhow::Result<Vec<PathBuf>> {
    let root = &config.plugins_dir;
    if !root.is_dir() {
        warn!(dir = %root.display(), "plugins directory missing, nothing to build");
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    let entries = fs::read_dir(root)
        .with_context(|| format!("reading plugins directory {}", root.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading plugins directory {}", root.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if dir_name(&path).starts_with(&config.private_prefix) {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort();
    Ok(dirs)
}

/// Theme stylesheets, sorted by name.
pub fn discover_themes(config: &BuildConfig) -> anyhow::Result<Vec<PathBuf>> {
    let root = &config.themes_dir;
    if !root.is_dir() {
        warn!(dir = %root.display(), "themes directory missing, nothing to build");
        return Ok(Vec::new());
    }

    let mut themes = Vec::new();
    let entries = fs::read_dir(root)
        .with_context(|| format!("reading themes directory {}", root.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading themes directory {}", root.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "css") {
            themes.push(path);
        }
    }
    themes.sort();
    Ok(themes)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
