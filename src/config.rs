//! Build configuration.
//!
//! Everything here has a sensible default so a bare `riptide-build` in a
//! checkout with `plugins/` and `themes/` directories just works. A
//! `riptide.toml` at the repository root (or `--config`) can override any
//! knob, and a few common ones are also exposed as CLI flags.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory scanned for plugin packages (one subdirectory per plugin).
    pub plugins_dir: PathBuf,
    /// Directory scanned for theme stylesheets.
    pub themes_dir: PathBuf,
    /// Output root; artifacts land in `<out_dir>/<plugin>/`, themes in
    /// `<out_dir>/themes/`.
    pub out_dir: PathBuf,
    /// Uniform minification of emitted artifacts.
    pub minify: bool,
    /// Plugin directories whose name starts with this prefix are skipped.
    pub private_prefix: String,
    /// Import-resolution knobs.
    pub resolver: ResolverConfig,
    /// Identifiers generated code uses to talk to the host.
    pub bridge: BridgeSpec,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            themes_dir: PathBuf::from("themes"),
            out_dir: PathBuf::from("dist"),
            minify: true,
            private_prefix: "_".to_string(),
            resolver: ResolverConfig::default(),
            bridge: BridgeSpec::default(),
        }
    }
}

/// How import specifiers are classified during graph resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Scheme of inline-asset locators (`asset://logo.svg?base64`).
    pub scheme: String,
    /// Infix token marking native sub-modules (`bridge.native.ts`).
    pub native_marker: String,
    /// Host modules left as real imports in plugin artifacts.
    pub externals: Vec<String>,
    /// Host modules a native sub-bundle may require; everything else bare is
    /// rejected so sandboxed code cannot pull in arbitrary host internals.
    pub native_externals: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scheme: "asset".to_string(),
            native_marker: "native".to_string(),
            externals: vec!["@riptide".to_string(), "@plugin".to_string()],
            native_externals: vec![
                "@riptide".to_string(),
                "@plugin".to_string(),
                "electron".to_string(),
            ],
        }
    }
}

impl ResolverConfig {
    /// `asset://` for the default scheme.
    pub fn scheme_prefix(&self) -> String {
        format!("{}://", self.scheme)
    }

    /// True if a specifier names a native sub-module: its final path segment
    /// carries the marker as an infix between a non-empty stem and an
    /// extension (`bridge.native.ts`, but not `native.ts`).
    pub fn is_native_specifier(&self, specifier: &str) -> bool {
        let name = specifier.rsplit(['/', '\\']).next().unwrap_or(specifier);
        let infix = format!(".{}.", self.native_marker);
        match name.find(&infix) {
            Some(i) => i > 0 && name.len() > i + infix.len(),
            None => false,
        }
    }
}

/// The capability surface generated code assumes the host provides.
///
/// The build tool never calls any of these itself; they are spliced into
/// synthetic modules as identifiers and resolved by the host when the plugin
/// loads. Modeling them as data keeps codegen free of hard-coded globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSpec {
    /// Global object exposing the scope primitives.
    pub global: String,
    /// Method creating an isolated evaluation scope from executable text.
    pub create: String,
    /// Method reading one exported value out of a scope.
    pub read: String,
    /// Method destroying a scope.
    pub destroy: String,
    /// Global variable the native sub-bundle assigns its export namespace to
    /// inside the evaluation scope.
    pub namespace: String,
    /// Module the unload-registration hook is imported from.
    pub unload_module: String,
    /// Name of the unload-registration hook.
    pub unload_hook: String,
}

impl Default for BridgeSpec {
    fn default() -> Self {
        Self {
            global: "RiptideNative".to_string(),
            create: "createEvalScope".to_string(),
            read: "getNativeValue".to_string(),
            destroy: "deleteEvalScope".to_string(),
            namespace: "riptideExports".to_string(),
            unload_module: "@plugin".to_string(),
            unload_hook: "addUnloadable".to_string(),
        }
    }
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would generate unparseable code.
    pub fn validate(&self) -> Result<()> {
        if self.resolver.scheme.is_empty()
            || !self
                .resolver
                .scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
        {
            return Err(anyhow!("invalid locator scheme '{}'", self.resolver.scheme));
        }
        if !is_js_identifier(&self.resolver.native_marker) {
            return Err(anyhow!(
                "invalid native marker '{}'",
                self.resolver.native_marker
            ));
        }
        for name in [
            &self.bridge.global,
            &self.bridge.create,
            &self.bridge.read,
            &self.bridge.destroy,
            &self.bridge.namespace,
            &self.bridge.unload_hook,
        ] {
            if !is_js_identifier(name) {
                return Err(anyhow!("bridge identifier '{name}' is not a valid identifier"));
            }
        }
        Ok(())
    }
}

/// ASCII-conservative identifier shape check. Reserved words pass; this is
/// what decides dot access versus bracket access on generated member reads.
pub fn is_identifier_shaped(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// JS identifier check, used both for config validation and for export
/// names the native shim re-exports as `const` bindings.
pub fn is_js_identifier(name: &str) -> bool {
    if !is_identifier_shaped(name) {
        return false;
    }
    // Reserved words would still be syntax errors as binding names.
    !matches!(
        name,
        "await" | "break" | "case" | "catch" | "class" | "const" | "continue" | "debugger"
            | "default" | "delete" | "do" | "else" | "enum" | "export" | "extends" | "false"
            | "finally" | "for" | "function" | "if" | "import" | "in" | "instanceof" | "let"
            | "new" | "null" | "return" | "super" | "switch" | "this" | "throw" | "true"
            | "try" | "typeof" | "var" | "void" | "while" | "with" | "yield"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BuildConfig::default().validate().unwrap();
    }

    #[test]
    fn native_specifier_matching() {
        let resolver = ResolverConfig::default();
        assert!(resolver.is_native_specifier("./bridge.native.ts"));
        assert!(resolver.is_native_specifier("../lib/rpc.native.js"));
        assert!(resolver.is_native_specifier("deep/path\\win.native.ts"));
        // A file literally named after the marker is not a native module.
        assert!(!resolver.is_native_specifier("./native.ts"));
        // The marker must sit between stem and extension.
        assert!(!resolver.is_native_specifier("./bridge.native"));
        assert!(!resolver.is_native_specifier("./bridge.ts"));
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config: BuildConfig = toml::from_str(
            r#"
            plugins_dir = "pkgs"

            [bridge]
            global = "HostNative"
            "#,
        )
        .unwrap();
        assert_eq!(config.plugins_dir, PathBuf::from("pkgs"));
        assert_eq!(config.bridge.global, "HostNative");
        // Untouched sections keep their defaults.
        assert_eq!(config.bridge.create, "createEvalScope");
        assert_eq!(config.resolver.scheme, "asset");
        assert!(config.minify);
    }

    #[test]
    fn identifier_check() {
        assert!(is_js_identifier("version"));
        assert!(is_js_identifier("_private$2"));
        assert!(!is_js_identifier("2fast"));
        assert!(!is_js_identifier("has-dash"));
        assert!(!is_js_identifier("default"));
        assert!(!is_js_identifier(""));
    }
}
