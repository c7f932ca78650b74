//! Synthetic-module source generation.
//!
//! Bundler extensions never concatenate JavaScript by hand. They build a
//! short list of [`ShimStmt`] values and render it with [`render`]; every
//! embedded string (asset contents, executable sub-bundle text, export
//! names) goes through JSON serialization on the way out, so quotes,
//! backslashes and newlines in the payload cannot break the emitted module.

use crate::config::BridgeSpec;

/// One statement of a synthetic module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShimStmt {
    /// `import { name, … } from "module";`
    ImportNamed { module: String, names: Vec<String> },
    /// Acquire an isolated evaluation scope over embedded executable text
    /// and bind a read guard to `guard`. The helper creates the scope,
    /// registers an idempotent release closure through `register`, and only
    /// then returns the guard, so the unload callback exists before any
    /// export binding reads through it. The raw handle never escapes the
    /// closure.
    AcquireScope {
        guard: String,
        register: String,
        bridge: BridgeSpec,
        code: String,
    },
    /// `export default guard.read("default");`
    ExportDefaultRead { guard: String },
    /// `export const name = guard.read("name");`
    ExportConstRead { guard: String, name: String },
    /// `export default "literal";`
    ExportDefaultLiteral { value: String },
}

/// Serialize a string as a JS string literal (JSON is a subset of JS here).
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).expect("string serialization is infallible")
}

/// Render a synthetic module to JavaScript source.
pub fn render(stmts: &[ShimStmt]) -> String {
    let mut out = String::new();
    for stmt in stmts {
        render_stmt(stmt, &mut out);
        out.push('\n');
    }
    out
}

fn render_stmt(stmt: &ShimStmt, out: &mut String) {
    match stmt {
        ShimStmt::ImportNamed { module, names } => {
            out.push_str("import { ");
            out.push_str(&names.join(", "));
            out.push_str(" } from ");
            out.push_str(&js_string(module));
            out.push(';');
        }
        ShimStmt::AcquireScope {
            guard,
            register,
            bridge,
            code,
        } => {
            let BridgeSpec {
                global,
                create,
                read,
                destroy,
                ..
            } = bridge;
            out.push_str(&format!(
                "const {guard} = (function (bridge) {{ \
const handle = bridge.{create}({code}); \
let released = false; \
{register}(function () {{ if (!released) {{ released = true; bridge.{destroy}(handle); }} }}); \
return {{ read: function (name) {{ return bridge.{read}(handle, name); }} }}; \
}})({global});",
                code = js_string(code),
            ));
        }
        ShimStmt::ExportDefaultRead { guard } => {
            out.push_str(&format!("export default {guard}.read(\"default\");"));
        }
        ShimStmt::ExportConstRead { guard, name } => {
            out.push_str(&format!(
                "export const {name} = {guard}.read({});",
                js_string(name)
            ));
        }
        ShimStmt::ExportDefaultLiteral { value } => {
            out.push_str("export default ");
            out.push_str(&js_string(value));
            out.push(';');
        }
    }
}
