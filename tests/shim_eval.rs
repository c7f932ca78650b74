//! Runtime behavior of built artifacts inside an embedded QuickJS.
//!
//! The host side is mocked: `@riptide`/`@plugin` are tiny ES modules and
//! the native bridge global records every call it receives. What runs is
//! the real artifact exactly as it left the build.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rquickjs::loader::{BuiltinLoader, BuiltinResolver};
use rquickjs::{CatchResultExt, Context, Function, Module, Object, Runtime};

use riptide_build::config::BuildConfig;
use riptide_build::pipeline::build_plugin;

type CallLog = Arc<Mutex<Vec<(String, String)>>>;

const RIPTIDE_HOST: &str = r#"
export function intercept(name) {
  return "intercepted:" + name;
}
"#;

// Unload handlers are deliberately not cleared on drain, so draining twice
// re-invokes them and exercises release idempotence.
const PLUGIN_HOST: &str = r#"
const unloadables = [];
export function addUnloadable(handler) {
  globalThis.__record("register", "");
  unloadables.push(handler);
}
export function drain() {
  for (const handler of unloadables) handler();
}
export function drainAt(index) {
  unloadables[index]();
}
"#;

const DRIVER: &str = r#"
import * as plugin from "plugin";
import { drain, drainAt } from "@plugin";
globalThis.__plugin = plugin;
globalThis.__drain = drain;
globalThis.__drainAt = drainAt;
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn build_artifact(root: &Path, files: &[(&str, &str)]) -> String {
    let mut config = BuildConfig::default();
    config.plugins_dir = root.join("plugins");
    config.themes_dir = root.join("themes");
    config.out_dir = root.join("dist");
    config.minify = true;
    for (rel, contents) in files {
        write(root, &format!("plugins/demo/{rel}"), contents);
    }
    let built = build_plugin(&config, &config.plugins_dir.join("demo")).unwrap();
    fs::read_to_string(built.artifact).unwrap()
}

/// Spin up a QuickJS context with the mock host installed and the plugin
/// artifact evaluated through the module loader. Scope handles count up
/// from 7 so tests can tell scopes apart; every read and destroy is logged
/// with the handle it was called with.
fn boot(artifact: &str, log: CallLog) -> (Runtime, Context) {
    let runtime = Runtime::new().unwrap();
    let resolver = BuiltinResolver::default()
        .with_module("@plugin")
        .with_module("@riptide")
        .with_module("plugin");
    let loader = BuiltinLoader::default()
        .with_module("@plugin", PLUGIN_HOST)
        .with_module("@riptide", RIPTIDE_HOST)
        .with_module("plugin", artifact);
    runtime.set_loader(resolver, loader);

    let context = Context::full(&runtime).unwrap();
    context.with(|ctx| {
        let record = log.clone();
        ctx.globals()
            .set(
                "__record",
                Function::new(ctx.clone(), move |kind: String, detail: String| {
                    record.lock().unwrap().push((kind, detail));
                })
                .unwrap(),
            )
            .unwrap();

        let native = Object::new(ctx.clone()).unwrap();
        let next_handle = Arc::new(Mutex::new(7u32));
        let create_log = log.clone();
        native
            .set(
                "createEvalScope",
                Function::new(ctx.clone(), move |code: String| -> u32 {
                    let mut next = next_handle.lock().unwrap();
                    let handle = *next;
                    *next += 1;
                    create_log.lock().unwrap().push(("create".to_string(), code));
                    handle
                })
                .unwrap(),
            )
            .unwrap();
        let read_log = log.clone();
        native
            .set(
                "getNativeValue",
                Function::new(ctx.clone(), move |handle: u32, name: String| -> String {
                    read_log.lock().unwrap().push(("read".to_string(), format!("{handle}:{name}")));
                    format!("native:{handle}:{name}")
                })
                .unwrap(),
            )
            .unwrap();
        let destroy_log = log.clone();
        native
            .set(
                "deleteEvalScope",
                Function::new(ctx.clone(), move |handle: u32| {
                    destroy_log.lock().unwrap().push(("destroy".to_string(), handle.to_string()));
                })
                .unwrap(),
            )
            .unwrap();
        ctx.globals().set("RiptideNative", native).unwrap();

        let promise = Module::evaluate(ctx.clone(), "driver", DRIVER).catch(&ctx).unwrap();
        promise.finish::<()>().catch(&ctx).unwrap();
    });
    (runtime, context)
}

fn entries_of(log: &CallLog, kind: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(k, _)| k == kind)
        .map(|(_, detail)| detail.clone())
        .collect()
}

#[test]
fn plugin_graph_runs_in_quickjs() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(
        dir.path(),
        &[
            ("package.json", r#"{ "main": "index.ts" }"#),
            ("lib.ts", "export function greet(): string { return \"hi\"; }\n"),
            ("style.css", "body { color : red ; }\n"),
            (
                "index.ts",
                "import { intercept } from \"@riptide\";\n\
                 import { greet } from \"./lib\";\n\
                 import styles from \"asset://style.css?minify\";\n\
                 export const banner = greet() + \"|\" + intercept(\"play\") + \"|\" + styles;\n\
                 export default function run(): string { return banner; }\n",
            ),
        ],
    );

    let log: CallLog = Arc::default();
    let (_runtime, context) = boot(&artifact, log.clone());

    context.with(|ctx| {
        let banner: String =
            ctx.eval::<String, _>("globalThis.__plugin.banner").catch(&ctx).unwrap();
        assert_eq!(banner, "hi|intercepted:play|body{color:red}");
        let run: String =
            ctx.eval::<String, _>("globalThis.__plugin.default()").catch(&ctx).unwrap();
        assert_eq!(run, banner);
    });
    // No native modules involved, so the bridge stayed untouched.
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn native_scope_lifecycle_and_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(
        dir.path(),
        &[
            ("package.json", r#"{ "main": "index.ts" }"#),
            (
                "ipc.native.ts",
                "export const version: string = \"from-scope\";\n\
                 export default function probe(): number { return 1; }\n",
            ),
            (
                "index.ts",
                "import probe, { version } from \"./ipc.native\";\n\
                 export const seen = [probe, version];\n",
            ),
        ],
    );

    let log: CallLog = Arc::default();
    let (_runtime, context) = boot(&artifact, log.clone());

    {
        let entries = log.lock().unwrap().clone();
        // Scope created first, payload riding along as executable text.
        assert_eq!(entries[0].0, "create");
        assert!(entries[0].1.contains("riptideExports"));
        assert!(entries[0].1.contains("from-scope"));
        // Teardown registered once, before any value was read.
        assert_eq!(entries[1].0, "register");
        assert_eq!(entries_of(&log, "register").len(), 1);
        assert_eq!(entries_of(&log, "read"), vec!["7:default", "7:version"]);
        assert!(entries_of(&log, "destroy").is_empty());
    }

    // Bindings hold the snapshot the bridge handed out at load time.
    context.with(|ctx| {
        let version: String =
            ctx.eval::<String, _>("globalThis.__plugin.seen[1]").catch(&ctx).unwrap();
        assert_eq!(version, "native:7:version");
        let snapshot: String =
            ctx.eval::<String, _>("globalThis.__plugin.seen[0]").catch(&ctx).unwrap();
        assert_eq!(snapshot, "native:7:default");
    });

    // Unload destroys the scope with the handle it was given.
    context.with(|ctx| {
        ctx.eval::<(), _>("globalThis.__drain()").catch(&ctx).unwrap();
    });
    assert_eq!(entries_of(&log, "destroy"), vec!["7"]);

    // Draining again re-runs the handler; the release must not repeat.
    context.with(|ctx| {
        ctx.eval::<(), _>("globalThis.__drain()").catch(&ctx).unwrap();
    });
    assert_eq!(entries_of(&log, "destroy"), vec!["7"]);
}

#[test]
fn two_native_modules_get_independent_scopes() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(
        dir.path(),
        &[
            ("package.json", r#"{ "main": "index.ts" }"#),
            ("disk.native.ts", "export const va: string = \"a\";\n"),
            ("net.native.ts", "export const vb: string = \"b\";\n"),
            (
                "index.ts",
                "import { va } from \"./disk.native\";\n\
                 import { vb } from \"./net.native\";\n\
                 export const pair = [va, vb];\n",
            ),
        ],
    );

    let log: CallLog = Arc::default();
    let (_runtime, context) = boot(&artifact, log.clone());

    // Two creates, and each read went to the scope that declared the name.
    assert_eq!(entries_of(&log, "create").len(), 2);
    assert_eq!(entries_of(&log, "register").len(), 2);
    assert_eq!(entries_of(&log, "read"), vec!["7:va", "8:vb"]);

    context.with(|ctx| {
        let first: String =
            ctx.eval::<String, _>("globalThis.__plugin.pair[0]").catch(&ctx).unwrap();
        assert_eq!(first, "native:7:va");
        let second: String =
            ctx.eval::<String, _>("globalThis.__plugin.pair[1]").catch(&ctx).unwrap();
        assert_eq!(second, "native:8:vb");
    });

    // Unloading the first scope leaves the second one alone.
    context.with(|ctx| {
        ctx.eval::<(), _>("globalThis.__drainAt(0)").catch(&ctx).unwrap();
    });
    assert_eq!(entries_of(&log, "destroy"), vec!["7"]);
    context.with(|ctx| {
        let second: String =
            ctx.eval::<String, _>("globalThis.__plugin.pair[1]").catch(&ctx).unwrap();
        assert_eq!(second, "native:8:vb");
    });

    // A full drain releases the rest, each scope exactly once.
    context.with(|ctx| {
        ctx.eval::<(), _>("globalThis.__drain()").catch(&ctx).unwrap();
    });
    assert_eq!(entries_of(&log, "destroy"), vec!["7", "8"]);
}

#[test]
fn star_reexports_of_host_modules_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(
        dir.path(),
        &[
            ("package.json", r#"{ "main": "index.ts" }"#),
            (
                "index.ts",
                "export * from \"@riptide\";\nexport const own = \"mine\";\n",
            ),
        ],
    );

    let log: CallLog = Arc::default();
    let (_runtime, context) = boot(&artifact, log);

    context.with(|ctx| {
        let own: String = ctx.eval::<String, _>("globalThis.__plugin.own").catch(&ctx).unwrap();
        assert_eq!(own, "mine");
        let forwarded: String = ctx
            .eval::<String, _>("globalThis.__plugin.intercept(\"pause\")")
            .catch(&ctx)
            .unwrap();
        assert_eq!(forwarded, "intercepted:pause");
    });
}
