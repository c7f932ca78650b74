//! Per-plugin module graph compilation.
//!
//! A bundle starts at one entry file and walks outward: each module is
//! transpiled, its statements rewritten, and its imports resolved into
//! more graph work. Modules are interned by canonical identity, so two
//! specifiers spelling the same file share one instance, and cycles
//! terminate because a module is queued at most once.
//!
//! Synthetic modules join the same queue as files: inline assets arrive
//! as generated default-export sources, native sub-modules as bridge
//! shims wrapping an independently compiled scope payload.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::{inline, native};

pub mod link;
pub mod resolve;
pub mod rewrite;
pub mod transpile;

use link::ModulePiece;
use resolve::{Resolution, Resolver};
use rewrite::{rewrite_module, ExportSurface, RewriteOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleProfile {
    /// Plugin artifact: an ES module for the player's renderer.
    Browser,
    /// Native sub-module: an IIFE evaluated in an isolated host scope.
    Native,
}

/// Entry export surface after `export *` chains are resolved.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSurface {
    pub named: Vec<String>,
    pub has_default: bool,
    /// Externals the entry star-reexports, forwarded to the host.
    pub external_stars: Vec<String>,
}

#[derive(Debug)]
pub struct Bundle {
    pub code: String,
    pub surface: ResolvedSurface,
}

/// Canonical identity of a module in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ModuleKey {
    File(PathBuf),
    Native(PathBuf),
    Asset(PathBuf, bool, bool),
}

enum Work {
    File(PathBuf),
    Native(PathBuf),
    Synthetic { path: PathBuf, source: String },
}

struct Slot {
    body: String,
    /// Specifier to module id for this module's requests.
    map: BTreeMap<String, usize>,
    surface: ExportSurface,
}

pub struct Bundler<'a> {
    config: &'a BuildConfig,
}

impl<'a> Bundler<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, entry: &Path, profile: BundleProfile) -> BuildResult<Bundle> {
        let externals = match profile {
            BundleProfile::Browser => &self.config.resolver.externals,
            BundleProfile::Native => &self.config.resolver.native_externals,
        };
        let resolver = Resolver {
            rules: &self.config.resolver,
            externals,
            native_bridging: profile == BundleProfile::Browser,
        };
        let rewrite_options = RewriteOptions {
            externals,
            cjs_externals: profile == BundleProfile::Native,
        };

        let entry_path = fs::canonicalize(entry).map_err(BuildError::io(entry))?;

        let mut ids: HashMap<ModuleKey, usize> = HashMap::new();
        let mut queue: VecDeque<(usize, Work)> = VecDeque::new();
        // Queue order is intern order, so slot index equals module id.
        let mut slots: Vec<Slot> = Vec::new();
        let mut used_externals: BTreeSet<String> = BTreeSet::new();

        intern(
            &mut ids,
            &mut queue,
            ModuleKey::File(entry_path.clone()),
            Work::File(entry_path.clone()),
        );

        while let Some((id, work)) = queue.pop_front() {
            debug_assert_eq!(id, slots.len());
            let (path, source_js) = match work {
                Work::File(file) => {
                    let raw = fs::read_to_string(&file).map_err(BuildError::io(&file))?;
                    let js = transpile::transpile(&raw, &file)?;
                    (file, js)
                }
                Work::Native(file) => {
                    let shim = native::bridge_module(&file, self.config)?;
                    (file, shim)
                }
                Work::Synthetic { path, source } => (path, source),
            };

            let rewritten = rewrite_module(&source_js, &path, &rewrite_options)?;

            let mut map = BTreeMap::new();
            for specifier in &rewritten.requests {
                match resolver.resolve(specifier, &path)? {
                    Resolution::File(file) => {
                        let file = fs::canonicalize(&file).map_err(BuildError::io(&file))?;
                        let target = intern(
                            &mut ids,
                            &mut queue,
                            ModuleKey::File(file.clone()),
                            Work::File(file),
                        );
                        map.insert(specifier.clone(), target);
                    }
                    Resolution::Native(file) => {
                        let file = fs::canonicalize(&file).map_err(BuildError::io(&file))?;
                        let target = intern(
                            &mut ids,
                            &mut queue,
                            ModuleKey::Native(file.clone()),
                            Work::Native(file),
                        );
                        map.insert(specifier.clone(), target);
                    }
                    Resolution::Asset(locator) => {
                        let dir = path.parent().unwrap_or_else(|| Path::new("."));
                        let asset = inline::load(&locator, dir, self.config)?;
                        let target = intern(
                            &mut ids,
                            &mut queue,
                            ModuleKey::Asset(asset.path.clone(), asset.base64, asset.minify),
                            Work::Synthetic { path: asset.path, source: asset.source },
                        );
                        map.insert(specifier.clone(), target);
                    }
                    Resolution::External(name) => {
                        used_externals.insert(name);
                    }
                }
            }

            slots.push(Slot { body: rewritten.body, map, surface: rewritten.surface });
        }

        let surface = entry_surface(&slots);
        let pieces: Vec<ModulePiece<'_>> = slots
            .iter()
            .enumerate()
            .map(|(id, slot)| ModulePiece { id, map: &slot.map, body: &slot.body })
            .collect();

        let assembled = match profile {
            BundleProfile::Browser => {
                link::assemble_browser(&pieces, &used_externals, &surface, &entry_path)?
            }
            BundleProfile::Native => {
                link::assemble_native(&pieces, &self.config.bridge.namespace)
            }
        };
        let code = link::print(&assembled, &entry_path, self.config.minify)?;
        debug!(
            entry = %entry_path.display(),
            modules = slots.len(),
            "compiled bundle"
        );
        Ok(Bundle { code, surface })
    }
}

fn intern(
    ids: &mut HashMap<ModuleKey, usize>,
    queue: &mut VecDeque<(usize, Work)>,
    key: ModuleKey,
    work: Work,
) -> usize {
    if let Some(&id) = ids.get(&key) {
        return id;
    }
    let id = ids.len();
    ids.insert(key, id);
    queue.push_back((id, work));
    id
}

/// Fold `export *` chains into the entry's visible surface. Star targets
/// contribute their named exports but never their default, matching how
/// ES module star re-exports behave.
fn entry_surface(slots: &[Slot]) -> ResolvedSurface {
    let mut surface = ResolvedSurface {
        named: Vec::new(),
        has_default: slots[0].surface.has_default,
        external_stars: Vec::new(),
    };
    let mut visited = HashSet::new();
    fold_stars(slots, 0, &mut surface, &mut visited);
    surface
}

fn fold_stars(
    slots: &[Slot],
    id: usize,
    surface: &mut ResolvedSurface,
    visited: &mut HashSet<usize>,
) {
    if !visited.insert(id) {
        return;
    }
    let slot = &slots[id];
    for name in &slot.surface.named {
        if !surface.named.contains(name) {
            surface.named.push(name.clone());
        }
    }
    for star in &slot.surface.stars {
        match slot.map.get(star) {
            Some(&target) => fold_stars(slots, target, surface, visited),
            None => {
                if !surface.external_stars.iter().any(|s| s == star) {
                    surface.external_stars.push(star.clone());
                }
            }
        }
    }
}
