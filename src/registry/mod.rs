//! Asset Namespace Registry (spec §4.1).
//!
//! Deterministic, priority-ordered lookup of asset files across a stack of
//! vanilla roots, custom-data overlays, and registered texture packs.
//! Grounded on the teacher's `AssetReader`/`AssetReaderVariant` abstraction
//! (`src/assets/io.rs`), which likewise lets callers enumerate candidate
//! sources without caring whether a given root is a filesystem directory or
//! something else; here every root is a filesystem directory, but the
//! override-first ordering (last-registered root in a render's pack stack
//! wins) mirrors the `nmsr-aas` model resolver's "last registered pack wins"
//! convention.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::AssetSource;

pub const VANILLA_NAMESPACE: &str = "minecraft";

/// A single root directory registered for a namespace.
#[derive(Clone)]
pub struct NamespaceRoot {
    pub namespace: String,
    pub path: PathBuf,
    pub source_id: String,
    pub is_vanilla: bool,
    pub source: Arc<AssetSource>,
}

impl std::fmt::Debug for NamespaceRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceRoot")
            .field("namespace", &self.namespace)
            .field("path", &self.path)
            .field("source_id", &self.source_id)
            .field("is_vanilla", &self.is_vanilla)
            .finish_non_exhaustive()
    }
}

/// Priority-ordered list of `(namespace, root)` entries.
///
/// Ordering contract: the vanilla root of a namespace is always inserted
/// first; every subsequent overlay/pack registration appends to the end.
/// `prefer_overrides=true` iteration walks the list tail-first so the most
/// recently registered root wins ties.
#[derive(Debug, Default)]
pub struct AssetNamespaceRegistry {
    roots: Vec<NamespaceRoot>,
    pack_versions: std::collections::HashMap<String, String>,
}

impl AssetNamespaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a root. Vanilla roots should be added before any overlay
    /// for the same namespace to preserve the ordering contract; this is a
    /// caller responsibility, not enforced here (mirrors the spec's
    /// "inserted first" phrasing, which describes construction order, not a
    /// runtime invariant the registry re-sorts to maintain).
    pub fn add(
        &mut self,
        namespace: &str,
        path: impl Into<PathBuf>,
        source_id: &str,
        is_vanilla: bool,
        source: Arc<AssetSource>,
    ) {
        self.roots.push(NamespaceRoot {
            namespace: namespace.to_string(),
            path: path.into(),
            source_id: source_id.to_string(),
            is_vanilla,
            source,
        });
    }

    /// Returns all roots registered for `namespace`, in registration order.
    /// Falls back to `minecraft` roots if `namespace` has none registered
    /// and `fallback_to_minecraft` is true.
    #[must_use]
    pub fn resolve_roots(&self, namespace: &str, fallback_to_minecraft: bool) -> Vec<&NamespaceRoot> {
        let direct: Vec<&NamespaceRoot> = self
            .roots
            .iter()
            .filter(|r| r.namespace == namespace)
            .collect();
        if direct.is_empty() && fallback_to_minecraft && namespace != VANILLA_NAMESPACE {
            return self
                .roots
                .iter()
                .filter(|r| r.namespace == VANILLA_NAMESPACE)
                .collect();
        }
        direct
    }

    /// Resolves the roots that apply to one specific render: the
    /// namespace's vanilla root (or `minecraft`'s, as fallback), its
    /// `customdata` overlay if any — both always active — followed by
    /// whichever registered packs `pack_stack` names, in the exact order
    /// given (spec §3 `PackStack`: "last id has highest priority", i.e. this
    /// is a per-render selection from the full set of ever-registered
    /// packs, not the full registry).
    #[must_use]
    fn resolve_roots_for_stack<'a>(&'a self, namespace: &str, pack_stack: &[String]) -> Vec<&'a NamespaceRoot> {
        let ns_roots: Vec<&NamespaceRoot> = self.roots.iter().filter(|r| r.namespace == namespace).collect();
        let has_vanilla = ns_roots.iter().any(|r| r.is_vanilla);

        let mut result: Vec<&NamespaceRoot> = if has_vanilla {
            ns_roots.iter().copied().filter(|r| r.is_vanilla).collect()
        } else if namespace == VANILLA_NAMESPACE {
            Vec::new()
        } else {
            self.roots.iter().filter(|r| r.namespace == VANILLA_NAMESPACE && r.is_vanilla).collect()
        };

        result.extend(ns_roots.iter().copied().filter(|r| r.source_id == "customdata"));
        for pack_id in pack_stack {
            result.extend(ns_roots.iter().copied().filter(|r| &r.source_id == pack_id));
        }
        result
    }

    /// Every candidate path `relative_path` could resolve to under
    /// `namespace`, across all roots ever registered for it (not scoped to
    /// any one render's `pack_ids` — see `find_*_in_stack` for that). With
    /// `prefer_overrides = true` the iterator walks tail-first, so the most
    /// recently registered root is tried first; with `false` it walks in
    /// registration order, vanilla first, so a caller wanting the original
    /// fallback chain (rather than the override that wins) can ask for it.
    pub fn enumerate_candidates<'a>(
        &'a self,
        namespace: &str,
        relative_path: &'a Path,
        prefer_overrides: bool,
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        let mut roots = self.resolve_roots(namespace, true);
        if prefer_overrides {
            roots.reverse();
        }
        Box::new(roots.into_iter().map(move |r| r.path.join(relative_path)))
    }

    /// Finds texture bytes for `ns:path` under the given per-render pack
    /// stack, override-first (last entry in `pack_stack` wins).
    #[must_use]
    pub fn find_texture_in_stack(&self, namespace: &str, path: &str, pack_stack: &[String]) -> Option<(Vec<u8>, String)> {
        let mut roots = self.resolve_roots_for_stack(namespace, pack_stack);
        roots.reverse();
        roots
            .into_iter()
            .find_map(|r| r.source.read_texture_bytes(namespace, path).map(|b| (b, r.source_id.clone())))
    }

    /// Finds the `.mcmeta` animation sidecar for `ns:path` under `pack_stack`.
    #[must_use]
    pub fn find_mcmeta_in_stack(&self, namespace: &str, path: &str, pack_stack: &[String]) -> Option<Vec<u8>> {
        let mut roots = self.resolve_roots_for_stack(namespace, pack_stack);
        roots.reverse();
        roots.into_iter().find_map(|r| r.source.read_mcmeta_bytes(namespace, path))
    }

    /// Finds model JSON for `ns:path` under `pack_stack`.
    #[must_use]
    pub fn find_model_in_stack(&self, namespace: &str, path: &str, pack_stack: &[String]) -> Option<(serde_json::Value, String)> {
        let mut roots = self.resolve_roots_for_stack(namespace, pack_stack);
        roots.reverse();
        roots
            .into_iter()
            .find_map(|r| r.source.read_model_json(namespace, path).map(|v| (v, r.source_id.clone())))
    }

    #[must_use]
    pub fn is_pack_registered(&self, pack_id: &str) -> bool {
        self.roots.iter().any(|r| r.source_id == pack_id)
    }

    /// The `(id, version)` of every registered pack, in registration order —
    /// consulted by the Resource Fingerprinter to build `pack_stack_hash`.
    #[must_use]
    pub fn pack_version(&self, pack_id: &str) -> Option<&str> {
        self.pack_versions.get(pack_id).map(String::as_str)
    }

    pub fn register_pack_version(&mut self, pack_id: &str, version: &str) {
        self.pack_versions.insert(pack_id.to_string(), version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_source() -> Arc<AssetSource> {
        Arc::new(AssetSource::VanillaTree {
            root: PathBuf::new(),
        })
    }

    #[test]
    fn falls_back_to_minecraft_when_namespace_unregistered() {
        let mut reg = AssetNamespaceRegistry::new();
        reg.add("minecraft", "/vanilla", "vanilla", true, fake_source());
        let roots = reg.resolve_roots("custom", true);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].source_id, "vanilla");
    }

    #[test]
    fn enumerate_candidates_prefer_overrides_reverses_registration_order() {
        let mut reg = AssetNamespaceRegistry::new();
        reg.add("minecraft", "/vanilla", "vanilla", true, fake_source());
        reg.add("minecraft", "/pack-a", "pack-a", false, fake_source());
        reg.add("minecraft", "/pack-b", "pack-b", false, fake_source());

        let relative = PathBuf::from("textures/block/stone.png");

        let fallback_first: Vec<PathBuf> = reg.enumerate_candidates("minecraft", &relative, false).collect();
        assert_eq!(
            fallback_first,
            vec![
                PathBuf::from("/vanilla/textures/block/stone.png"),
                PathBuf::from("/pack-a/textures/block/stone.png"),
                PathBuf::from("/pack-b/textures/block/stone.png"),
            ]
        );

        let override_first: Vec<PathBuf> = reg.enumerate_candidates("minecraft", &relative, true).collect();
        assert_eq!(
            override_first,
            vec![
                PathBuf::from("/pack-b/textures/block/stone.png"),
                PathBuf::from("/pack-a/textures/block/stone.png"),
                PathBuf::from("/vanilla/textures/block/stone.png"),
            ]
        );
    }
}
