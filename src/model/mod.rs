//! Model Resolver (spec §4.3).
//!
//! Loads block/item model JSON, follows `parent` chains (cycle-guarded),
//! merges element lists and texture-slot maps bottom-up, and expands `#slot`
//! texture references to concrete `ns:path` ids. Grounded on the teacher's
//! prefab/skeleton merge pattern (`panxinmiao-myth/src/assets/prefab.rs`,
//! `skeleton_asset.rs`), which likewise assembles a flattened runtime
//! instance from a chain of on-disk definitions.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{RenderError, Result, Warning};
use crate::registry::AssetNamespaceRegistry;
use crate::texture::MISSING_TEXTURE_ID;

pub const GENERATED_PARENT: &str = "minecraft:item/generated";
pub const BUILTIN_ENTITY_PARENT: &str = "minecraft:builtin/entity";
const MAX_PARENT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceDirection {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl FaceDirection {
    pub const ALL: [FaceDirection; 6] = [
        FaceDirection::Up,
        FaceDirection::Down,
        FaceDirection::North,
        FaceDirection::South,
        FaceDirection::East,
        FaceDirection::West,
    ];

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "up" => Some(FaceDirection::Up),
            "down" => Some(FaceDirection::Down),
            "north" => Some(FaceDirection::North),
            "south" => Some(FaceDirection::South),
            "east" => Some(FaceDirection::East),
            "west" => Some(FaceDirection::West),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A single element's optional rotation (spec §3 `ModelElement`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRotation {
    pub axis: Axis,
    pub origin: [f32; 3],
    pub angle: f32,
    /// Disabled by default (see DESIGN.md open-question decision); carried
    /// for evaluation builds only.
    pub rescale: bool,
}

/// A single face within an element (spec §3 `ModelFace`).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFace {
    pub direction: FaceDirection,
    /// Resolved to a concrete `ns:path` id by the time the `ModelInstance`
    /// is returned to callers.
    pub texture: String,
    pub uv: Option<[f32; 4]>,
    pub tint_index: Option<i32>,
    pub rotation: u32,
    pub cullface: Option<FaceDirection>,
}

/// A single cuboid within a model (spec §3 `ModelElement`).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelElement {
    pub from: [f32; 3],
    pub to: [f32; 3],
    pub rotation: Option<ElementRotation>,
    pub faces: Vec<ModelFace>,
    pub shade: bool,
}

/// GUI/perspective display transform triple (spec §4.7 / GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    pub rotation: [f32; 3],
    pub translation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for DisplayTransform {
    fn default() -> Self {
        Self {
            rotation: [0.0; 3],
            translation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// The flattened, fully-resolved model (spec §3 `ModelInstance`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelInstance {
    pub elements: Vec<ModelElement>,
    pub gui_transform: Option<DisplayTransform>,
    pub ambient_occlusion: bool,
    /// True for `item/generated`-family models and `builtin/entity`; the
    /// Skull Renderer path is taken by the caller when this is set *and*
    /// the source model named `builtin/entity`.
    pub is_builtin_entity: bool,
}

// ---------------------------------------------------------------------
// Raw JSON shapes
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct ModelJson {
    parent: Option<String>,
    #[serde(default)]
    textures: FxHashMap<String, String>,
    elements: Option<Vec<ElementJson>>,
    display: Option<FxHashMap<String, DisplayJson>>,
    ambientocclusion: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
struct ElementJson {
    from: [f32; 3],
    to: [f32; 3],
    rotation: Option<RotationJson>,
    #[serde(default)]
    faces: FxHashMap<String, FaceJson>,
    shade: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
struct RotationJson {
    origin: [f32; 3],
    axis: String,
    angle: f32,
    #[serde(default)]
    rescale: bool,
}

#[derive(Debug, Deserialize, Clone)]
struct FaceJson {
    uv: Option<[f32; 4]>,
    texture: String,
    rotation: Option<u32>,
    tintindex: Option<i32>,
    cullface: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DisplayJson {
    #[serde(default)]
    rotation: [f32; 3],
    #[serde(default)]
    translation: [f32; 3],
    #[serde(default = "default_scale")]
    scale: [f32; 3],
}

fn default_scale() -> [f32; 3] {
    [1.0; 3]
}

// ---------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------

struct RawModel {
    parent: Option<String>,
    textures: FxHashMap<String, String>,
    elements: Option<Vec<ElementJson>>,
    display: Option<FxHashMap<String, DisplayJson>>,
    ambient_occlusion: Option<bool>,
}

/// Loads and flattens block/item model JSON into a [`ModelInstance`],
/// memoizing by `(model_path, pack_stack_hash)` (spec §4.3).
pub struct ModelResolver {
    cache: parking_lot::RwLock<FxHashMap<(String, String), Arc<ModelInstance>>>,
}

impl Default for ModelResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: parking_lot::RwLock::new(FxHashMap::default()),
        }
    }

    /// Resolves `model_path` ("ns:block/cube_all") into a flattened
    /// instance, following `parent` chains and expanding texture slots.
    pub fn resolve(
        &self,
        registry: &AssetNamespaceRegistry,
        model_path: &str,
        pack_stack: &[String],
        pack_stack_hash: &str,
        warnings: &mut Vec<Warning>,
    ) -> Result<Arc<ModelInstance>> {
        let key = (model_path.to_string(), pack_stack_hash.to_string());
        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(hit.clone());
        }

        let instance = Arc::new(self.resolve_uncached(registry, model_path, pack_stack, warnings)?);
        Ok(self.cache.write().entry(key).or_insert(instance).clone())
    }

    fn resolve_uncached(
        &self,
        registry: &AssetNamespaceRegistry,
        model_path: &str,
        pack_stack: &[String],
        warnings: &mut Vec<Warning>,
    ) -> Result<ModelInstance> {
        let mut visited = Vec::new();
        let chain = self.load_parent_chain(registry, model_path, pack_stack, &mut visited, warnings)?;

        if chain.is_empty() {
            return Ok(cube_with_missing_textures());
        }

        // chain is root-first (furthest ancestor first); merge bottom-up so
        // a child's textures/elements override its parent's.
        let mut textures: FxHashMap<String, String> = FxHashMap::default();
        let mut elements: Option<Vec<ElementJson>> = None;
        let mut display: FxHashMap<String, DisplayJson> = FxHashMap::default();
        let mut ambient_occlusion = true;
        let mut is_builtin_entity = false;
        let mut synthesize_generated = false;

        for raw in &chain {
            if raw.parent.as_deref() == Some(GENERATED_PARENT) {
                synthesize_generated = true;
            }
            if raw.parent.as_deref() == Some(BUILTIN_ENTITY_PARENT) {
                is_builtin_entity = true;
            }
            for (k, v) in &raw.textures {
                textures.insert(k.clone(), v.clone());
            }
            if let Some(e) = &raw.elements {
                elements = Some(e.clone());
            }
            if let Some(d) = &raw.display {
                for (k, v) in d {
                    display.insert(k.clone(), DisplayJson {
                        rotation: v.rotation,
                        translation: v.translation,
                        scale: v.scale,
                    });
                }
            }
            if let Some(ao) = raw.ambient_occlusion {
                ambient_occlusion = ao;
            }
        }

        let elements = if synthesize_generated {
            synthesize_generated_elements(&textures)
        } else {
            elements.unwrap_or_default()
        };

        let mut resolved_elements = Vec::with_capacity(elements.len());
        for el in &elements {
            resolved_elements.push(resolve_element(el, &textures, warnings, model_path)?);
        }

        let gui_transform = display.get("gui").map(|d| DisplayTransform {
            rotation: d.rotation,
            translation: d.translation,
            scale: d.scale,
        });

        Ok(ModelInstance {
            elements: resolved_elements,
            gui_transform,
            ambient_occlusion,
            is_builtin_entity,
        })
    }

    /// Loads `model_path` and its `parent` chain, root-first, with a
    /// cycle guard. A detected cycle (or hitting `MAX_PARENT_DEPTH`) emits a
    /// [`Warning::ModelCycleDetected`] and discards the whole chain rather
    /// than keeping the real ancestor data already loaded, so the caller's
    /// empty-chain check substitutes the missing-texture sentinel cube
    /// instead of merging a partial, cycle-tainted model (spec §7).
    fn load_parent_chain(
        &self,
        registry: &AssetNamespaceRegistry,
        model_path: &str,
        pack_stack: &[String],
        visited: &mut Vec<String>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<RawModel>> {
        let mut chain = Vec::new();
        let mut current = Some(model_path.to_string());

        while let Some(path) = current {
            if visited.contains(&path) {
                warnings.push(Warning::ModelCycleDetected(path));
                chain.clear();
                break;
            }
            if visited.len() >= MAX_PARENT_DEPTH {
                warnings.push(Warning::ModelCycleDetected(path));
                chain.clear();
                break;
            }
            visited.push(path.clone());

            // Stop descending through the two synthetic parents; they are
            // markers consumed by this resolver, not real model documents.
            if path == GENERATED_PARENT || path == BUILTIN_ENTITY_PARENT {
                chain.push(RawModel {
                    parent: Some(path),
                    textures: FxHashMap::default(),
                    elements: None,
                    display: None,
                    ambient_occlusion: None,
                });
                break;
            }

            let Some((namespace, relpath)) = crate::texture::split_resource_id(&path) else {
                return Err(RenderError::ModelParseError {
                    path: path.clone(),
                    reason: "malformed model path".to_string(),
                });
            };

            let Some((json, _source)) = registry.find_model_in_stack(namespace, relpath, pack_stack) else {
                warnings.push(Warning::MissingAsset(path.clone()));
                break;
            };

            let parsed: ModelJson = serde_json::from_value(json).map_err(|e| RenderError::ModelParseError {
                path: path.clone(),
                reason: e.to_string(),
            })?;

            let next_parent = parsed.parent.as_ref().map(|p| normalize_model_path(p));

            chain.push(RawModel {
                parent: next_parent.clone(),
                textures: parsed.textures,
                elements: parsed.elements,
                display: parsed.display,
                ambient_occlusion: parsed.ambientocclusion,
            });

            current = next_parent;
        }

        chain.reverse();
        Ok(chain)
    }
}

fn normalize_model_path(raw: &str) -> String {
    if raw.contains(':') {
        raw.to_string()
    } else {
        format!("minecraft:{raw}")
    }
}

/// Expands a `#slot` reference against `textures`, following indirection
/// chains with a cycle guard. Unresolved references collapse to the
/// missing-texture sentinel (spec §4.3).
fn resolve_texture_ref(raw: &str, textures: &FxHashMap<String, String>, warnings: &mut Vec<Warning>) -> String {
    let mut current = raw.to_string();
    let mut seen = Vec::new();
    loop {
        if !current.starts_with('#') {
            return normalize_model_path(&current);
        }
        if seen.contains(&current) {
            warnings.push(Warning::MissingAsset(raw.to_string()));
            return MISSING_TEXTURE_ID.to_string();
        }
        seen.push(current.clone());
        let slot = &current[1..];
        match textures.get(slot) {
            Some(next) => current = next.clone(),
            None => {
                warnings.push(Warning::MissingAsset(raw.to_string()));
                return MISSING_TEXTURE_ID.to_string();
            }
        }
    }
}

fn resolve_element(
    el: &ElementJson,
    textures: &FxHashMap<String, String>,
    warnings: &mut Vec<Warning>,
    model_path: &str,
) -> Result<ModelElement> {
    for i in 0..3 {
        if el.from[i] > el.to[i] {
            return Err(RenderError::ModelParseError {
                path: model_path.to_string(),
                reason: format!("element from must be <= to on axis {i}"),
            });
        }
    }

    let rotation = el.rotation.as_ref().map(|r| {
        let axis = match r.axis.as_str() {
            "x" => Axis::X,
            "y" => Axis::Y,
            _ => Axis::Z,
        };
        ElementRotation {
            axis,
            origin: r.origin,
            angle: r.angle,
            rescale: r.rescale,
        }
    });

    let mut faces = Vec::new();
    for (key, face) in &el.faces {
        let Some(direction) = FaceDirection::from_key(key) else {
            continue;
        };
        let texture = resolve_texture_ref(&face.texture, textures, warnings);
        let cullface = face.cullface.as_deref().and_then(FaceDirection::from_key);
        faces.push(ModelFace {
            direction,
            texture,
            uv: face.uv,
            tint_index: face.tintindex,
            rotation: face.rotation.unwrap_or(0) % 360,
            cullface,
        });
    }
    // Deterministic order: spec ties triangle emission order to
    // `(element_index, face_direction)`; sort faces by the canonical
    // direction order so that order doesn't depend on JSON key iteration.
    faces.sort_by_key(|f| FaceDirection::ALL.iter().position(|d| *d == f.direction).unwrap_or(usize::MAX));

    Ok(ModelElement {
        from: el.from,
        to: el.to,
        rotation,
        faces,
        shade: el.shade.unwrap_or(true),
    })
}

/// Synthesizes planar elements for `item/generated`-family models: one
/// paper-thin element per `layer<N>` texture, in ascending order, each set
/// slightly further back along +Z so overlapping layers don't z-fight
/// (spec §4.3).
fn synthesize_generated_elements(textures: &FxHashMap<String, String>) -> Vec<ElementJson> {
    let mut layers: Vec<(u32, &String)> = textures
        .iter()
        .filter_map(|(k, v)| k.strip_prefix("layer").and_then(|n| n.parse::<u32>().ok()).map(|n| (n, v)))
        .collect();
    layers.sort_by_key(|(n, _)| *n);

    layers
        .into_iter()
        .enumerate()
        .map(|(i, (layer_n, _))| {
            let z = 7.5 + i as f32 * 0.1;
            let mut faces = FxHashMap::default();
            faces.insert(
                "north".to_string(),
                FaceJson {
                    uv: Some([0.0, 0.0, 16.0, 16.0]),
                    texture: format!("#layer{layer_n}"),
                    rotation: None,
                    tintindex: Some(i as i32).filter(|_| layer_n == 0),
                    cullface: None,
                },
            );
            faces.insert(
                "south".to_string(),
                FaceJson {
                    uv: Some([0.0, 0.0, 16.0, 16.0]),
                    texture: format!("#layer{layer_n}"),
                    rotation: None,
                    tintindex: Some(i as i32).filter(|_| layer_n == 0),
                    cullface: None,
                },
            );
            ElementJson {
                from: [0.0, 0.0, z],
                to: [16.0, 16.0, z],
                rotation: None,
                faces,
                shade: Some(false),
            }
        })
        .collect()
}

fn cube_with_missing_textures() -> ModelInstance {
    let mut faces = FxHashMap::default();
    for key in ["up", "down", "north", "south", "east", "west"] {
        faces.insert(
            key.to_string(),
            FaceJson {
                uv: None,
                texture: MISSING_TEXTURE_ID.to_string(),
                rotation: None,
                tintindex: None,
                cullface: None,
            },
        );
    }
    let el = ElementJson {
        from: [0.0, 0.0, 0.0],
        to: [16.0, 16.0, 16.0],
        rotation: None,
        faces,
        shade: Some(true),
    };
    let mut warnings = Vec::new();
    let element = resolve_element(&el, &FxHashMap::default(), &mut warnings, "missingno-cube").unwrap();
    ModelInstance {
        elements: vec![element],
        gui_transform: None,
        ambient_occlusion: true,
        is_builtin_entity: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_model_paths() {
        assert_eq!(normalize_model_path("block/cube_all"), "minecraft:block/cube_all");
        assert_eq!(normalize_model_path("mypack:block/foo"), "mypack:block/foo");
    }

    #[test]
    fn resolves_direct_texture_reference() {
        let textures = FxHashMap::default();
        let mut warnings = Vec::new();
        let resolved = resolve_texture_ref("minecraft:block/stone", &textures, &mut warnings);
        assert_eq!(resolved, "minecraft:block/stone");
        assert!(warnings.is_empty());
    }

    #[test]
    fn slot_cycle_collapses_to_missingno() {
        let mut textures = FxHashMap::default();
        textures.insert("a".to_string(), "#b".to_string());
        textures.insert("b".to_string(), "#a".to_string());
        let mut warnings = Vec::new();
        let resolved = resolve_texture_ref("#a", &textures, &mut warnings);
        assert_eq!(resolved, MISSING_TEXTURE_ID);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn synthesizes_layers_in_ascending_order() {
        let mut textures = FxHashMap::default();
        textures.insert("layer1".to_string(), "minecraft:item/b".to_string());
        textures.insert("layer0".to_string(), "minecraft:item/a".to_string());
        let elements = synthesize_generated_elements(&textures);
        assert_eq!(elements.len(), 2);
        assert!(elements[0].from[2] < elements[1].from[2]);
    }

    #[test]
    fn missingno_cube_has_six_faces() {
        let cube = cube_with_missing_textures();
        assert_eq!(cube.elements.len(), 1);
        assert_eq!(cube.elements[0].faces.len(), 6);
    }

    #[test]
    fn model_parent_cycle_collapses_whole_chain_to_missing_cube() {
        let dir = tempdir();
        std::fs::create_dir_all(dir.join("models/block")).unwrap();
        std::fs::write(
            dir.join("models/block/a.json"),
            serde_json::json!({
                "parent": "minecraft:block/b",
                "elements": [{
                    "from": [0.0, 0.0, 0.0], "to": [16.0, 16.0, 16.0],
                    "faces": { "up": { "texture": "minecraft:block/stone" } }
                }]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.join("models/block/b.json"),
            serde_json::json!({ "parent": "minecraft:block/a" }).to_string(),
        )
        .unwrap();

        let mut registry = AssetNamespaceRegistry::new();
        crate::assets::register_vanilla_root(&mut registry, &dir).unwrap();

        let resolver = ModelResolver::new();
        let mut warnings = Vec::new();
        let instance = resolver.resolve(&registry, "minecraft:block/a", &[], "", &mut warnings).unwrap();

        let expected = cube_with_missing_textures();
        assert_eq!(instance.elements, expected.elements);
        assert!(warnings.iter().any(|w| matches!(w, Warning::ModelCycleDetected(_))));
    }

    fn tempdir() -> std::path::PathBuf {
        static COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("mcrender-model-cycle-{}-{}", std::process::id(), n));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
