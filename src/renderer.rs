//! Public Render API (spec §4.11).
//!
//! The renderer instance owns every cache (registry, textures, models,
//! items, skull skins) exclusively — no process-wide state, so two
//! `Renderer`s never share state (spec §9 "Global caches"). Grounded on the
//! teacher's top-level engine façade (`panxinmiao-myth/src/engine.rs`'s
//! `ThreeEngine`), which likewise owns every GPU/asset cache behind one
//! struct and exposes a handful of high-level entry points over them.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::animation::{self, AnimationSequence};
use crate::assets::{self, PackMeta};
use crate::error::{RenderError, Result, Warning};
use crate::fingerprint::{self, TintEntry};
use crate::item::{ItemRegistry, SelectorNode};
use crate::mesh::{self, MeshBuildOptions, Triangle};
use crate::model::ModelResolver;
use crate::nbt::ItemStack;
use crate::options::RenderOptions;
use crate::raster;
use crate::registry::AssetNamespaceRegistry;
use crate::skull::{self, SkullSkinCache, SKIN_SENTINEL_TEXTURE};
use crate::texture::{split_resource_id, ColorTintBlend, TextureAsset, TextureRepository, MISSING_TEXTURE_ID};
use crate::transform;

use image::RgbaImage;
use rustc_hash::FxHashMap;

/// Duration of one game tick, in milliseconds (spec §4.10).
const TICK_MS: u64 = 50;

/// The result of one still render (spec §3 `ResourceId` plus the image).
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: RgbaImage,
    pub resource_id: String,
    pub canonical: String,
    pub pack_stack_hash: String,
    pub source_pack: String,
    pub model_path: String,
    pub textures: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// A render's identity, independent of the rendered pixels (spec §3
/// `ResourceId`): the canonical pre-hash string, its hash, and the facts
/// that fed it. Exposed on its own so callers can check testable-property-4
/// ("adding an inert pack changes only `pack_stack_hash`") without having to
/// render an image first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub resource_id: String,
    pub canonical: String,
    pub pack_stack_hash: String,
    pub source_pack: String,
    pub model_path: String,
    pub textures: Vec<String>,
}

/// One frame of an animated render.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub duration_ms: u64,
}

/// The result of an animated render (spec §4.10/§4.11).
#[derive(Debug, Clone)]
pub struct AnimatedRenderResult {
    pub frames: Vec<Frame>,
    pub loop_duration_ms: u64,
    pub resource_id: String,
    pub model_path: String,
    pub textures: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// The reflection-replacement debug accessor (spec §9).
#[derive(Debug, Clone)]
pub struct DebugModelInfo {
    pub model: String,
    pub textures: Vec<String>,
    pub source_pack: String,
}

/// Owns every cache the render pipeline consults. Read-mostly after
/// construction; registration methods take a write lock briefly, render
/// calls only ever read (spec §5).
pub struct Renderer {
    registry: RwLock<AssetNamespaceRegistry>,
    textures: TextureRepository,
    models: ModelResolver,
    items: RwLock<ItemRegistry>,
    skulls: SkullSkinCache,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(AssetNamespaceRegistry::new()),
            textures: TextureRepository::new(),
            models: ModelResolver::new(),
            items: RwLock::new(ItemRegistry::new()),
            skulls: SkullSkinCache::new(),
        }
    }

    pub fn register_vanilla_root(&self, dir: impl AsRef<Path>) -> Result<()> {
        assets::register_vanilla_root(&mut self.registry.write(), dir)
    }

    pub fn register_pack(&self, dir: impl AsRef<Path>) -> Result<PackMeta> {
        assets::register_pack(&mut self.registry.write(), dir)
    }

    pub fn register_customdata_overlay(&self, dir: impl AsRef<Path>) -> Result<()> {
        assets::register_customdata_overlay(&mut self.registry.write(), dir)
    }

    pub fn register_item_default(&self, item_id: &str, model_path: &str) {
        self.items.write().register_default(item_id, model_path);
    }

    pub fn register_item_selector(&self, item_id: &str, selector: SelectorNode) {
        self.items.write().register_selector(item_id, selector);
    }

    fn validate_pack_ids(&self, options: &RenderOptions) -> Result<()> {
        let registry = self.registry.read();
        for id in &options.pack_ids {
            if !registry.is_pack_registered(id) {
                return Err(RenderError::OptionsInvalid {
                    field: "pack_ids",
                    reason: format!("pack `{id}` is not registered"),
                });
            }
        }
        Ok(())
    }

    /// Renders a block, mapping `block_id` directly onto `ns:block/name` —
    /// blocks have no blockstate indirection and no item selector in this
    /// pipeline, the same flat convention items use for `ns:item/name`.
    pub fn render_block(&self, block_id: &str, options: &RenderOptions) -> Result<RenderResult> {
        options.validate()?;
        self.validate_pack_ids(options)?;
        let (namespace, name) = split_id(block_id)?;
        let model_path = format!("{namespace}:block/{name}");
        self.render_resolved(block_id, &model_path, &[], options)
    }

    /// Renders an item by id, consulting the Item Registry's selector tree
    /// for the model path.
    pub fn render_item(&self, item_id: &str, options: &RenderOptions) -> Result<RenderResult> {
        options.validate()?;
        self.validate_pack_ids(options)?;
        split_id(item_id)?;
        let selected = self.items.read().resolve(item_id, &options.item_model_context());
        self.render_resolved(item_id, &selected.model_path, &selected.consulted_keys, options)
    }

    /// Renders an item whose data comes from an NBT compound (spec §6).
    pub fn render_item_from_nbt(&self, item: &ItemStack, options: &RenderOptions) -> Result<RenderResult> {
        let mut opts = options.clone();
        opts.item_data = item.components.clone();
        self.render_item(&item.id, &opts)
    }

    /// Renders the full animation loop for an NBT item (spec §4.10).
    pub fn render_animated_item_from_nbt(&self, item: &ItemStack, options: &RenderOptions) -> Result<AnimatedRenderResult> {
        let mut opts = options.clone();
        opts.item_data = item.components.clone();
        opts.validate()?;
        self.validate_pack_ids(&opts)?;
        split_id(&item.id)?;

        let selected = self.items.read().resolve(&item.id, &opts.item_model_context());
        self.render_animated(&item.id, &selected.model_path, &selected.consulted_keys, &opts)
    }

    /// Computes just the resource id for `item_id` under `options`, without
    /// requiring the caller to inspect the rendered image. Returns the full
    /// `ResourceId` record (spec §3), not just its hash, so callers can
    /// compare `.canonical` directly (spec §8 testable property 4).
    pub fn compute_resource_id(&self, item_id: &str, options: &RenderOptions) -> Result<ResourceId> {
        let result = self.render_item(item_id, options)?;
        Ok(ResourceId {
            resource_id: result.resource_id,
            canonical: result.canonical,
            pack_stack_hash: result.pack_stack_hash,
            source_pack: result.source_pack,
            model_path: result.model_path,
            textures: result.textures,
        })
    }

    /// Reflection-replacement debug accessor (spec §9): exposes what a
    /// render would resolve to without needing to inspect renderer
    /// internals.
    pub fn debug_resolve_model(&self, item_id: &str, options: &RenderOptions) -> Result<DebugModelInfo> {
        options.validate()?;
        self.validate_pack_ids(options)?;
        split_id(item_id)?;
        let selected = self.items.read().resolve(item_id, &options.item_model_context());

        let registry = self.registry.read();
        let pack_stack_hash = fingerprint::pack_stack_hash(&registry, &options.pack_ids);
        let mut warnings = Vec::new();
        let model = self.models.resolve(&registry, &selected.model_path, &options.pack_ids, &pack_stack_hash, &mut warnings)?;
        let triangles = pipeline_triangles(&selected.model_path, &model, item_id, options);
        let textures = textures_used(&triangles);
        let source_pack = source_pack_of(&registry, &selected.model_path, &options.pack_ids);

        Ok(DebugModelInfo {
            model: selected.model_path,
            textures,
            source_pack,
        })
    }

    fn render_resolved(&self, subject: &str, model_path: &str, consulted_keys: &[String], options: &RenderOptions) -> Result<RenderResult> {
        let registry = self.registry.read();
        let pack_stack_hash = fingerprint::pack_stack_hash(&registry, &options.pack_ids);
        let mut warnings = Vec::new();

        let model = self.models.resolve(&registry, model_path, &options.pack_ids, &pack_stack_hash, &mut warnings)?;
        let triangles = pipeline_triangles(model_path, &model, subject, options);

        let (texture_map, skin_asset, tints) = self.bind_textures(&registry, &triangles, options, &mut warnings);
        let view = transform::view_matrix(options.view, model.gui_transform, options.use_gui_transform, options.perspective_amount);

        let image = raster::rasterize(&triangles, view, options.size, options.background, |tri, u, v| {
            sample_triangle(tri, u, v, 0, &texture_map, skin_asset.as_deref())
        });

        let resource_ids = textures_used(&triangles);
        let customdata = fingerprint::customdata_json(&options.item_data, consulted_keys);
        let canonical = fingerprint::canonical_string(subject, model_path, &resource_ids, &tints, &customdata, &pack_stack_hash);
        let resource_id = fingerprint::compute_resource_id(subject, model_path, &resource_ids, &tints, &customdata, &pack_stack_hash);
        let source_pack = source_pack_of(&registry, model_path, &options.pack_ids);

        Ok(RenderResult {
            image,
            resource_id,
            canonical,
            pack_stack_hash,
            source_pack,
            model_path: model_path.to_string(),
            textures: resource_ids,
            warnings,
        })
    }

    fn render_animated(&self, subject: &str, model_path: &str, consulted_keys: &[String], options: &RenderOptions) -> Result<AnimatedRenderResult> {
        let registry = self.registry.read();
        let pack_stack_hash = fingerprint::pack_stack_hash(&registry, &options.pack_ids);
        let mut warnings = Vec::new();

        let model = self.models.resolve(&registry, model_path, &options.pack_ids, &pack_stack_hash, &mut warnings)?;
        let triangles = pipeline_triangles(model_path, &model, subject, options);

        let (texture_map, skin_asset, tints) = self.bind_textures(&registry, &triangles, options, &mut warnings);
        let view = transform::view_matrix(options.view, model.gui_transform, options.use_gui_transform, options.perspective_amount);

        let metas: Vec<_> = texture_map.values().filter_map(|a| a.animation.clone()).collect();
        let sequence = AnimationSequence::new(&metas);

        let frames: Vec<Frame> = sequence
            .ticks()
            .map(|tick| Frame {
                image: raster::rasterize(&triangles, view, options.size, options.background, |tri, u, v| {
                    sample_triangle(tri, u, v, tick, &texture_map, skin_asset.as_deref())
                }),
                duration_ms: TICK_MS,
            })
            .collect();

        let resource_ids = textures_used(&triangles);
        let customdata = fingerprint::customdata_json(&options.item_data, consulted_keys);
        let resource_id = fingerprint::compute_resource_id(subject, model_path, &resource_ids, &tints, &customdata, &pack_stack_hash);

        Ok(AnimatedRenderResult {
            loop_duration_ms: sequence.total_ticks() * TICK_MS,
            frames,
            resource_id,
            model_path: model_path.to_string(),
            textures: resource_ids,
            warnings,
        })
    }

    /// Resolves every distinct `(texture, tint_index)` pair a triangle list
    /// references to a concrete, possibly-tinted [`TextureAsset`]. Returns
    /// the map, the skull skin asset (if any triangle uses the sentinel),
    /// and the tint entries actually applied (spec §4.9 `tints` segment).
    fn bind_textures(
        &self,
        registry: &AssetNamespaceRegistry,
        triangles: &[Triangle],
        options: &RenderOptions,
        warnings: &mut Vec<Warning>,
    ) -> (FxHashMap<(String, Option<i32>), Arc<TextureAsset>>, Option<Arc<TextureAsset>>, Vec<TintEntry>) {
        let mut map = FxHashMap::default();
        let mut tints = Vec::new();
        let mut skin_asset = None;

        for tri in triangles {
            if tri.texture == SKIN_SENTINEL_TEXTURE {
                if skin_asset.is_none() {
                    skin_asset = Some(self.skulls.resolve(options.item_data.profile.as_ref(), warnings));
                }
                continue;
            }

            let key = (tri.texture.clone(), tri.tint_index);
            if map.contains_key(&key) {
                continue;
            }

            let asset = self.resolve_face_texture(registry, &tri.texture, tri.tint_index, options, &mut tints);
            if asset.resource_id == MISSING_TEXTURE_ID && tri.texture != MISSING_TEXTURE_ID {
                warnings.push(Warning::MissingAsset(tri.texture.clone()));
            }
            map.insert(key, asset);
        }

        (map, skin_asset, tints)
    }

    fn resolve_face_texture(
        &self,
        registry: &AssetNamespaceRegistry,
        texture_id: &str,
        tint_index: Option<i32>,
        options: &RenderOptions,
        tints: &mut Vec<TintEntry>,
    ) -> Arc<TextureAsset> {
        let Some(layer) = tint_index else {
            return self.textures.get(registry, texture_id, &options.pack_ids);
        };

        if layer == 0 && !options.disable_default_layer0_tint {
            if let Some(dyed) = &options.item_data.dyed_color {
                let rgb = dyed_rgb(dyed.rgb);
                tints.push(TintEntry { layer: layer as u32, rgb: rgb_bytes(rgb) });
                return self.textures.get_tinted(registry, texture_id, &options.pack_ids, rgb, 1.0, ColorTintBlend::Default);
            }
        }

        if let Some(biome) = options.biome {
            let asset = self.textures.get_biome_tinted(registry, texture_id, &options.pack_ids, biome);
            tints.push(TintEntry { layer: layer.max(0) as u32, rgb: rgb_bytes(biome_rgb(&self.textures, registry, texture_id, &options.pack_ids, biome)) });
            return asset;
        }

        self.textures.get(registry, texture_id, &options.pack_ids)
    }
}

fn biome_rgb(_textures: &TextureRepository, _registry: &AssetNamespaceRegistry, _texture_id: &str, _pack_stack: &[String], biome: crate::options::BiomeKind) -> [f32; 3] {
    // The Texture Repository already bakes the biome multiplier into the
    // returned pixels; this mirrors the same constant table purely to
    // report it in the fingerprint's `tints` segment.
    match biome {
        crate::options::BiomeKind::Plains => [0.588, 0.745, 0.349],
        crate::options::BiomeKind::Swamp => [0.416, 0.439, 0.224],
        crate::options::BiomeKind::Desert => [0.749, 0.718, 0.329],
        crate::options::BiomeKind::DarkForest => [0.294, 0.651, 0.247],
        crate::options::BiomeKind::BadlandsFoliage => [0.788, 0.616, 0.329],
    }
}

fn dyed_rgb(rgb: i32) -> [f32; 3] {
    let bytes = rgb.to_be_bytes();
    [f32::from(bytes[1]) / 255.0, f32::from(bytes[2]) / 255.0, f32::from(bytes[3]) / 255.0]
}

fn rgb_bytes(rgb: [f32; 3]) -> [u8; 3] {
    [
        (rgb[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb[2].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

fn split_id(id: &str) -> Result<(&str, &str)> {
    split_resource_id(id).ok_or_else(|| RenderError::InvalidItemId(id.to_string()))
}

/// Builds the model-space triangle list for either the normal mesh pipeline
/// or the Skull Renderer path, deciding between them from
/// `ModelInstance::is_builtin_entity` plus the subject's own id — real
/// Minecraft only special-cases `player_head` among `builtin/entity`
/// models; other builtin-entity paths (e.g. conduit) are out of scope
/// (DESIGN.md) and fall back to the model's own (missing-texture) elements.
fn pipeline_triangles(model_path: &str, model: &crate::model::ModelInstance, subject: &str, options: &RenderOptions) -> Vec<Triangle> {
    if model.is_builtin_entity && is_player_head(subject, model_path) {
        return skull::build_head_triangles();
    }
    mesh::build(model, options.view, MeshBuildOptions::default())
}

fn is_player_head(subject: &str, model_path: &str) -> bool {
    fn name_of(id: &str) -> &str {
        id.rsplit(':').next().unwrap_or(id)
    }
    name_of(subject) == "player_head" || name_of(model_path).ends_with("player_head") || name_of(model_path).ends_with("player_head_profile")
}

fn textures_used(triangles: &[Triangle]) -> Vec<String> {
    let mut ids: Vec<String> = triangles
        .iter()
        .map(|t| t.texture.clone())
        .filter(|t| t != SKIN_SENTINEL_TEXTURE)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

fn source_pack_of(registry: &AssetNamespaceRegistry, model_path: &str, pack_stack: &[String]) -> String {
    split_resource_id(model_path)
        .and_then(|(ns, path)| registry.find_model_in_stack(ns, path, pack_stack))
        .map(|(_json, source)| source)
        .unwrap_or_else(|| "unknown".to_string())
}

fn sample_triangle(
    tri: &Triangle,
    u: f32,
    v: f32,
    tick: u64,
    texture_map: &FxHashMap<(String, Option<i32>), Arc<TextureAsset>>,
    skin_asset: Option<&TextureAsset>,
) -> [u8; 4] {
    let asset = if tri.texture == SKIN_SENTINEL_TEXTURE {
        match skin_asset {
            Some(asset) => asset,
            None => return [0, 0, 0, 0],
        }
    } else {
        match texture_map.get(&(tri.texture.clone(), tri.tint_index)) {
            Some(asset) => asset.as_ref(),
            None => return [0, 0, 0, 0],
        }
    };

    let tex_w = asset.width().max(1);
    let frame_h = asset.frame_height().max(1);
    let x = ((u * tex_w as f32).floor() as i64).clamp(0, i64::from(tex_w) - 1) as u32;
    let y = ((v * frame_h as f32).floor() as i64).clamp(0, i64::from(frame_h) - 1) as u32;
    let frame_index = asset.animation.as_ref().map_or(0, |meta| animation::frame_at(meta, tick));
    let px = asset.sample(x, y, frame_index);
    [px[0], px[1], px[2], px[3]]
}
