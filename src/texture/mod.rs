//! Texture Repository (spec §4.2).
//!
//! Loads, caches, and tints image data keyed by resource id; understands the
//! animated-texture metadata sidecar; supplies biome/constant-tint variants.
//!
//! The cache itself is grounded on the teacher's `AssetStorage<H, T>`
//! (`panxinmiao-myth/src/assets/storage.rs`): a `parking_lot::RwLock`
//! guarding a hash map, read-mostly, safe for concurrent readers, with
//! inserts serialized through the write lock — exactly the concurrency
//! contract spec §5 asks for.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::options::BiomeKind;
use crate::registry::AssetNamespaceRegistry;

pub const MISSING_TEXTURE_ID: &str = "minecraft:missingno";
const MISSING_TEXTURE_SIZE: u32 = 16;

/// One frame reference in an animation's frame table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub index: u32,
    pub duration_ticks: u32,
}

/// Per-texture animation description (spec §3 `AnimationMeta`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMeta {
    pub frame_height: u32,
    pub frames: Vec<AnimationFrame>,
    pub interpolate: bool,
}

impl AnimationMeta {
    /// Total duration of one full loop through the frame table, in ticks.
    #[must_use]
    pub fn total_duration_ticks(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ticks)).sum()
    }
}

#[derive(Debug, Deserialize)]
struct McMetaFile {
    animation: McMetaAnimation,
}

#[derive(Debug, Deserialize)]
struct McMetaAnimation {
    #[serde(default)]
    frametime: Option<u32>,
    #[serde(default)]
    frames: Option<Vec<McMetaFrame>>,
    #[serde(default)]
    interpolate: bool,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum McMetaFrame {
    Index(u32),
    Explicit { index: u32, time: Option<u32> },
}

/// A loaded texture: raw RGBA8 pixels plus optional animation metadata
/// (spec §3 `TextureAsset`).
#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub resource_id: String,
    pub pixels: RgbaImage,
    pub animation: Option<AnimationMeta>,
}

impl TextureAsset {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height of a single animation frame strip; the full image height when
    /// the texture is not animated.
    #[must_use]
    pub fn frame_height(&self) -> u32 {
        self.animation
            .as_ref()
            .map_or_else(|| self.pixels.height(), |a| a.frame_height)
    }

    /// Samples the pixel at `(x, y)` within animation frame `frame_index`
    /// (0 when not animated), clamping out-of-range coordinates to the edge
    /// (wrap disabled, per spec §4.8).
    #[must_use]
    pub fn sample(&self, x: u32, y: u32, frame_index: u32) -> Rgba<u8> {
        let fh = self.frame_height();
        let cx = x.min(self.pixels.width().saturating_sub(1));
        let cy = (frame_index * fh + y.min(fh.saturating_sub(1))).min(self.pixels.height().saturating_sub(1));
        *self.pixels.get_pixel(cx, cy)
    }

    fn missingno() -> Self {
        let mut img = RgbaImage::new(MISSING_TEXTURE_SIZE, MISSING_TEXTURE_SIZE);
        let half = MISSING_TEXTURE_SIZE / 2;
        for y in 0..MISSING_TEXTURE_SIZE {
            for x in 0..MISSING_TEXTURE_SIZE {
                let magenta = (x < half) == (y < half);
                let pixel = if magenta {
                    Rgba([255, 0, 255, 255])
                } else {
                    Rgba([0, 0, 0, 255])
                };
                img.put_pixel(x, y, pixel);
            }
        }
        Self {
            resource_id: MISSING_TEXTURE_ID.to_string(),
            pixels: img,
            animation: None,
        }
    }
}

/// Blend mode for [`TextureRepository::get_tinted`] (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTintBlend {
    /// `out = src * (1 - strength) + src * tint * strength`.
    Default,
    /// `out = src * tint` component-wise, ignoring `strength`.
    Multiply,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct TintKey {
    resource_id_hash: u64,
    tint: [u8; 3],
    strength_bits: u32,
    blend: ColorTintBlend,
}

fn rgb_to_bytes(rgb: [f32; 3]) -> [u8; 3] {
    [
        (rgb[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb[2].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

fn hash_str(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Biome tint table (spec testable property 6's grass-block example; values
/// are the constant per-biome multipliers Minecraft ships for foliage/grass,
/// reproduced here since the renderer has no live biome-color map to sample
/// from).
fn biome_tint_rgb(kind: BiomeKind) -> [f32; 3] {
    match kind {
        BiomeKind::Plains => [0.588, 0.745, 0.349],
        BiomeKind::Swamp => [0.416, 0.439, 0.224],
        BiomeKind::Desert => [0.749, 0.718, 0.329],
        BiomeKind::DarkForest => [0.294, 0.651, 0.247],
        BiomeKind::BadlandsFoliage => [0.788, 0.616, 0.329],
    }
}

/// Loads, caches, and tints [`TextureAsset`]s.
///
/// Cache keys include the requesting pack-stack hash, not just the resource
/// id — two renders with different pack stacks must never share a cache
/// entry, since the same resource id can resolve to different bytes
/// depending on which packs are active (spec §8 testable property 4).
pub struct TextureRepository {
    cache: RwLock<FxHashMap<(String, String), Arc<TextureAsset>>>,
    tint_cache: RwLock<FxHashMap<TintKey, Arc<TextureAsset>>>,
    missingno: Arc<TextureAsset>,
}

impl Default for TextureRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(FxHashMap::default()),
            tint_cache: RwLock::new(FxHashMap::default()),
            missingno: Arc::new(TextureAsset::missingno()),
        }
    }

    /// Resolves `resource_id` ("ns:path") to a texture under `pack_stack`,
    /// consulting `registry` override-first within that stack. Falls back to
    /// the missing-texture sentinel and never fails — spec §4.2: "Missing
    /// textures yield a sentinel, not a failure."
    pub fn get(&self, registry: &AssetNamespaceRegistry, resource_id: &str, pack_stack: &[String]) -> Arc<TextureAsset> {
        let cache_key = (resource_id.to_string(), pack_stack.join("\u{1}"));
        if let Some(hit) = self.cache.read().get(&cache_key) {
            return hit.clone();
        }

        let asset = self
            .load(registry, resource_id, pack_stack)
            .map(Arc::new)
            .unwrap_or_else(|| {
                log::warn!("texture not found: {resource_id}, using missingno");
                self.missingno.clone()
            });

        self.cache.write().entry(cache_key).or_insert(asset).clone()
    }

    fn load(&self, registry: &AssetNamespaceRegistry, resource_id: &str, pack_stack: &[String]) -> Option<TextureAsset> {
        let (namespace, path) = split_resource_id(resource_id)?;
        let (bytes, _source_id) = registry.find_texture_in_stack(namespace, path, pack_stack)?;
        let image = image::load_from_memory(&bytes).ok()?.into_rgba8();

        let animation = registry
            .find_mcmeta_in_stack(namespace, path, pack_stack)
            .and_then(|b| parse_mcmeta(&b, image.width()));

        Some(TextureAsset {
            resource_id: resource_id.to_string(),
            pixels: image,
            animation,
        })
    }

    /// Returns `Some(meta)` if the texture carries animation metadata.
    pub fn animation_meta(&self, registry: &AssetNamespaceRegistry, resource_id: &str, pack_stack: &[String]) -> Option<AnimationMeta> {
        self.get(registry, resource_id, pack_stack).animation.clone()
    }

    /// Applies a constant RGB tint at the given strength/blend mode,
    /// returning a cached, newly-allocated texture (spec §4.2).
    pub fn get_tinted(
        &self,
        registry: &AssetNamespaceRegistry,
        resource_id: &str,
        pack_stack: &[String],
        tint: [f32; 3],
        strength: f32,
        blend: ColorTintBlend,
    ) -> Arc<TextureAsset> {
        let tint_bytes = rgb_to_bytes(tint);
        let key = TintKey {
            resource_id_hash: hash_str(&format!("{resource_id}\u{1}{}", pack_stack.join("\u{1}"))),
            tint: tint_bytes,
            strength_bits: strength.clamp(0.0, 1.0).to_bits(),
            blend,
        };
        if let Some(hit) = self.tint_cache.read().get(&key) {
            return hit.clone();
        }

        let base = self.get(registry, resource_id, pack_stack);
        let tinted = apply_tint(&base, tint, strength.clamp(0.0, 1.0), blend);
        let arc = Arc::new(tinted);
        self.tint_cache.write().entry(key).or_insert(arc).clone()
    }

    /// Applies the constant biome tint associated with `kind` at full
    /// strength under the default blend mode.
    pub fn get_biome_tinted(
        &self,
        registry: &AssetNamespaceRegistry,
        resource_id: &str,
        pack_stack: &[String],
        kind: BiomeKind,
    ) -> Arc<TextureAsset> {
        self.get_tinted(registry, resource_id, pack_stack, biome_tint_rgb(kind), 1.0, ColorTintBlend::Default)
    }

    #[must_use]
    pub fn missingno(&self) -> Arc<TextureAsset> {
        self.missingno.clone()
    }
}

fn apply_tint(base: &TextureAsset, tint: [f32; 3], strength: f32, blend: ColorTintBlend) -> TextureAsset {
    let mut out = base.pixels.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let srcf = [f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0];
        let outf = match blend {
            ColorTintBlend::Default => [
                srcf[0] * (1.0 - strength) + srcf[0] * tint[0] * strength,
                srcf[1] * (1.0 - strength) + srcf[1] * tint[1] * strength,
                srcf[2] * (1.0 - strength) + srcf[2] * tint[2] * strength,
            ],
            ColorTintBlend::Multiply => [srcf[0] * tint[0], srcf[1] * tint[1], srcf[2] * tint[2]],
        };
        *pixel = Rgba([
            (outf[0].clamp(0.0, 1.0) * 255.0).round() as u8,
            (outf[1].clamp(0.0, 1.0) * 255.0).round() as u8,
            (outf[2].clamp(0.0, 1.0) * 255.0).round() as u8,
            a,
        ]);
    }
    TextureAsset {
        resource_id: base.resource_id.clone(),
        pixels: out,
        animation: base.animation.clone(),
    }
}

fn parse_mcmeta(bytes: &[u8], texture_width: u32) -> Option<AnimationMeta> {
    let text = std::str::from_utf8(bytes).ok()?;
    let parsed: McMetaFile = serde_json::from_str(text).ok()?;
    let frame_height = parsed.animation.height.unwrap_or(texture_width).max(1);
    let default_duration = parsed.animation.frametime.unwrap_or(1).max(1);

    let frames = match parsed.animation.frames {
        Some(entries) => entries
            .into_iter()
            .map(|f| match f {
                McMetaFrame::Index(index) => AnimationFrame {
                    index,
                    duration_ticks: default_duration,
                },
                McMetaFrame::Explicit { index, time } => AnimationFrame {
                    index,
                    duration_ticks: time.unwrap_or(default_duration).max(1),
                },
            })
            .collect(),
        None => Vec::new(),
    };

    Some(AnimationMeta {
        frame_height,
        frames,
        interpolate: parsed.animation.interpolate,
    })
}

/// Splits `"ns:path"` into `(namespace, path)`. Returns `None` for malformed
/// ids (empty namespace or path).
#[must_use]
pub fn split_resource_id(resource_id: &str) -> Option<(&str, &str)> {
    let (ns, path) = resource_id.split_once(':')?;
    if ns.is_empty() || path.is_empty() {
        return None;
    }
    Some((ns, path))
}
