//! Skull Renderer (spec §4.5).
//!
//! Player heads are Minecraft's one "builtin/entity" model: instead of a
//! JSON element list, the game hardcodes a head cube plus a slightly larger
//! "hat" overlay cube, both UV-mapped against the player's skin image
//! rather than a regular block texture. This module is the builtin-entity
//! counterpart the Model Resolver defers to when it meets
//! `ModelInstance::is_builtin_entity`. Grounded on the teacher's
//! `skeleton_asset.rs` bone-to-mesh special case (one hardcoded shape
//! outside the normal asset pipeline, same as this cube is outside the
//! normal JSON model pipeline) and, for the skin UV layout itself,
//! `other_examples/`'s `nmsr-aas` skull/head projection.

#[cfg(feature = "http")]
use std::io::Read as _;
use std::sync::Arc;

use glam::Vec3;
use image::{Rgba, RgbaImage};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::Warning;
use crate::mesh::{Triangle, Vertex};
use crate::model::FaceDirection;
use crate::nbt::ProfileComponent;
use crate::texture::TextureAsset;

/// Sentinel resource id carried by skull triangles' `texture` field; it is
/// never looked up in the asset registry — the renderer recognizes it and
/// samples the request's own decoded skin image instead.
pub const SKIN_SENTINEL_TEXTURE: &str = "mcrender:skull/skin";

const SKIN_WIDTH: f32 = 64.0;
const SKIN_HEIGHT: f32 = 64.0;

/// Head cube bounds, in the usual [0, 16] element space.
const HEAD_FROM: [f32; 3] = [4.0, 0.0, 4.0];
const HEAD_TO: [f32; 3] = [12.0, 8.0, 12.0];

/// Hat overlay: the head cube scaled 12.5% larger about its own center.
const HAT_FROM: [f32; 3] = [3.5, -0.5, 3.5];
const HAT_TO: [f32; 3] = [12.5, 8.5, 12.5];

/// `(x, y, w, h)` in skin-image pixels for one cube's six faces.
type UvLayout = [(FaceDirection, (f32, f32, f32, f32)); 6];

const HEAD_UV: UvLayout = [
    (FaceDirection::Up, (8.0, 0.0, 8.0, 8.0)),
    (FaceDirection::Down, (16.0, 0.0, 8.0, 8.0)),
    (FaceDirection::East, (0.0, 8.0, 8.0, 8.0)),
    (FaceDirection::South, (8.0, 8.0, 8.0, 8.0)),
    (FaceDirection::West, (16.0, 8.0, 8.0, 8.0)),
    (FaceDirection::North, (24.0, 8.0, 8.0, 8.0)),
];

const HAT_UV: UvLayout = [
    (FaceDirection::Up, (40.0, 0.0, 8.0, 8.0)),
    (FaceDirection::Down, (48.0, 0.0, 8.0, 8.0)),
    (FaceDirection::East, (32.0, 8.0, 8.0, 8.0)),
    (FaceDirection::South, (40.0, 8.0, 8.0, 8.0)),
    (FaceDirection::West, (48.0, 8.0, 8.0, 8.0)),
    (FaceDirection::North, (56.0, 8.0, 8.0, 8.0)),
];

/// Builds the head-plus-hat-overlay triangle list for a player head. Both
/// cubes carry [`SKIN_SENTINEL_TEXTURE`] — the caller is responsible for
/// sampling the actual skin image when it sees that id.
#[must_use]
pub fn build_head_triangles() -> Vec<Triangle> {
    let mut triangles = cube_triangles(HEAD_FROM, HEAD_TO, &HEAD_UV, 0);
    triangles.extend(cube_triangles(HAT_FROM, HAT_TO, &HAT_UV, 1));
    triangles
}

fn cube_triangles(from: [f32; 3], to: [f32; 3], uv_layout: &UvLayout, element_index: usize) -> Vec<Triangle> {
    let mut out = Vec::with_capacity(12);
    for &(direction, (ux, uy, uw, uh)) in uv_layout {
        let (raw_corners, uv_corners) = face_geometry(direction, from, to, (ux, uy, uw, uh));
        let verts: Vec<Vertex> = raw_corners
            .iter()
            .zip(uv_corners.iter())
            .map(|(&p, &uv)| Vertex {
                pos: Vec3::from(p) / 16.0 - Vec3::splat(0.5),
                uv,
            })
            .collect();

        let normal = (verts[1].pos - verts[0].pos).cross(verts[2].pos - verts[0].pos);
        let expected = outward_normal(direction);
        let (v0, v1, v2, v3) = if normal.dot(expected) < 0.0 {
            (verts[0], verts[3], verts[2], verts[1])
        } else {
            (verts[0], verts[1], verts[2], verts[3])
        };

        for tri_verts in [[v0, v1, v2], [v0, v2, v3]] {
            out.push(Triangle {
                vertices: tri_verts,
                texture: SKIN_SENTINEL_TEXTURE.to_string(),
                tint_index: None,
                direction,
                element_index,
                rendering_priority: 0,
                shade: true,
            });
        }
    }
    out
}

fn outward_normal(direction: FaceDirection) -> Vec3 {
    match direction {
        FaceDirection::Up => Vec3::Y,
        FaceDirection::Down => -Vec3::Y,
        FaceDirection::North => -Vec3::Z,
        FaceDirection::South => Vec3::Z,
        FaceDirection::East => Vec3::X,
        FaceDirection::West => -Vec3::X,
    }
}

/// Raw (unrotated) corner positions and their matching skin-pixel UVs,
/// normalized to [0, 1]. Same 4-corner traversal order as the Mesh
/// Builder's auto-UV table, just against a fixed declared rect instead of
/// a from/to-derived one.
fn face_geometry(
    direction: FaceDirection,
    from: [f32; 3],
    to: [f32; 3],
    (ux, uy, uw, uh): (f32, f32, f32, f32),
) -> ([[f32; 3]; 4], [[f32; 2]; 4]) {
    let [fx, fy, fz] = from;
    let [tx, ty, tz] = to;
    let corners = match direction {
        FaceDirection::Up => [[fx, ty, tz], [tx, ty, tz], [tx, ty, fz], [fx, ty, fz]],
        FaceDirection::Down => [[fx, fy, fz], [tx, fy, fz], [tx, fy, tz], [fx, fy, tz]],
        FaceDirection::North => [[tx, fy, fz], [fx, fy, fz], [fx, ty, fz], [tx, ty, fz]],
        FaceDirection::South => [[fx, fy, tz], [tx, fy, tz], [tx, ty, tz], [fx, ty, tz]],
        FaceDirection::East => [[tx, fy, fz], [tx, fy, tz], [tx, ty, tz], [tx, ty, fz]],
        FaceDirection::West => [[fx, fy, tz], [fx, fy, fz], [fx, ty, fz], [fx, ty, tz]],
    };
    let uv = [
        [ux / SKIN_WIDTH, uy / SKIN_HEIGHT],
        [(ux + uw) / SKIN_WIDTH, uy / SKIN_HEIGHT],
        [(ux + uw) / SKIN_WIDTH, (uy + uh) / SKIN_HEIGHT],
        [ux / SKIN_WIDTH, (uy + uh) / SKIN_HEIGHT],
    ];
    (corners, uv)
}

/// Extracts the skin download URL from a `minecraft:profile` component's
/// base64-encoded `textures` property, per Mojang's session-server shape:
/// `{"textures":{"SKIN":{"url":"..."}}}`.
#[must_use]
pub fn decode_profile_skin_url(profile: &ProfileComponent) -> Option<String> {
    let textures_property = profile.properties.iter().find(|p| p.name == "textures")?;
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &textures_property.value).ok()?;
    let json: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    json.get("textures")?.get("SKIN")?.get("url")?.as_str().map(str::to_string)
}

/// A flat, hardcoded approximation of the default "Steve" skin, used
/// whenever a profile has no decodable skin (spec §4.5 fallback).
#[must_use]
pub fn default_skin() -> TextureAsset {
    let mut img = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 0]));
    let skin_tone = Rgba([224, 168, 128, 255]);
    let hair = Rgba([72, 48, 32, 255]);

    fill_rect(&mut img, 8, 0, 8, 8, hair);
    fill_rect(&mut img, 16, 0, 8, 8, skin_tone);
    for (x, _, _, _) in [(0, 8, 8, 8), (8, 8, 8, 8), (16, 8, 8, 8), (24, 8, 8, 8)] {
        fill_rect(&mut img, x, 8, 8, 8, skin_tone);
    }
    // eyebrow band on the front face reads as a hairline without needing a
    // real asset on disk.
    fill_rect(&mut img, 8, 10, 8, 1, hair);

    TextureAsset {
        resource_id: "mcrender:skull/default-skin".to_string(),
        pixels: img,
        animation: None,
    }
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, color);
        }
    }
}

#[cfg(not(feature = "http"))]
fn fetch_skin_bytes(_url: &str) -> Option<Vec<u8>> {
    None
}

#[cfg(feature = "http")]
fn fetch_skin_bytes(url: &str) -> Option<Vec<u8>> {
    let response = ureq::get(url).call().ok()?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

fn decode_skin(bytes: &[u8]) -> Option<TextureAsset> {
    let image = image::load_from_memory(bytes).ok()?.into_rgba8();
    Some(TextureAsset {
        resource_id: "mcrender:skull/fetched-skin".to_string(),
        pixels: image,
        animation: None,
    })
}

/// Single-flight skin fetch cache keyed by skin URL: concurrent requests
/// for the same URL share one in-flight fetch rather than each issuing a
/// network call (spec §5 concurrency model, extended to this one
/// network-touching component).
#[derive(Default)]
pub struct SkullSkinCache {
    entries: Mutex<FxHashMap<String, Arc<OnceCell<(Arc<TextureAsset>, bool)>>>>,
}

impl SkullSkinCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `profile` to a skin texture, fetching over the network only
    /// under the `http` feature and only once per distinct URL. Falls back
    /// to [`default_skin`] and records [`Warning::SkinDecodeFailed`] when
    /// the profile has no usable skin URL or the fetch/decode fails.
    pub fn resolve(&self, profile: Option<&ProfileComponent>, warnings: &mut Vec<Warning>) -> Arc<TextureAsset> {
        let Some(url) = profile.and_then(decode_profile_skin_url) else {
            warnings.push(Warning::SkinDecodeFailed("no profile texture url".to_string()));
            return Arc::new(default_skin());
        };

        let cell = {
            let mut entries = self.entries.lock();
            entries.entry(url.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let (asset, used_fallback) = cell
            .get_or_init(|| match fetch_skin_bytes(&url).and_then(|b| decode_skin(&b)) {
                Some(asset) => (Arc::new(asset), false),
                None => (Arc::new(default_skin()), true),
            })
            .clone();

        if used_fallback {
            warnings.push(Warning::SkinDecodeFailed(url));
        }
        asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_and_hat_each_emit_twelve_triangles() {
        let triangles = build_head_triangles();
        assert_eq!(triangles.len(), 24);
        assert_eq!(triangles.iter().filter(|t| t.element_index == 0).count(), 12);
        assert_eq!(triangles.iter().filter(|t| t.element_index == 1).count(), 12);
    }

    #[test]
    fn all_triangles_use_the_skin_sentinel() {
        for tri in build_head_triangles() {
            assert_eq!(tri.texture, SKIN_SENTINEL_TEXTURE);
        }
    }

    #[test]
    fn missing_profile_falls_back_to_default_skin_with_warning() {
        let cache = SkullSkinCache::new();
        let mut warnings = Vec::new();
        let asset = cache.resolve(None, &mut warnings);
        assert_eq!(asset.pixels.width(), 64);
        assert!(warnings.iter().any(|w| matches!(w, Warning::SkinDecodeFailed(_))));
    }

    #[test]
    fn decodes_textures_url_from_profile() {
        let payload = serde_json::json!({ "textures": { "SKIN": { "url": "https://textures.minecraft.net/texture/abc" } } });
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, payload.to_string());
        let profile = ProfileComponent {
            id: None,
            properties: vec![crate::nbt::ProfileProperty {
                name: "textures".to_string(),
                value: encoded,
                signature: None,
            }],
        };
        let url = decode_profile_skin_url(&profile).unwrap();
        assert_eq!(url, "https://textures.minecraft.net/texture/abc");
    }
}
