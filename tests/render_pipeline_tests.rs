//! End-to-end Render Pipeline Tests
//!
//! Tests for:
//! - render_block: opaque cube through the full registry/model/texture/raster path
//! - render_item: GUI-transform silhouette for a generated-parent item
//! - render_item_from_nbt: player head through the Skull Renderer
//! - render_animated_item_from_nbt: multi-frame animated texture
//! - compute_resource_id: pack-stack-only fingerprint changes (spec §8 property 4)
//! - biome tinting on a tint-indexed face

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use image::{Rgba, RgbaImage};
use mcrender::nbt::{ItemComponents, ItemStack, ProfileComponent, ProfileProperty};
use mcrender::options::{BiomeKind, RenderOptions, View};
use mcrender::renderer::Renderer;

fn tempdir(label: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("mcrender-it-{label}-{}-{}", std::process::id(), n));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_json(path: &std::path::Path, value: &serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = std::fs::File::create(path).unwrap();
    write!(f, "{value}").unwrap();
}

fn solid_png(path: &std::path::Path, w: u32, h: u32, color: Rgba<u8>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbaImage::from_pixel(w, h, color);
    img.save(path).unwrap();
}

// ============================================================================
// render_block
// ============================================================================

#[test]
fn render_block_grass_block_with_biome_tint_skews_green() {
    let dir = tempdir("biome");
    write_json(
        &dir.join("models/block/grass_block.json"),
        &serde_json::json!({
            "elements": [{
                "from": [0.0, 0.0, 0.0],
                "to": [16.0, 16.0, 16.0],
                "faces": {
                    "up": {"texture": "#top", "tintindex": 0},
                    "down": {"texture": "#bottom"},
                    "north": {"texture": "#side"}, "south": {"texture": "#side"},
                    "east": {"texture": "#side"}, "west": {"texture": "#side"}
                }
            }],
            "textures": {
                "top": "minecraft:block/grass_block_top",
                "bottom": "minecraft:block/dirt",
                "side": "minecraft:block/grass_block_side"
            }
        }),
    );
    // A flat gray top texture; the biome tint should be the only source of color.
    solid_png(&dir.join("textures/block/grass_block_top.png"), 16, 16, Rgba([200, 200, 200, 255]));
    solid_png(&dir.join("textures/block/dirt.png"), 16, 16, Rgba([120, 90, 60, 255]));
    solid_png(&dir.join("textures/block/grass_block_side.png"), 16, 16, Rgba([150, 150, 150, 255]));

    let renderer = Renderer::new();
    renderer.register_vanilla_root(&dir).unwrap();

    let options = RenderOptions {
        size: 32,
        view: View::Isometric,
        biome: Some(BiomeKind::Plains),
        ..RenderOptions::default()
    };
    let result = renderer.render_block("minecraft:grass_block", &options).unwrap();

    // The top face (tinted) should contain pixels distinctly greener than the
    // flat gray the untinted side/bottom textures would produce; a plain pixel
    // scan avoids depending on exactly where the isometric silhouette lands.
    let has_green_skewed_pixel = result
        .image
        .pixels()
        .filter(|p| p.0[3] > 0)
        .any(|p| i32::from(p.0[1]) >= i32::from(p.0[0]) + 20 && i32::from(p.0[1]) >= i32::from(p.0[2]) + 20);
    assert!(has_green_skewed_pixel, "expected at least one green-skewed pixel from the biome-tinted top face");
}

// ============================================================================
// render_item
// ============================================================================

#[test]
fn render_item_generated_sword_in_gui_view_is_nontransparent() {
    let dir = tempdir("item");
    write_json(
        &dir.join("models/item/diamond_sword.json"),
        &serde_json::json!({
            "parent": "item/generated",
            "textures": { "layer0": "minecraft:item/diamond_sword" }
        }),
    );
    solid_png(&dir.join("textures/item/diamond_sword.png"), 16, 16, Rgba([60, 200, 220, 255]));

    let renderer = Renderer::new();
    renderer.register_vanilla_root(&dir).unwrap();

    let options = RenderOptions { size: 64, view: View::Gui, use_gui_transform: true, ..RenderOptions::default() };
    let result = renderer.render_item("minecraft:diamond_sword", &options).unwrap();

    assert_eq!(result.model_path, "minecraft:item/diamond_sword");
    assert!(result.textures.contains(&"minecraft:item/diamond_sword".to_string()));
    let non_transparent = result.image.pixels().filter(|p| p.0[3] > 0).count();
    assert!(non_transparent > 0);
}

// ============================================================================
// render_item_from_nbt: Skull Renderer
// ============================================================================

#[test]
fn render_player_head_falls_back_to_default_skin_with_warning() {
    let dir = tempdir("head");
    write_json(
        &dir.join("models/item/player_head.json"),
        &serde_json::json!({ "parent": "minecraft:builtin/entity" }),
    );

    let renderer = Renderer::new();
    renderer.register_vanilla_root(&dir).unwrap();
    renderer.register_item_default("minecraft:player_head", "minecraft:item/player_head");

    let payload = serde_json::json!({ "textures": { "SKIN": { "url": "https://textures.minecraft.net/texture/unreachable" } } });
    let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, payload.to_string());
    let profile = ProfileComponent {
        id: Some("4566e69f-c907-48ee-8d71-d7ba5aa00d20".to_string()),
        properties: vec![ProfileProperty { name: "textures".to_string(), value: encoded, signature: None }],
    };
    let item = ItemStack {
        id: "minecraft:player_head".to_string(),
        count: 1,
        components: ItemComponents { profile: Some(profile), ..ItemComponents::default() },
    };

    let options = RenderOptions { size: 32, view: View::Front, ..RenderOptions::default() };
    let result = renderer.render_item_from_nbt(&item, &options).unwrap();

    assert!(result.model_path.ends_with("player_head"));
    let non_transparent = result.image.pixels().filter(|p| p.0[3] > 0).count();
    assert!(non_transparent > 0, "head cube should render something even on a skin-fetch fallback");
    // The `http` feature is off by default, so the fetch never happens and the
    // default skin is used — recorded as a warning, not a hard failure.
    assert!(!result.warnings.is_empty());
}

// ============================================================================
// render_animated_item_from_nbt
// ============================================================================

#[test]
fn render_animated_compass_produces_multiple_frames() {
    let dir = tempdir("anim");
    write_json(
        &dir.join("models/item/compass.json"),
        &serde_json::json!({
            "parent": "item/generated",
            "textures": { "layer0": "minecraft:item/compass" }
        }),
    );
    // A 3-frame vertical strip, 16px per frame, 2 ticks each.
    let mut img = RgbaImage::new(16, 48);
    for (i, color) in [Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255]), Rgba([0, 0, 255, 255])].into_iter().enumerate() {
        for y in 0..16 {
            for x in 0..16 {
                img.put_pixel(x, i as u32 * 16 + y, color);
            }
        }
    }
    std::fs::create_dir_all(dir.join("textures/item")).unwrap();
    img.save(dir.join("textures/item/compass.png")).unwrap();
    write_json(
        &dir.join("textures/item/compass.png.mcmeta"),
        &serde_json::json!({ "animation": { "frametime": 2, "frames": [0, 1, 2] } }),
    );

    let renderer = Renderer::new();
    renderer.register_vanilla_root(&dir).unwrap();

    let item = ItemStack { id: "minecraft:compass".to_string(), count: 1, components: ItemComponents::default() };
    let options = RenderOptions { size: 16, view: View::Front, ..RenderOptions::default() };
    let result = renderer.render_animated_item_from_nbt(&item, &options).unwrap();

    assert!(result.frames.len() >= 3, "expected at least one output frame per source frame");
    assert_eq!(result.loop_duration_ms, 6 * 50);
}

// ============================================================================
// compute_resource_id / fingerprint stability
// ============================================================================

#[test]
fn compute_resource_id_is_stable_and_tracks_the_active_pack_stack() {
    let dir = tempdir("fp");
    write_json(
        &dir.join("models/item/diamond_sword.json"),
        &serde_json::json!({
            "parent": "item/generated",
            "textures": { "layer0": "minecraft:item/diamond_sword" }
        }),
    );
    solid_png(&dir.join("textures/item/diamond_sword.png"), 16, 16, Rgba([60, 200, 220, 255]));

    let renderer = Renderer::new();
    renderer.register_vanilla_root(&dir).unwrap();

    let options = RenderOptions::default();
    let before = renderer.compute_resource_id("minecraft:diamond_sword", &options).unwrap();

    let pack_dir = dir.join("unrelated-pack");
    std::fs::create_dir_all(pack_dir.join("assets/minecraft/textures")).unwrap();
    std::fs::write(pack_dir.join("meta.json"), r#"{"id":"unrelated","version":"1"}"#).unwrap();
    renderer.register_pack(&pack_dir).unwrap();

    let after_options = RenderOptions { pack_ids: vec!["unrelated".to_string()], ..RenderOptions::default() };
    let after = renderer.compute_resource_id("minecraft:diamond_sword", &after_options).unwrap();

    assert_ne!(before.resource_id, after.resource_id, "pack_stack segment should differ once a pack is in the stack");
    // spec §8 testable property 4: an inert pack only moves pack_stack_hash.
    let before_canonical = before.canonical.rsplit_once("|pack=").unwrap().0;
    let after_canonical = after.canonical.rsplit_once("|pack=").unwrap().0;
    assert_eq!(before_canonical, after_canonical);
    assert_ne!(before.pack_stack_hash, after.pack_stack_hash);

    // Rendering again with the same pack stack is stable.
    let again = renderer.compute_resource_id("minecraft:diamond_sword", &after_options).unwrap();
    assert_eq!(after, again);
}

// ============================================================================
// debug_resolve_model
// ============================================================================

#[test]
fn debug_resolve_model_reports_source_pack_and_textures() {
    let dir = tempdir("debug");
    write_json(
        &dir.join("models/block/stone.json"),
        &serde_json::json!({
            "parent": "block/cube_all",
            "textures": { "all": "minecraft:block/stone" }
        }),
    );
    write_json(
        &dir.join("models/block/cube_all.json"),
        &serde_json::json!({
            "elements": [{
                "from": [0.0, 0.0, 0.0],
                "to": [16.0, 16.0, 16.0],
                "faces": {
                    "up": {"texture": "#all"}, "down": {"texture": "#all"},
                    "north": {"texture": "#all"}, "south": {"texture": "#all"},
                    "east": {"texture": "#all"}, "west": {"texture": "#all"}
                }
            }]
        }),
    );
    solid_png(&dir.join("textures/block/stone.png"), 16, 16, Rgba([120, 120, 120, 255]));

    let renderer = Renderer::new();
    renderer.register_vanilla_root(&dir).unwrap();

    let info = renderer.debug_resolve_model("minecraft:stone", &RenderOptions::default()).unwrap();
    assert_eq!(info.model, "minecraft:block/stone");
    assert_eq!(info.textures, vec!["minecraft:block/stone".to_string()]);
    assert_eq!(info.source_pack, "vanilla");
}
