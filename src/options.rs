//! Render-time configuration.
//!
//! `RenderOptions` is the renderer's only configuration surface (spec §3).
//! Following the teacher's convention for render-time config structs, this
//! is a plain struct built with `..Default::default()` rather than a
//! separate builder type.

use crate::item::ItemModelContext;
use crate::nbt::ItemComponents;

/// Named camera views the Transform Stack understands (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Flat orthographic front view, no GUI transform.
    Front,
    /// Minecraft's classic isometric block view (yaw 45°, pitch ~30°).
    Isometric,
    /// A second isometric variant rotated 90° in yaw, used for comparison
    /// renders.
    IsometricAlt,
    /// Inventory/GUI perspective: applies the model's `display.gui`
    /// transform when present, else the canonical 30°/225° fallback.
    #[default]
    Gui,
}

/// Solid or transparent image background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundColor {
    Transparent,
    Opaque([u8; 4]),
}

impl Default for BackgroundColor {
    fn default() -> Self {
        BackgroundColor::Transparent
    }
}

/// Biome tint kind for `get_biome_tinted` (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiomeKind {
    Plains,
    Swamp,
    Desert,
    DarkForest,
    BadlandsFoliage,
}

/// Shared options record accepted by every public render entry point.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Output image width and height, in pixels. Must be > 0.
    pub size: u32,
    /// Named camera view.
    pub view: View,
    /// Output image background.
    pub background: BackgroundColor,
    /// Whether to apply the model's GUI display transform (only meaningful
    /// when `view == View::Gui`).
    pub use_gui_transform: bool,
    /// Small perspective z-shear amount, clamped to [0, 0.25] (spec §4.7).
    pub perspective_amount: f32,
    /// Pack ids to overlay, deepest-priority-first is NOT the order here:
    /// this list is applied in registration order, last entry wins, exactly
    /// mirroring `PackStack`'s ordering contract.
    pub pack_ids: Vec<String>,
    /// Per-render item data (tints, custom data, skull profile).
    pub item_data: ItemComponents,
    /// Optional biome tint to apply to tint-indexed faces.
    pub biome: Option<BiomeKind>,
    /// When true, a face's `tint_index == Some(0)` is never recolored, even
    /// if the item data or biome would otherwise supply a tint.
    pub disable_default_layer0_tint: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: 64,
            view: View::default(),
            background: BackgroundColor::default(),
            use_gui_transform: true,
            perspective_amount: 0.0,
            pack_ids: Vec::new(),
            item_data: ItemComponents::default(),
            biome: None,
            disable_default_layer0_tint: false,
        }
    }
}

impl RenderOptions {
    /// Validates the subset of fields that must be checked before any work
    /// begins (spec §7 `OptionsInvalid`). Unknown-pack-id validation happens
    /// in `Renderer::render_*` once the registry is available.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.size == 0 {
            return Err(crate::error::RenderError::OptionsInvalid {
                field: "size",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(0.0..=0.25).contains(&self.perspective_amount) {
            return Err(crate::error::RenderError::OptionsInvalid {
                field: "perspective_amount",
                reason: "must be within [0, 0.25]".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn item_model_context(&self) -> ItemModelContext<'_> {
        ItemModelContext {
            item_data: &self.item_data,
            rendering_context: self.view,
        }
    }
}
