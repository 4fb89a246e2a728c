//! Transform Stack (spec §4.7).
//!
//! Composes the model's own `display.gui` transform (when applicable) with
//! a named camera orientation and an optional small perspective z-shear,
//! then projects the result onto the output pixel grid. Grounded on the
//! teacher's camera/projection split (`panxinmiao-myth/src/camera.rs`),
//! generalized from a free-flying perspective camera down to four fixed
//! named views plus Minecraft's baked-in per-model GUI transform.

use glam::{Mat4, Vec3, Vec4};

use crate::model::DisplayTransform;
use crate::options::View;

/// How much of camera-space XY maps across the full output size; the
/// rotated unit cube's diagonal is ~0.87, so this leaves a comfortable
/// margin without shrinking the model too far from the frame edges.
const VIEW_EXTENT: f32 = 1.2;

/// Builds the full model-space → camera-space matrix for one render.
///
/// `gui_transform` is only consulted for `View::Gui`, and only when
/// `use_gui_transform` is set — matching the spec's "only meaningful when
/// view == Gui" note on [`crate::options::RenderOptions::use_gui_transform`].
#[must_use]
pub fn view_matrix(
    view: View,
    gui_transform: Option<DisplayTransform>,
    use_gui_transform: bool,
    perspective_amount: f32,
) -> Mat4 {
    let mut m = camera_rotation(view);
    if view == View::Gui && use_gui_transform {
        m *= gui_display_matrix(gui_transform);
    }
    if perspective_amount > 0.0 {
        m = perspective_shear(perspective_amount) * m;
    }
    m
}

/// Fixed camera orientation for each named view (spec §4.7 / GLOSSARY).
fn camera_rotation(view: View) -> Mat4 {
    let (yaw_deg, pitch_deg): (f32, f32) = match view {
        View::Front => (0.0, 0.0),
        View::Isometric => (45.0, 30.0),
        View::IsometricAlt => (135.0, 30.0),
        View::Gui => (225.0, 30.0),
    };
    Mat4::from_rotation_x(-pitch_deg.to_radians()) * Mat4::from_rotation_y(yaw_deg.to_radians())
}

/// Minecraft's default inventory-slot scale when a model declares a `gui`
/// display block but the block itself omits `scale` (spec §4.7: "canonical
/// inventory rotation... scale 0.625").
const CANONICAL_GUI_SCALE: f32 = 0.625;

/// The model's own `display.gui` entry: rotate, then scale, then translate,
/// matching Minecraft's item-display convention. Translation units are
/// sixteenths of a block, same as element coordinates. When the model has no
/// `gui` entry at all, falls back to the canonical scale rather than an
/// unscaled identity, matching vanilla's baked-in default.
fn gui_display_matrix(display: Option<DisplayTransform>) -> Mat4 {
    let d = display.unwrap_or(DisplayTransform {
        rotation: [0.0; 3],
        translation: [0.0; 3],
        scale: [CANONICAL_GUI_SCALE; 3],
    });
    let translate = Mat4::from_translation(Vec3::from(d.translation) / 16.0);
    let rotate = Mat4::from_rotation_z(d.rotation[2].to_radians())
        * Mat4::from_rotation_y(d.rotation[1].to_radians())
        * Mat4::from_rotation_x(d.rotation[0].to_radians());
    let scale = Mat4::from_scale(Vec3::from(d.scale));
    translate * rotate * scale
}

/// A small z-shear as a function of camera-space x and y: `z' = z + a*x +
/// a*y`. Cheap stand-in for a full projective camera, clamped to [0, 0.25]
/// by `RenderOptions::validate` so it only ever nudges depth, never flips
/// triangle order on its own.
fn perspective_shear(amount: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, amount, 0.0),
        Vec4::new(0.0, 1.0, amount, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// A camera-space point projected onto the output pixel grid. `depth`
/// increases with distance from the camera; the Rasterizer sorts
/// descending by it so the farthest geometry is drawn first and the
/// nearest last, per the painter's algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

/// Orthographically projects `camera_space` into an `size`×`size` pixel
/// grid, flipping Y so that increasing camera-space Y (up) moves toward
/// the top of the image (row 0). The camera looks down `-Z`, so distance
/// from the camera is `-camera_space.z`.
#[must_use]
pub fn project(camera_space: Vec3, size: u32) -> ProjectedPoint {
    let size = size as f32;
    ProjectedPoint {
        x: (camera_space.x / VIEW_EXTENT + 0.5) * size,
        y: (0.5 - camera_space.y / VIEW_EXTENT) * size,
        depth: -camera_space.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_view_is_identity_rotation() {
        let m = view_matrix(View::Front, None, true, 0.0);
        let p = m.transform_point3(Vec3::new(0.25, 0.1, -0.3));
        assert!((p - Vec3::new(0.25, 0.1, -0.3)).length() < 1e-5);
    }

    #[test]
    fn gui_transform_only_applies_to_gui_view() {
        let display = DisplayTransform {
            rotation: [0.0, 0.0, 0.0],
            translation: [16.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        };
        let front = view_matrix(View::Front, Some(display), true, 0.0);
        let gui = view_matrix(View::Gui, Some(display), true, 0.0);
        let p = Vec3::ZERO;
        assert!((front.transform_point3(p) - Vec3::ZERO).length() < 1e-5);
        assert!((gui.transform_point3(p) - Vec3::ZERO).length() > 1e-3);
    }

    #[test]
    fn disabling_gui_transform_flag_ignores_model_transform() {
        let display = DisplayTransform {
            rotation: [0.0, 0.0, 0.0],
            translation: [16.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        };
        let with_flag_off = view_matrix(View::Gui, Some(display), false, 0.0);
        let baseline = view_matrix(View::Gui, None, false, 0.0);
        let p = Vec3::new(0.2, 0.1, 0.0);
        assert!((with_flag_off.transform_point3(p) - baseline.transform_point3(p)).length() < 1e-5);
    }

    #[test]
    fn projection_centers_origin() {
        let p = project(Vec3::ZERO, 64);
        assert!((p.x - 32.0).abs() < 1e-3);
        assert!((p.y - 32.0).abs() < 1e-3);
    }

    #[test]
    fn projection_flips_y_axis() {
        let up = project(Vec3::new(0.0, 0.3, 0.0), 64);
        let down = project(Vec3::new(0.0, -0.3, 0.0), 64);
        assert!(up.y < down.y);
    }
}
