//! Mesh Builder (spec §4.6).
//!
//! Converts a [`ModelInstance`] into a flat list of textured triangles in
//! model space: applies per-element rotations, computes auto-UV or declared
//! UV per face (with 90° face-UV rotation), and corrects triangle winding
//! so sampled textures are never accidentally mirrored.

use glam::{Mat3, Vec3};

use crate::model::{Axis, ElementRotation, FaceDirection, ModelElement, ModelInstance};
use crate::options::View;

/// A single mesh vertex: model-space position plus texture UV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Vec3,
    pub uv: [f32; 2],
}

/// One emitted triangle (half of a quad face).
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    pub texture: String,
    pub tint_index: Option<i32>,
    pub direction: FaceDirection,
    pub element_index: usize,
    /// `1` when the face has a tint index, `0` otherwise — used as the
    /// rasterizer's secondary sort key (spec §4.6 point 4 / §4.8).
    pub rendering_priority: u8,
    pub shade: bool,
}

/// Toggles controlling mesh construction beyond the spec's default
/// behavior (DESIGN.md open-question decisions).
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshBuildOptions {
    /// Disabled by default; enabling it visibly distorts 2D textures, per
    /// the upstream TODO this preserves.
    pub enable_rescale: bool,
}

/// Builds the full triangle list for `model` under `view` (used only to
/// decide whether any `cullface` exactly matches the fixed camera
/// direction of that view — spec's Open Questions: no culling by default).
#[must_use]
pub fn build(model: &ModelInstance, view: View, options: MeshBuildOptions) -> Vec<Triangle> {
    let cull_direction = view_facing_direction(view);
    let mut triangles = Vec::new();
    for (element_index, element) in model.elements.iter().enumerate() {
        build_element(element, element_index, cull_direction, options, &mut triangles);
    }
    triangles
}

/// The single cardinal direction a named view looks along, if any. Only
/// `View::Front` has one; isometric/GUI views look diagonally, so a
/// `cullface` can never match them exactly (spec Open Questions).
fn view_facing_direction(view: View) -> Option<FaceDirection> {
    match view {
        View::Front => Some(FaceDirection::South),
        View::Isometric | View::IsometricAlt | View::Gui => None,
    }
}

fn build_element(
    element: &ModelElement,
    element_index: usize,
    cull_direction: Option<FaceDirection>,
    options: MeshBuildOptions,
    out: &mut Vec<Triangle>,
) {
    for face in &element.faces {
        if let Some(cf) = face.cullface {
            if Some(cf) == cull_direction {
                continue;
            }
        }

        let default_uv = default_uv_rect(face.direction, element.from, element.to);
        let uv_rect = face.uv.unwrap_or(default_uv);
        let rotated_uv = rotate_uv_rect(uv_rect, face.rotation);

        let raw_corners = face_corners(face.direction, element.from, element.to);
        let corners: Vec<Vec3> = raw_corners
            .iter()
            .map(|&(p, _)| rotate_and_normalize(p, element.rotation, options))
            .collect();
        // Normalized to [0, 1] here so the Rasterizer never needs to know a
        // texture's resolution to sample it.
        let uvs: Vec<[f32; 2]> = raw_corners
            .iter()
            .map(|&(_, label)| {
                let [u, v] = label.pick(rotated_uv);
                [u / 16.0, v / 16.0]
            })
            .collect();

        let verts = [
            Vertex { pos: corners[0], uv: uvs[0] },
            Vertex { pos: corners[1], uv: uvs[1] },
            Vertex { pos: corners[2], uv: uvs[2] },
            Vertex { pos: corners[3], uv: uvs[3] },
        ];

        let (tri_a, tri_b) = winding_corrected_triangles(verts, face.direction, element.rotation);

        let priority = u8::from(face.tint_index.is_some());
        for tri_verts in [tri_a, tri_b] {
            out.push(Triangle {
                vertices: tri_verts,
                texture: face.texture.clone(),
                tint_index: face.tint_index,
                direction: face.direction,
                element_index,
                rendering_priority: priority,
                shade: element.shade,
            });
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum UvLabel {
    U0V0,
    U1V0,
    U1V1,
    U0V1,
}

impl UvLabel {
    fn pick(self, rect: [f32; 4]) -> [f32; 2] {
        let [u0, v0, u1, v1] = rect;
        match self {
            UvLabel::U0V0 => [u0, v0],
            UvLabel::U1V0 => [u1, v0],
            UvLabel::U1V1 => [u1, v1],
            UvLabel::U0V1 => [u0, v1],
        }
    }
}

/// Auto-UV formula table (spec §6), generalized so the caller can also use
/// it to figure out which declared-uv slot each rectangle corner maps to.
fn default_uv_rect(direction: FaceDirection, from: [f32; 3], to: [f32; 3]) -> [f32; 4] {
    let [fx, fy, fz] = from;
    let [tx, ty, tz] = to;
    match direction {
        FaceDirection::South => [fx, fy, tx, ty],
        FaceDirection::North => [16.0 - tx, fy, 16.0 - fx, ty],
        FaceDirection::East => [fz, fy, tz, ty],
        FaceDirection::West => [16.0 - tz, fy, 16.0 - fz, ty],
        FaceDirection::Up => [fx, 16.0 - tz, tx, 16.0 - fz],
        FaceDirection::Down => [fx, fz, tx, tz],
    }
}

/// Returns the 4 raw (pre-rotation, pre-normalization) corner positions of
/// `direction`'s face, each tagged with which UV-rect slot it occupies.
/// Order is a consistent CCW-ish traversal; actual winding is fixed up
/// afterward by [`winding_corrected_triangles`].
fn face_corners(direction: FaceDirection, from: [f32; 3], to: [f32; 3]) -> [([f32; 3], UvLabel); 4] {
    let [fx, fy, fz] = from;
    let [tx, ty, tz] = to;
    match direction {
        FaceDirection::Up => [
            ([fx, ty, tz], UvLabel::U0V0),
            ([tx, ty, tz], UvLabel::U1V0),
            ([tx, ty, fz], UvLabel::U1V1),
            ([fx, ty, fz], UvLabel::U0V1),
        ],
        FaceDirection::Down => [
            ([fx, fy, fz], UvLabel::U0V0),
            ([tx, fy, fz], UvLabel::U1V0),
            ([tx, fy, tz], UvLabel::U1V1),
            ([fx, fy, tz], UvLabel::U0V1),
        ],
        FaceDirection::North => [
            ([tx, fy, fz], UvLabel::U0V0),
            ([fx, fy, fz], UvLabel::U1V0),
            ([fx, ty, fz], UvLabel::U1V1),
            ([tx, ty, fz], UvLabel::U0V1),
        ],
        FaceDirection::South => [
            ([fx, fy, tz], UvLabel::U0V0),
            ([tx, fy, tz], UvLabel::U1V0),
            ([tx, ty, tz], UvLabel::U1V1),
            ([fx, ty, tz], UvLabel::U0V1),
        ],
        FaceDirection::East => [
            ([tx, fy, fz], UvLabel::U0V0),
            ([tx, fy, tz], UvLabel::U1V0),
            ([tx, ty, tz], UvLabel::U1V1),
            ([tx, ty, fz], UvLabel::U0V1),
        ],
        FaceDirection::West => [
            ([fx, fy, tz], UvLabel::U0V0),
            ([fx, fy, fz], UvLabel::U1V0),
            ([fx, ty, fz], UvLabel::U1V1),
            ([fx, ty, tz], UvLabel::U0V1),
        ],
    }
}

/// Applies a 90°-increment face-UV rotation about the UV rectangle center
/// by cyclically shifting which rect corner sits at each traversal
/// position (spec §4.6 point 3).
fn rotate_uv_rect(rect: [f32; 4], rotation: u32) -> [f32; 4] {
    let corners = [
        [rect[0], rect[1]],
        [rect[2], rect[1]],
        [rect[2], rect[3]],
        [rect[0], rect[3]],
    ];
    let shift = ((rotation / 90) % 4) as usize;
    let rotated: Vec<[f32; 2]> = (0..4).map(|i| corners[(i + shift) % 4]).collect();
    [rotated[0][0], rotated[0][1], rotated[2][0], rotated[2][1]]
}

fn rotate_and_normalize(raw: [f32; 3], rotation: Option<ElementRotation>, options: MeshBuildOptions) -> Vec3 {
    let mut p = Vec3::from(raw);
    if let Some(r) = rotation {
        let origin = Vec3::from(r.origin);
        let axis = match r.axis {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        };
        let angle_rad = r.angle.to_radians();
        let rot = Mat3::from_axis_angle(axis, angle_rad);
        p = rot * (p - origin) + origin;

        if options.enable_rescale && r.rescale {
            let scale = 1.0 / angle_rad.cos();
            let scale_vec = Vec3::ONE + (Vec3::splat(scale) - Vec3::ONE) * (Vec3::ONE - axis);
            p = scale_vec * (p - origin) + origin;
        }
    }
    p / 16.0 - Vec3::splat(0.5)
}

fn face_outward_normal(direction: FaceDirection) -> Vec3 {
    match direction {
        FaceDirection::Up => Vec3::Y,
        FaceDirection::Down => -Vec3::Y,
        FaceDirection::North => -Vec3::Z,
        FaceDirection::South => Vec3::Z,
        FaceDirection::East => Vec3::X,
        FaceDirection::West => -Vec3::X,
    }
}

/// Splits the 4-corner quad into two triangles `(0,1,2)` and `(0,2,3)`,
/// swapping index 1 and 3 on both (and their UVs, since they travel with
/// the vertex) if the resulting normal points inward after any element
/// rotation (spec §4.6 winding correction).
fn winding_corrected_triangles(
    verts: [Vertex; 4],
    direction: FaceDirection,
    rotation: Option<ElementRotation>,
) -> ([Vertex; 3], [Vertex; 3]) {
    let normal = (verts[1].pos - verts[0].pos).cross(verts[2].pos - verts[0].pos);

    let expected = if let Some(r) = rotation {
        let axis = match r.axis {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        };
        Mat3::from_axis_angle(axis, r.angle.to_radians()) * face_outward_normal(direction)
    } else {
        face_outward_normal(direction)
    };

    let mut v = verts;
    if normal.dot(expected) < 0.0 {
        v.swap(1, 3);
    }
    ([v[0], v[1], v[2]], [v[0], v[2], v[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelElement, ModelFace};

    fn unit_cube_element() -> ModelElement {
        let mut faces = Vec::new();
        for dir in FaceDirection::ALL {
            faces.push(ModelFace {
                direction: dir,
                texture: "minecraft:block/stone".to_string(),
                uv: None,
                tint_index: None,
                rotation: 0,
                cullface: None,
            });
        }
        ModelElement {
            from: [0.0, 0.0, 0.0],
            to: [16.0, 16.0, 16.0],
            rotation: None,
            faces,
            shade: true,
        }
    }

    #[test]
    fn builds_two_triangles_per_face() {
        let model = crate::model::ModelInstance {
            elements: vec![unit_cube_element()],
            gui_transform: None,
            ambient_occlusion: true,
            is_builtin_entity: false,
        };
        let triangles = build(&model, View::Gui, MeshBuildOptions::default());
        assert_eq!(triangles.len(), 12);
    }

    #[test]
    fn auto_uv_within_full_rect_for_cube() {
        let rect = default_uv_rect(FaceDirection::South, [0.0, 0.0, 0.0], [16.0, 16.0, 16.0]);
        assert_eq!(rect, [0.0, 0.0, 16.0, 16.0]);
    }

    #[test]
    fn face_normals_point_outward_for_unrotated_cube() {
        let model = crate::model::ModelInstance {
            elements: vec![unit_cube_element()],
            gui_transform: None,
            ambient_occlusion: true,
            is_builtin_entity: false,
        };
        let triangles = build(&model, View::Gui, MeshBuildOptions::default());
        for tri in &triangles {
            let normal = (tri.vertices[1].pos - tri.vertices[0].pos)
                .cross(tri.vertices[2].pos - tri.vertices[0].pos)
                .normalize();
            let expected = face_outward_normal(tri.direction);
            assert!(normal.dot(expected) > 0.9, "{:?} face normal mismatch", tri.direction);
        }
    }

    #[test]
    fn cullface_matching_front_view_is_dropped() {
        let mut element = unit_cube_element();
        for face in &mut element.faces {
            if face.direction == FaceDirection::South {
                face.cullface = Some(FaceDirection::South);
            }
        }
        let model = crate::model::ModelInstance {
            elements: vec![element],
            gui_transform: None,
            ambient_occlusion: true,
            is_builtin_entity: false,
        };
        let triangles = build(&model, View::Front, MeshBuildOptions::default());
        assert!(triangles.iter().all(|t| t.direction != FaceDirection::South));
    }
}
