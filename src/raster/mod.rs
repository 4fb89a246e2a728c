//! Rasterizer (spec §4.8).
//!
//! Projects mesh triangles into screen space, sorts them for a painter's
//! algorithm, and scan-converts each one with barycentric pixel-center
//! sampling. No direct teacher analog — the teacher rasterizes on the GPU
//! and has no software fallback path — so this module is built from the
//! spec §4.8 formulas directly, following the teacher's module style
//! (plain functions over a `Vec<Triangle>`, no trait indirection) rather
//! than any teacher source it could cite.

use glam::Mat4;
#[cfg(test)]
use glam::Vec3;
use image::{Rgba, RgbaImage};

use crate::mesh::Triangle;
use crate::model::FaceDirection;
use crate::options::BackgroundColor;
use crate::transform::{self, ProjectedPoint};

/// Fixed per-face brightness multiplier (spec §4.8), applied only when the
/// owning element has `shade: true`.
fn face_brightness(direction: FaceDirection) -> f32 {
    match direction {
        FaceDirection::Up => 1.0,
        FaceDirection::Down => 0.5,
        FaceDirection::North | FaceDirection::South => 0.8,
        FaceDirection::East | FaceDirection::West => 0.6,
    }
}

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    p: ProjectedPoint,
    uv: [f32; 2],
}

struct ScreenTriangle<'a> {
    verts: [ScreenVertex; 3],
    source: &'a Triangle,
}

/// Rasterizes `triangles` (model space) under `view` into a `size`×`size`
/// RGBA image. `sample` resolves the final color for a triangle at a given
/// normalized `(u, v)`, already including texture lookup, tint, and frame
/// selection — the rasterizer only applies per-face directional shading and
/// alpha compositing on top of whatever `sample` returns.
pub fn rasterize<F>(triangles: &[Triangle], view: Mat4, size: u32, background: BackgroundColor, mut sample: F) -> RgbaImage
where
    F: FnMut(&Triangle, f32, f32) -> [u8; 4],
{
    let mut image = RgbaImage::from_pixel(size, size, background_pixel(background));

    let mut screen: Vec<ScreenTriangle<'_>> = triangles
        .iter()
        .map(|tri| {
            let verts = std::array::from_fn(|i| {
                let world = view.transform_point3(tri.vertices[i].pos);
                ScreenVertex {
                    p: transform::project(world, size),
                    uv: tri.vertices[i].uv,
                }
            });
            ScreenTriangle { verts, source: tri }
        })
        .collect();

    // Painter's algorithm: farthest (largest depth) first, nearest last, so
    // nearer geometry composites over farther geometry drawn earlier.
    screen.sort_by(|a, b| {
        let depth_a = mean_depth(&a.verts);
        let depth_b = mean_depth(&b.verts);
        depth_b
            .partial_cmp(&depth_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.source.rendering_priority.cmp(&b.source.rendering_priority))
            .then(a.source.element_index.cmp(&b.source.element_index))
    });

    for tri in &screen {
        draw_triangle(&mut image, tri, &mut sample);
    }

    image
}

fn mean_depth(verts: &[ScreenVertex; 3]) -> f32 {
    (verts[0].p.depth + verts[1].p.depth + verts[2].p.depth) / 3.0
}

fn background_pixel(background: BackgroundColor) -> Rgba<u8> {
    match background {
        BackgroundColor::Transparent => Rgba([0, 0, 0, 0]),
        BackgroundColor::Opaque(rgba) => Rgba(rgba),
    }
}

/// Barycentric coordinates of `p` against triangle `(a, b, c)`, or `None`
/// if the triangle is degenerate.
fn barycentric(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> Option<(f32, f32, f32)> {
    let denom = (b.1 - c.1) * (a.0 - c.0) + (c.0 - b.0) * (a.1 - c.1);
    if denom.abs() < 1e-6 {
        return None;
    }
    let w_a = ((b.1 - c.1) * (p.0 - c.0) + (c.0 - b.0) * (p.1 - c.1)) / denom;
    let w_b = ((c.1 - a.1) * (p.0 - c.0) + (a.0 - c.0) * (p.1 - c.1)) / denom;
    let w_c = 1.0 - w_a - w_b;
    Some((w_a, w_b, w_c))
}

fn draw_triangle<F>(image: &mut RgbaImage, tri: &ScreenTriangle<'_>, sample: &mut F)
where
    F: FnMut(&Triangle, f32, f32) -> [u8; 4],
{
    let [v0, v1, v2] = tri.verts;
    let a = (v0.p.x, v0.p.y);
    let b = (v1.p.x, v1.p.y);
    let c = (v2.p.x, v2.p.y);

    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as u32;
    let max_x = a.0.max(b.0).max(c.0).ceil().min(image.width() as f32) as u32;
    let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as u32;
    let max_y = a.1.max(b.1).max(c.1).ceil().min(image.height() as f32) as u32;

    let brightness = if tri.source.shade { face_brightness(tri.source.direction) } else { 1.0 };

    for y in min_y..max_y {
        for x in min_x..max_x {
            let center = (x as f32 + 0.5, y as f32 + 0.5);
            let Some((wa, wb, wc)) = barycentric(center, a, b, c) else {
                continue;
            };
            let tol = -1e-6;
            if wa < tol || wb < tol || wc < tol {
                continue;
            }

            let u = wa * v0.uv[0] + wb * v1.uv[0] + wc * v2.uv[0];
            let v = wa * v0.uv[1] + wb * v1.uv[1] + wc * v2.uv[1];
            let [r, g, bl, al] = sample(tri.source, u, v);
            if al == 0 {
                continue;
            }
            let shaded = [
                (r as f32 * brightness).round().clamp(0.0, 255.0) as u8,
                (g as f32 * brightness).round().clamp(0.0, 255.0) as u8,
                (bl as f32 * brightness).round().clamp(0.0, 255.0) as u8,
                al,
            ];
            composite_over(image, x, y, shaded);
        }
    }
}

/// Standard "over" alpha compositing of `src` onto the existing pixel.
fn composite_over(image: &mut RgbaImage, x: u32, y: u32, src: [u8; 4]) {
    let dst = *image.get_pixel(x, y);
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        return;
    }
    let blend = |s: u8, d: u8| -> u8 {
        let s = s as f32 / 255.0;
        let d = d as f32 / 255.0;
        (((s * sa + d * da * (1.0 - sa)) / out_a) * 255.0).round().clamp(0.0, 255.0) as u8
    };
    image.put_pixel(
        x,
        y,
        Rgba([blend(src[0], dst[0]), blend(src[1], dst[1]), blend(src[2], dst[2]), (out_a * 255.0).round() as u8]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Vertex;

    fn flat_triangle(z: f32) -> Triangle {
        Triangle {
            vertices: [
                Vertex { pos: Vec3::new(-0.4, -0.4, z), uv: [0.0, 0.0] },
                Vertex { pos: Vec3::new(0.4, -0.4, z), uv: [1.0, 0.0] },
                Vertex { pos: Vec3::new(0.0, 0.4, z), uv: [0.5, 1.0] },
            ],
            texture: "minecraft:block/stone".to_string(),
            tint_index: None,
            direction: FaceDirection::South,
            element_index: 0,
            rendering_priority: 0,
            shade: false,
        }
    }

    #[test]
    fn opaque_triangle_paints_pixels() {
        let tri = flat_triangle(0.0);
        let image = rasterize(&[tri], Mat4::IDENTITY, 32, BackgroundColor::Transparent, |_, _, _| [255, 0, 0, 255]);
        let center = *image.get_pixel(16, 18);
        assert_eq!(center, Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn transparent_background_stays_outside_triangle() {
        let tri = flat_triangle(0.0);
        let image = rasterize(&[tri], Mat4::IDENTITY, 32, BackgroundColor::Transparent, |_, _, _| [255, 0, 0, 255]);
        assert_eq!(*image.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn nearer_triangle_draws_over_farther_one() {
        let far = flat_triangle(-1.0);
        let mut near = flat_triangle(1.0);
        near.element_index = 1;
        let image = rasterize(&[far, near], Mat4::IDENTITY, 32, BackgroundColor::Transparent, |tri, _, _| {
            if tri.element_index == 0 { [255, 0, 0, 255] } else { [0, 255, 0, 255] }
        });
        assert_eq!(*image.get_pixel(16, 18), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn shading_darkens_down_face() {
        let mut tri = flat_triangle(0.0);
        tri.direction = FaceDirection::Down;
        tri.shade = true;
        let image = rasterize(&[tri], Mat4::IDENTITY, 32, BackgroundColor::Transparent, |_, _, _| [200, 200, 200, 255]);
        let px = image.get_pixel(16, 18);
        assert_eq!(px[0], 100);
    }
}
