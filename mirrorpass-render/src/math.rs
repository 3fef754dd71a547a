//! Screen-space conversions shared by the lighting and SSR passes.
//!
//! UV (0,0) is the top-left texel corner; NDC y points up, so
//! `ndc.y = 1 - 2 * uv.y`. Depth is the 0..1 NDC depth of a right-handed
//! projection.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Recover the view-space position of a pixel from its UV and stored depth.
pub fn reconstruct_view_position(uv: Vec2, depth: f32, inv_projection: &Mat4) -> Vec3 {
    let ndc = Vec4::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let view = *inv_projection * ndc;
    view.truncate() / view.w
}

/// A view-space point after projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub uv: Vec2,
    pub depth: f32,
}

/// Project a view-space point to screen UV and NDC depth.
/// Returns `None` when the point is on or behind the camera plane.
pub fn project(view_position: Vec3, projection: &Mat4) -> Option<ScreenPoint> {
    let clip = *projection * view_position.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(ScreenPoint {
        uv: Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5),
        depth: ndc.z,
    })
}

/// UV of a pixel's centre.
pub fn pixel_center_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

/// Pixel containing `uv`, clamped to the last row/column. `uv` must lie in [0,1).
pub fn uv_to_pixel(uv: Vec2, width: u32, height: u32) -> (u32, u32) {
    let x = ((uv.x * width as f32).floor() as u32).min(width - 1);
    let y = ((uv.y * height as f32).floor() as u32).min(height - 1);
    (x, y)
}

/// GLSL/WGSL `reflect`.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}
