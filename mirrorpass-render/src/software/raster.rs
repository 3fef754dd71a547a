//! Scanline-free triangle rasterizer: near-plane clipping, edge functions at
//! pixel centres, perspective-correct attributes, no face culling.

use glam::{Vec2, Vec3, Vec4};

/// Output of the geometry vertex stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub clip: Vec4,
    /// View-space normal (not normalized).
    pub normal: Vec3,
    pub uv: Vec2,
}

impl ClipVertex {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(other.clip, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    /// NDC depth in [0, 1].
    pub depth: f32,
    pub normal: Vec3,
    pub uv: Vec2,
}

struct ScreenVertex {
    pos: Vec2,
    depth: f32,
    inv_w: f32,
    normal: Vec3,
    uv: Vec2,
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Clip against the near plane (`clip.z >= 0` for a 0..1 depth range).
fn clip_near(tri: [ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let a_in = a.clip.z >= 0.0;
        let b_in = b.clip.z >= 0.0;
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = a.clip.z / (a.clip.z - b.clip.z);
            out.push(a.lerp(&b, t));
        }
    }
    out
}

fn to_screen(v: &ClipVertex, width: u32, height: u32) -> ScreenVertex {
    let inv_w = 1.0 / v.clip.w;
    let ndc = v.clip.truncate() * inv_w;
    ScreenVertex {
        pos: Vec2::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
        ),
        depth: ndc.z,
        inv_w,
        normal: v.normal,
        uv: v.uv,
    }
}

/// Call `emit` for every pixel centre covered by `tri`.
pub fn rasterize_triangle(
    tri: [ClipVertex; 3],
    width: u32,
    height: u32,
    mut emit: impl FnMut(Fragment),
) {
    let polygon = clip_near(tri);
    if polygon.len() < 3 {
        return;
    }
    let screen: Vec<_> = polygon.iter().map(|v| to_screen(v, width, height)).collect();

    for i in 1..screen.len() - 1 {
        rasterize_screen_triangle([&screen[0], &screen[i], &screen[i + 1]], width, height, &mut emit);
    }
}

fn rasterize_screen_triangle(
    [v0, v1, v2]: [&ScreenVertex; 3],
    width: u32,
    height: u32,
    emit: &mut impl FnMut(Fragment),
) {
    let area = edge(v0.pos, v1.pos, v2.pos);
    if area.abs() < f32::EPSILON || !area.is_finite() {
        return;
    }

    let lo = v0.pos.min(v1.pos).min(v2.pos).max(Vec2::ZERO);
    let hi = v0.pos.max(v1.pos).max(v2.pos).min(Vec2::new(width as f32, height as f32));
    if lo.x >= hi.x || lo.y >= hi.y {
        return;
    }

    for y in lo.y.floor() as u32..(hi.y.ceil() as u32).min(height) {
        for x in lo.x.floor() as u32..(hi.x.ceil() as u32).min(width) {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            // Dividing by the signed area makes both windings positive inside.
            let b0 = edge(v1.pos, v2.pos, p) / area;
            let b1 = edge(v2.pos, v0.pos, p) / area;
            let b2 = edge(v0.pos, v1.pos, p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }

            let depth = b0 * v0.depth + b1 * v1.depth + b2 * v2.depth;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            let (p0, p1, p2) = (b0 * v0.inv_w, b1 * v1.inv_w, b2 * v2.inv_w);
            let norm = 1.0 / (p0 + p1 + p2);
            emit(Fragment {
                x,
                y,
                depth,
                normal: (v0.normal * p0 + v1.normal * p1 + v2.normal * p2) * norm,
                uv: (v0.uv * p0 + v1.uv * p1 + v2.uv * p2) * norm,
            });
        }
    }
}
