use glam::{Vec3, Vec4};
use mirrorpass_gpu_shared::scene_format::{CompositeSettings, SsrSettings};

use super::raster::{rasterize_triangle, ClipVertex};
use super::{GeometryBuffer, Surface};
use crate::frame::FrameContext;
use crate::math::{pixel_center_uv, reconstruct_view_position};
use crate::scene::{Scene, SceneObject};
use crate::shading::{composite_pixel, shade_pixel, SurfaceSample};
use crate::ssr::{trace_reflection, RayMarch};

/// Clear, then draw objects in scene order with depth LESS and the
/// object's stencil rule. Reflective objects mark stencil 1 on depth pass.
pub fn geometry_pass(gbuffer: &mut GeometryBuffer, scene: &Scene, frame: &FrameContext) {
    gbuffer.normal.fill(Vec4::ZERO);
    gbuffer.albedo.fill(Vec4::ZERO);
    gbuffer.specular.fill(Vec4::ZERO);
    gbuffer.depth.fill(1.0);
    gbuffer.stencil.fill(0);

    for object in scene.objects() {
        draw_object(gbuffer, scene, object, frame);
    }
}

fn draw_object(gbuffer: &mut GeometryBuffer, scene: &Scene, object: &SceneObject, frame: &FrameContext) {
    let model_view = object.model_view(&frame.view);
    let mvp = frame.projection * model_view;
    let normal_matrix = object.normal_matrix(&frame.view);
    let stencil = object.stencil_rule();
    let material = &object.material;
    let texture = material.albedo_map.map(|id| scene.texture(id));
    let specular = material.specular_texel();
    let (width, height) = (gbuffer.depth.width(), gbuffer.depth.height());

    for tri in scene.mesh(object.mesh).triangles() {
        let clip = tri.map(|v| ClipVertex {
            clip: mvp * Vec3::from(v.position).extend(1.0),
            normal: normal_matrix * Vec3::from(v.normal),
            uv: v.uv.into(),
        });

        rasterize_triangle(clip, width, height, |frag| {
            let (x, y) = (frag.x, frag.y);
            let stored = gbuffer.stencil.get(x, y);
            if !stencil.passes(stored) || frag.depth >= gbuffer.depth.get(x, y) {
                return;
            }

            let mut albedo = material.albedo;
            if let Some(texture) = texture {
                albedo *= texture.sample_nearest(frag.uv).truncate();
            }

            gbuffer.stencil.set(x, y, stencil.on_depth_pass(stored));
            gbuffer.depth.set(x, y, frag.depth);
            gbuffer.normal.set(x, y, frag.normal.normalize_or_zero().extend(1.0));
            gbuffer.albedo.set(x, y, albedo.extend(1.0));
            gbuffer.specular.set(x, y, specular);
        });
    }
}

/// Phong shading of every covered pixel; background is black.
pub fn lighting_pass(lit: &mut Surface<Vec4>, gbuffer: &GeometryBuffer, frame: &FrameContext) {
    let (width, height) = (lit.width(), lit.height());
    for y in 0..height {
        for x in 0..width {
            let depth = gbuffer.depth.get(x, y);
            if depth >= 1.0 {
                lit.set(x, y, Vec4::new(0.0, 0.0, 0.0, 1.0));
                continue;
            }
            let surface = SurfaceSample {
                position: reconstruct_view_position(
                    pixel_center_uv(x, y, width, height),
                    depth,
                    &frame.inv_projection,
                ),
                normal: gbuffer.normal.get(x, y).truncate(),
                albedo: gbuffer.albedo.get(x, y).truncate(),
                specular: gbuffer.specular.get(x, y),
            };
            lit.set(x, y, shade_pixel(&surface, &frame.lights).extend(1.0));
        }
    }
}

/// Reflection color for stencil == 1 pixels; everything else stays cleared.
pub fn ssr_pass(
    reflection: &mut Surface<Vec4>,
    gbuffer: &GeometryBuffer,
    lit: &Surface<Vec4>,
    frame: &FrameContext,
    settings: &SsrSettings,
) {
    reflection.fill(Vec4::ZERO);
    let (width, height) = (reflection.width(), reflection.height());

    for (x, y, stencil) in gbuffer.stencil.enumerate() {
        let depth = gbuffer.depth.get(x, y);
        if stencil != 1 || depth >= 1.0 {
            continue;
        }

        let origin = reconstruct_view_position(
            pixel_center_uv(x, y, width, height),
            depth,
            &frame.inv_projection,
        );
        let normal = gbuffer.normal.get(x, y).truncate();
        let march = trace_reflection(
            origin,
            normal,
            &frame.projection,
            settings,
            width,
            height,
            |sx, sy| gbuffer.depth.get(sx, sy),
        );

        if let RayMarch::Hit { x: hx, y: hy, .. } = march {
            reflection.set(x, y, lit.get(hx, hy).truncate().extend(1.0));
        }
    }
}

pub fn composite_pass(
    output: &mut Surface<Vec4>,
    lit: &Surface<Vec4>,
    reflection: &Surface<Vec4>,
    specular: &Surface<Vec4>,
    settings: &CompositeSettings,
) {
    for (x, y, lit_color) in lit.enumerate() {
        let color = composite_pixel(
            lit_color.truncate(),
            reflection.get(x, y),
            specular.get(x, y).truncate(),
            settings.reflection_strength,
        );
        output.set(x, y, color.extend(1.0));
    }
}
