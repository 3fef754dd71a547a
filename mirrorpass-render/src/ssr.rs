//! Screen-space reflection ray march, mirroring `ssr.wgsl`.
//!
//! The reflected view ray advances in fixed view-space steps. Each step is
//! projected to the screen; the first sample whose NDC depth lies behind the
//! stored scene depth is the hit. Misses are normal outcomes, not errors.

use glam::{Mat4, Vec2, Vec3};
use mirrorpass_gpu_shared::scene_format::SsrSettings;
use mirrorpass_gpu_shared::uniforms::SsrParams;

use crate::math::{reflect, uv_to_pixel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Travelled further than `max_distance` from the origin.
    MaxDistance,
    /// Step landed on or behind the camera plane.
    BehindCamera,
    /// Step lies beyond the far plane.
    BeyondFar,
    /// Step projects outside the screen.
    OffScreen,
    /// `max_steps` taken without a hit.
    StepsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayMarch {
    /// Pixel whose lit color is reflected; `step` is 1-based.
    Hit { x: u32, y: u32, step: u32 },
    Miss(MissReason),
}

/// March the reflection of the view ray through `origin` about `normal`
/// (both view space). `depth_at` is only called with in-bounds pixels.
pub fn trace_reflection(
    origin: Vec3,
    normal: Vec3,
    projection: &Mat4,
    settings: &SsrSettings,
    width: u32,
    height: u32,
    depth_at: impl Fn(u32, u32) -> f32,
) -> RayMarch {
    let ray = reflect(origin.normalize_or_zero(), normal.normalize_or_zero());

    for step in 1..=settings.max_steps {
        let p = origin + ray * (settings.step_size * step as f32);
        if (p - origin).length() > settings.max_distance {
            return RayMarch::Miss(MissReason::MaxDistance);
        }

        let clip = *projection * p.extend(1.0);
        if clip.w <= 0.0 {
            return RayMarch::Miss(MissReason::BehindCamera);
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.z >= 1.0 {
            return RayMarch::Miss(MissReason::BeyondFar);
        }

        let uv = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
        if !(0.0..1.0).contains(&uv.x) || !(0.0..1.0).contains(&uv.y) {
            return RayMarch::Miss(MissReason::OffScreen);
        }

        let (x, y) = uv_to_pixel(uv, width, height);
        if ndc.z > depth_at(x, y) {
            return RayMarch::Hit { x, y, step };
        }
    }

    RayMarch::Miss(MissReason::StepsExhausted)
}

/// Pack settings for `ssr.wgsl`.
pub fn ssr_params(settings: &SsrSettings, projection: &Mat4, width: u32, height: u32) -> SsrParams {
    SsrParams {
        projection: projection.to_cols_array_2d(),
        inv_projection: projection.inverse().to_cols_array_2d(),
        screen_size: [width as f32, height as f32],
        max_steps: settings.max_steps.min(i32::MAX as u32) as i32,
        max_distance: settings.max_distance,
        step_size: settings.step_size,
        _pad1: 0.0,
        _pad2: 0.0,
        _pad3: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const W: u32 = 64;
    const H: u32 = 48;

    fn projection() -> Mat4 {
        Mat4::perspective_rh(45f32.to_radians(), W as f32 / H as f32, 0.1, 300.0)
    }

    fn settings() -> SsrSettings {
        SsrSettings {
            max_steps: 400,
            step_size: 0.25,
            max_distance: 75.0,
        }
    }

    #[test]
    fn test_ray_leaving_screen_stops_without_out_of_bounds_reads() {
        let calls = Cell::new(0);
        // 45 degree mirror in front of the camera sends the ray sideways off screen.
        let result = trace_reflection(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(1.0, 0.0, 1.0),
            &projection(),
            &settings(),
            W,
            H,
            |x, y| {
                assert!(x < W && y < H);
                calls.set(calls.get() + 1);
                1.0
            },
        );
        assert_eq!(result, RayMarch::Miss(MissReason::OffScreen));
        assert!(calls.get() > 0);
    }

    #[test]
    fn test_ray_towards_camera_misses_behind_it() {
        let result = trace_reflection(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::Z,
            &projection(),
            &settings(),
            W,
            H,
            |_, _| 1.0,
        );
        assert_eq!(result, RayMarch::Miss(MissReason::BehindCamera));
    }

    #[test]
    fn test_max_distance_and_step_budget() {
        let mut short = settings();
        short.max_distance = 1.0;
        let result = trace_reflection(
            Vec3::new(0.0, -5.0, -20.0),
            Vec3::Y,
            &projection(),
            &short,
            W,
            H,
            |_, _| 1.0,
        );
        assert_eq!(result, RayMarch::Miss(MissReason::MaxDistance));

        let mut few = settings();
        few.max_steps = 2;
        let result = trace_reflection(
            Vec3::new(0.0, -5.0, -20.0),
            Vec3::Y,
            &projection(),
            &few,
            W,
            H,
            |_, _| 1.0,
        );
        assert_eq!(result, RayMarch::Miss(MissReason::StepsExhausted));
    }

    #[test]
    fn test_hits_first_sample_behind_stored_depth() {
        let proj = projection();
        // Everything on screen sits at the depth of z = -22.
        let wall = proj.project_point3(Vec3::new(0.0, 0.0, -22.0)).z;
        // Surface facing +Y at z = -20 reflects a view ray that heads away
        // from the camera, so it crosses the wall depth after ~2 units.
        let result = trace_reflection(
            Vec3::new(0.0, -5.0, -20.0),
            Vec3::new(0.0, 1.0, 0.0),
            &proj,
            &settings(),
            W,
            H,
            |_, _| wall,
        );
        match result {
            RayMarch::Hit { x, y, step } => {
                assert!(x < W && y < H);
                assert!(step > 1);
            }
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn test_march_is_deterministic() {
        let proj = projection();
        let depth = |x: u32, y: u32| 0.99 + 0.0001 * ((x * 7 + y * 13) % 50) as f32;
        let trace = || {
            trace_reflection(
                Vec3::new(1.0, -4.0, -18.0),
                Vec3::new(0.1, 1.0, 0.05),
                &proj,
                &settings(),
                W,
                H,
                depth,
            )
        };
        assert_eq!(trace(), trace());
    }

    #[test]
    fn test_ssr_params_layout() {
        let params = ssr_params(&settings(), &projection(), W, H);
        assert_eq!(params.max_steps, 400);
        assert_eq!(params.screen_size, [64.0, 48.0]);
        assert_eq!(params.step_size, 0.25);
    }
}
