//! Per-pixel lighting and composite math, mirroring `deferred_lighting.wgsl`
//! and `composite.wgsl`.

use glam::{Vec3, Vec4};

use crate::light::PointLight;
use crate::math::reflect;

/// G-Buffer contents of one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// View-space position reconstructed from depth.
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    /// rgb = specular color, a = shininess / 256.
    pub specular: Vec4,
}

/// Phong diffuse + specular summed over `lights` (view space), clamped to [0,1].
pub fn shade_pixel(surface: &SurfaceSample, lights: &[PointLight]) -> Vec3 {
    let normal = surface.normal.normalize_or_zero();
    let view_dir = (-surface.position).normalize_or_zero();
    let shininess = (surface.specular.w * 256.0).max(1.0);
    let spec_rgb = surface.specular.truncate();

    let mut color = Vec3::ZERO;
    for light in lights {
        let to_light = light.position - surface.position;
        let dist = to_light.length();
        let light_dir = to_light / dist.max(1e-6);
        let attenuation = light.attenuation.factor(dist);

        let diffuse = normal.dot(light_dir).max(0.0) * surface.albedo * light.color;
        let reflected = reflect(-light_dir, normal);
        let highlight = view_dir.dot(reflected).max(0.0).powf(shininess);
        let specular = highlight * spec_rgb * light.color;

        color += (diffuse + specular) * attenuation;
    }

    color.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Lit color plus the reflection weighted by its coverage, the surface's
/// specular color and `strength`.
pub fn composite_pixel(lit: Vec3, reflection: Vec4, specular: Vec3, strength: f32) -> Vec3 {
    let color = lit + reflection.truncate() * reflection.w * specular * strength;
    color.clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Attenuation;

    fn surface() -> SurfaceSample {
        SurfaceSample {
            position: Vec3::new(0.0, 0.0, -10.0),
            normal: Vec3::Z,
            albedo: Vec3::new(0.5, 0.25, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 32.0 / 256.0),
        }
    }

    #[test]
    fn test_no_lights_is_black() {
        assert_eq!(shade_pixel(&surface(), &[]), Vec3::ZERO);
    }

    #[test]
    fn test_head_on_light_gives_attenuated_albedo() {
        let light = PointLight {
            position: Vec3::new(0.0, 0.0, -5.0),
            color: Vec3::ONE,
            attenuation: Attenuation::new(1.0, 0.1, 0.0),
        };
        let color = shade_pixel(&surface(), &[light]);
        let expected = surface().albedo / 1.5;
        assert!((color - expected).length() < 1e-5, "{color:?}");
    }

    #[test]
    fn test_light_behind_surface_contributes_nothing() {
        let light = PointLight {
            position: Vec3::new(0.0, 0.0, -20.0),
            color: Vec3::ONE,
            attenuation: Attenuation::new(1.0, 0.0, 0.0),
        };
        assert_eq!(shade_pixel(&surface(), &[light]), Vec3::ZERO);
    }

    #[test]
    fn test_specular_highlight_and_clamp() {
        let mut s = surface();
        s.albedo = Vec3::ZERO;
        s.specular = Vec4::new(1.0, 1.0, 1.0, 1.0);
        // Light at the eye: reflection points straight back at the viewer.
        let light = PointLight {
            position: Vec3::ZERO,
            color: Vec3::splat(4.0),
            attenuation: Attenuation::new(1.0, 0.0, 0.0),
        };
        assert_eq!(shade_pixel(&s, &[light]), Vec3::ONE);
    }

    #[test]
    fn test_composite_blend() {
        let lit = Vec3::splat(0.25);
        assert_eq!(composite_pixel(lit, Vec4::ZERO, Vec3::ONE, 1.0), lit);
        let out = composite_pixel(lit, Vec4::new(1.0, 0.5, 0.0, 1.0), Vec3::splat(0.5), 1.0);
        assert_eq!(out, Vec3::new(0.75, 0.5, 0.25));
        let saturated = composite_pixel(Vec3::ONE, Vec4::ONE, Vec3::ONE, 2.0);
        assert_eq!(saturated, Vec3::ONE);
    }
}
