use bytemuck::{Pod, Zeroable};

/// Upper bound on point lights uploaded to the lighting pass.
pub const MAX_POINT_LIGHTS: usize = 16;

/// Per-frame uniform data, matching `FrameUniforms` in every WGSL stage (group 0, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PerFrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inv_projection: [[f32; 4]; 4],
    pub screen_size: [f32; 2],
    pub _pad1: f32,
    pub _pad2: f32,
}

/// Per-object data: model-view matrix plus view-space normal matrix columns.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PerObjectUniforms {
    pub model_view: [[f32; 4]; 4],
    pub normal_matrix_col0: [f32; 4],
    pub normal_matrix_col1: [f32; 4],
    pub normal_matrix_col2: [f32; 4],
    pub _pad: [f32; 4],
}

/// Material uniform data, matching GPU bind group 1, binding 0 of the geometry pass.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub albedo: [f32; 4],
    /// RGB = specular color, A = shininess / 256.
    pub specular: [f32; 4],
    pub has_albedo_map: i32,
    pub _pad1: i32,
    pub _pad2: i32,
    pub _pad3: i32,
}

/// Point light in view space.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PointLightData {
    pub position: [f32; 4],
    pub color: [f32; 4],
    /// x = constant, y = linear, z = quadratic.
    pub attenuation: [f32; 4],
}

/// Light uniform buffer, matching group 1, binding 0 in the lighting pass.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightUniforms {
    pub point_lights: [PointLightData; MAX_POINT_LIGHTS],
    pub num_point_lights: i32,
    pub _pad1: i32,
    pub _pad2: i32,
    pub _pad3: i32,
}

/// SSR parameters.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SsrParams {
    pub projection: [[f32; 4]; 4],
    pub inv_projection: [[f32; 4]; 4],
    pub screen_size: [f32; 2],
    pub max_steps: i32,
    pub max_distance: f32,
    pub step_size: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

/// Composite parameters.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CompositeParams {
    pub reflection_strength: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(size_of::<PerFrameUniforms>() % 16, 0);
        assert_eq!(size_of::<PerObjectUniforms>() % 16, 0);
        assert_eq!(size_of::<MaterialUniforms>() % 16, 0);
        assert_eq!(size_of::<LightUniforms>() % 16, 0);
        assert_eq!(size_of::<SsrParams>() % 16, 0);
        assert_eq!(size_of::<CompositeParams>() % 16, 0);
    }

    #[test]
    fn test_uniform_sizes_match_wgsl_layout() {
        // 3 mat4 + vec2 + 2 pad
        assert_eq!(size_of::<PerFrameUniforms>(), 3 * 64 + 16);
        assert_eq!(size_of::<PerObjectUniforms>(), 64 + 4 * 16);
        assert_eq!(size_of::<MaterialUniforms>(), 48);
        assert_eq!(size_of::<PointLightData>(), 48);
        assert_eq!(size_of::<LightUniforms>(), MAX_POINT_LIGHTS * 48 + 16);
        assert_eq!(size_of::<SsrParams>(), 2 * 64 + 32);
        assert_eq!(size_of::<CompositeParams>(), 16);
    }

    #[test]
    fn test_zeroed_light_uniforms_have_no_lights() {
        let lights = LightUniforms::zeroed();
        assert_eq!(lights.num_point_lights, 0);
        assert_eq!(lights.point_lights[0].attenuation, [0.0; 4]);
    }
}
