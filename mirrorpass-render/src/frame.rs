use glam::{Mat4, Vec2};
use mirrorpass_gpu_shared::uniforms::{LightUniforms, PerFrameUniforms};

use crate::camera::{Camera, Projection};
use crate::light::{light_uniforms, LightSet, PointLight};

/// Per-frame state every pass reads. Built once per frame after input has
/// been applied to the camera, then passed by reference.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub view: Mat4,
    pub projection: Mat4,
    pub inv_projection: Mat4,
    /// Lights with view-space positions.
    pub lights: Vec<PointLight>,
    pub width: u32,
    pub height: u32,
}

impl FrameContext {
    pub fn new(
        camera: &Camera,
        projection: &Projection,
        lights: &LightSet,
        width: u32,
        height: u32,
    ) -> Self {
        let view = camera.view_matrix();
        let projection = projection.matrix();
        Self {
            view,
            projection,
            inv_projection: projection.inverse(),
            lights: lights.to_view_space(&view),
            width,
            height,
        }
    }

    pub fn screen_size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn frame_uniforms(&self) -> PerFrameUniforms {
        PerFrameUniforms {
            view: self.view.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            inv_projection: self.inv_projection.to_cols_array_2d(),
            screen_size: self.screen_size().to_array(),
            _pad1: 0.0,
            _pad2: 0.0,
        }
    }

    pub fn light_uniforms(&self) -> LightUniforms {
        light_uniforms(&self.lights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Attenuation;
    use glam::Vec3;

    #[test]
    fn test_frame_context_moves_lights_into_view_space() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 30.0));
        let projection = Projection::new(1280, 720, 45.0, 0.1, 300.0);
        let lights = LightSet::from_lights([PointLight {
            position: Vec3::new(20.0, 10.0, 10.0),
            color: Vec3::ONE,
            attenuation: Attenuation::new(1.0, 0.007, 0.0002),
        }])
        .unwrap();

        let frame = FrameContext::new(&camera, &projection, &lights, 1280, 720);
        assert!((frame.lights[0].position - Vec3::new(20.0, 10.0, -20.0)).length() < 1e-4);
        assert!((frame.projection * frame.inv_projection).abs_diff_eq(Mat4::IDENTITY, 1e-4));

        let uniforms = frame.frame_uniforms();
        assert_eq!(uniforms.screen_size, [1280.0, 720.0]);
        assert_eq!(frame.light_uniforms().num_point_lights, 1);
    }
}
