//! Point lights and the bounded light set uploaded to the lighting pass.

use bytemuck::Zeroable;
use glam::{Mat4, Vec3};
use mirrorpass_gpu_shared::scene_format::LightDescription;
use mirrorpass_gpu_shared::uniforms::{LightUniforms, PointLightData, MAX_POINT_LIGHTS};

use crate::error::RenderError;

/// Distance falloff: `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn from_description(desc: &LightDescription) -> Self {
        let [constant, linear, quadratic] = desc.attenuation;
        Self {
            position: Vec3::from(desc.position),
            color: Vec3::from(desc.color),
            attenuation: Attenuation::new(constant, linear, quadratic),
        }
    }

    pub fn to_gpu(&self) -> PointLightData {
        let a = self.attenuation;
        PointLightData {
            position: self.position.extend(1.0).to_array(),
            color: self.color.extend(1.0).to_array(),
            attenuation: [a.constant, a.linear, a.quadratic, 0.0],
        }
    }
}

/// Lights in world space, never more than [`MAX_POINT_LIGHTS`].
#[derive(Debug, Clone, Default)]
pub struct LightSet {
    lights: Vec<PointLight>,
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lights(lights: impl IntoIterator<Item = PointLight>) -> Result<Self, RenderError> {
        let mut set = Self::new();
        for light in lights {
            set.push(light)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, light: PointLight) -> Result<(), RenderError> {
        if self.lights.len() >= MAX_POINT_LIGHTS {
            return Err(RenderError::TooManyLights {
                requested: self.lights.len() + 1,
                max: MAX_POINT_LIGHTS,
            });
        }
        self.lights.push(light);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter()
    }

    /// Copies of every light with positions moved into view space.
    pub fn to_view_space(&self, view: &Mat4) -> Vec<PointLight> {
        self.lights
            .iter()
            .map(|light| PointLight {
                position: view.transform_point3(light.position),
                ..*light
            })
            .collect()
    }
}

/// Pack lights for the lighting pass; anything past [`MAX_POINT_LIGHTS`] is dropped.
pub fn light_uniforms(lights: &[PointLight]) -> LightUniforms {
    let mut uniforms = LightUniforms::zeroed();
    let count = lights.len().min(MAX_POINT_LIGHTS);
    for (slot, light) in uniforms.point_lights.iter_mut().zip(&lights[..count]) {
        *slot = light.to_gpu();
    }
    uniforms.num_point_lights = count as i32;
    uniforms
}
