//! Types and shader sources shared by the CPU reference renderer and the wgpu backend.

pub mod scene_format;
pub mod shaders;
pub mod uniforms;
