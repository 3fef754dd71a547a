//! Render pipeline creation for the four deferred SSR passes.
//! Each function creates a wgpu::RenderPipeline or bind group layout with the
//! bindings declared by the matching WGSL module.

use mirrorpass_gpu_shared::shaders;
use mirrorpass_render::scene::StencilRule;
use mirrorpass_render::targets::{AttachmentRole, RenderTargetSet};

use crate::render_targets::{role_format, DEPTH_FORMAT};

/// Shared fullscreen vertex state (vertex-index-based full-screen triangle).
fn fullscreen_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        buffers: &[],
    }
}

fn stencil_face(compare: wgpu::CompareFunction, pass_op: wgpu::StencilOperation) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    }
}

/// Geometry pass depth-stencil: depth LESS with writes, stencil per rule.
/// The reference value itself is dynamic state (`set_stencil_reference`).
pub fn gbuffer_depth_stencil(rule: StencilRule) -> wgpu::DepthStencilState {
    let (face, write_mask) = match rule {
        StencilRule::KeepWhereEqual(_) => (
            stencil_face(wgpu::CompareFunction::Equal, wgpu::StencilOperation::Keep),
            0x00,
        ),
        StencilRule::ReplaceAlways(_) => (
            stencil_face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Replace),
            0xFF,
        ),
    };

    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// SSR depth-stencil: stencil EQUAL ref, nothing written.
pub fn ssr_depth_stencil() -> wgpu::DepthStencilState {
    let face = stencil_face(wgpu::CompareFunction::Equal, wgpu::StencilOperation::Keep);
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: 0x00,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Texture read with `textureLoad` (no sampler).
fn loaded_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Depth is read with `textureLoad` as an unfilterable float texture; GL
/// cannot load from `texture_depth_2d`.
fn depth_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampled_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

// ============================================================
// Bind group layouts
// ============================================================

/// Group 0 of the geometry pass: `FrameUniforms`.
pub fn create_per_frame_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Per-Frame BGL"),
        entries: &[uniform_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        )],
    })
}

/// Group 1 of the geometry pass: material uniforms, albedo map, sampler.
pub fn create_material_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material BGL"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
            sampled_texture_entry(1),
            sampler_entry(2),
        ],
    })
}

/// Group 2 of the geometry pass: `ObjectUniforms`.
pub fn create_per_object_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Per-Object BGL"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
    })
}

/// Lighting group 0: frame uniforms + G-Buffer.
pub fn create_lighting_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Lighting BGL"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
            // 1: normal, 2: albedo, 3: specular
            loaded_texture_entry(1),
            loaded_texture_entry(2),
            loaded_texture_entry(3),
            // 4: depth
            depth_texture_entry(4),
        ],
    })
}

/// Lighting group 1: `LightUniforms`.
pub fn create_light_data_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Light Data BGL"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
    })
}

pub fn create_ssr_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("SSR BGL"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
            depth_texture_entry(1),
            // 2: normal, 3: lit color
            loaded_texture_entry(2),
            loaded_texture_entry(3),
        ],
    })
}

pub fn create_composite_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Composite BGL"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
            // 1: lit, 2: reflection, 3: specular
            sampled_texture_entry(1),
            sampled_texture_entry(2),
            sampled_texture_entry(3),
            sampler_entry(4),
        ],
    })
}

// ============================================================
// G-Buffer Pipeline
// ============================================================

/// Geometry pipeline for one stencil rule. Culling is off so mirrored
/// (flipped) objects still render.
pub fn create_gbuffer_pipeline(
    device: &wgpu::Device,
    targets: &RenderTargetSet,
    rule: StencilRule,
    per_frame_bgl: &wgpu::BindGroupLayout,
    material_bgl: &wgpu::BindGroupLayout,
    per_object_bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let label = match rule {
        StencilRule::KeepWhereEqual(_) => "GBuffer Pipeline (opaque)",
        StencilRule::ReplaceAlways(_) => "GBuffer Pipeline (reflective)",
    };

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("GBuffer Shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::GBUFFER_SHADER.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("GBuffer Pipeline Layout"),
        bind_group_layouts: &[per_frame_bgl, material_bgl, per_object_bgl],
        push_constant_ranges: &[],
    });

    let color_target = |role| {
        Some(wgpu::ColorTargetState {
            format: role_format(targets, role),
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[wgpu::VertexBufferLayout {
                // MeshVertex: position vec3, normal vec3, uv vec2
                array_stride: 32,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![
                    0 => Float32x3,
                    1 => Float32x3,
                    2 => Float32x2,
                ],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[
                color_target(AttachmentRole::Normal),
                color_target(AttachmentRole::Albedo),
                color_target(AttachmentRole::Specular),
            ],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(gbuffer_depth_stencil(rule)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

// ============================================================
// Fullscreen passes
// ============================================================

/// Fullscreen-triangle pipeline with a single bind group layout list.
pub fn create_fullscreen_effect_pipeline(
    device: &wgpu::Device,
    label: &str,
    frag_source: &str,
    frag_entry: &str,
    bgls: &[&wgpu::BindGroupLayout],
    output_format: wgpu::TextureFormat,
    depth_stencil: Option<wgpu::DepthStencilState>,
) -> wgpu::RenderPipeline {
    let vert_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fullscreen Triangle Vertex"),
        source: wgpu::ShaderSource::Wgsl(shaders::FULLSCREEN_TRIANGLE_VERT.into()),
    });

    let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} Fragment")),
        source: wgpu::ShaderSource::Wgsl(frag_source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Layout")),
        bind_group_layouts: bgls,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: fullscreen_vertex_state(&vert_module),
        fragment: Some(wgpu::FragmentState {
            module: &frag_module,
            entry_point: Some(frag_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

pub fn create_lighting_pipeline(
    device: &wgpu::Device,
    targets: &RenderTargetSet,
    lighting_bgl: &wgpu::BindGroupLayout,
    light_data_bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    create_fullscreen_effect_pipeline(
        device,
        "Deferred Lighting Pipeline",
        shaders::DEFERRED_LIGHTING_FRAG,
        "fs_main",
        &[lighting_bgl, light_data_bgl],
        role_format(targets, AttachmentRole::LitColor),
        None,
    )
}

/// SSR runs only where the stencil holds the reflective reference value.
pub fn create_ssr_pipeline(
    device: &wgpu::Device,
    targets: &RenderTargetSet,
    ssr_bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    create_fullscreen_effect_pipeline(
        device,
        "SSR Pipeline",
        shaders::SSR_FRAG,
        "fs_main",
        &[ssr_bgl],
        role_format(targets, AttachmentRole::ReflectionColor),
        Some(ssr_depth_stencil()),
    )
}

pub fn create_composite_pipeline(
    device: &wgpu::Device,
    composite_bgl: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    create_fullscreen_effect_pipeline(
        device,
        "Composite Pipeline",
        shaders::COMPOSITE_FRAG,
        "fs_main",
        &[composite_bgl],
        surface_format,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorpass_render::scene::REFLECTIVE_STENCIL;

    #[test]
    fn test_opaque_objects_never_write_stencil() {
        let state = gbuffer_depth_stencil(StencilRule::for_object(false));
        assert_eq!(state.stencil.write_mask, 0);
        assert_eq!(state.stencil.front.compare, wgpu::CompareFunction::Equal);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Less);
        assert!(state.depth_write_enabled);
    }

    #[test]
    fn test_reflective_objects_replace_on_depth_pass_only() {
        let rule = StencilRule::for_object(true);
        assert_eq!(rule.reference(), REFLECTIVE_STENCIL);
        let state = gbuffer_depth_stencil(rule);
        assert_eq!(state.stencil.front.compare, wgpu::CompareFunction::Always);
        assert_eq!(state.stencil.front.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(state.stencil.front.depth_fail_op, wgpu::StencilOperation::Keep);
        assert_eq!(state.stencil.back, state.stencil.front);
    }

    #[test]
    fn test_ssr_state_is_read_only() {
        let state = ssr_depth_stencil();
        assert!(!state.depth_write_enabled);
        assert_eq!(state.stencil.write_mask, 0);
        assert_eq!(state.stencil.front.compare, wgpu::CompareFunction::Equal);
    }

    #[test]
    fn test_depth_binds_as_unfilterable_float() {
        let entry = depth_texture_entry(4);
        assert_eq!(entry.binding, 4);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                ..
            }
        ));
    }
}
