//! G-Buffer geometry pass: every object into the normal/albedo/specular MRTs,
//! marking the stencil where reflective surfaces win the depth test.

use mirrorpass_render::scene::StencilRule;

use crate::backend::{GBuffer, GPUMesh};

/// One draw in the geometry pass. Bind groups are built at upload time.
pub struct GBufferDraw<'a> {
    pub mesh: &'a GPUMesh,
    pub material_bg: &'a wgpu::BindGroup,
    pub object_bg: &'a wgpu::BindGroup,
    pub rule: StencilRule,
}

/// Pipelines for both stencil rules.
pub struct GBufferPipelines<'a> {
    pub opaque: &'a wgpu::RenderPipeline,
    pub reflective: &'a wgpu::RenderPipeline,
}

impl GBufferPipelines<'_> {
    fn for_rule(&self, rule: StencilRule) -> &wgpu::RenderPipeline {
        match rule {
            StencilRule::KeepWhereEqual(_) => self.opaque,
            StencilRule::ReplaceAlways(_) => self.reflective,
        }
    }
}

fn cleared(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

/// Render `draws` in order. Colors clear to zero, depth to 1, stencil to 0.
pub fn render_gbuffer_pass(
    encoder: &mut wgpu::CommandEncoder,
    gbuffer: &GBuffer,
    pipelines: &GBufferPipelines<'_>,
    per_frame_bg: &wgpu::BindGroup,
    draws: &[GBufferDraw<'_>],
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("G-Buffer Pass"),
        color_attachments: &[
            cleared(&gbuffer.normal_view),
            cleared(&gbuffer.albedo_view),
            cleared(&gbuffer.specular_view),
        ],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &gbuffer.depth_stencil_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0),
                store: wgpu::StoreOp::Store,
            }),
        }),
        ..Default::default()
    });

    pass.set_bind_group(0, per_frame_bg, &[]);

    let mut current: Option<StencilRule> = None;
    for draw in draws {
        if current != Some(draw.rule) {
            pass.set_pipeline(pipelines.for_rule(draw.rule));
            pass.set_stencil_reference(u32::from(draw.rule.reference()));
            current = Some(draw.rule);
        }

        pass.set_bind_group(1, draw.material_bg, &[]);
        pass.set_bind_group(2, draw.object_bg, &[]);
        pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
    }
}

/// Material group: uniforms, albedo map (or the white default), sampler.
pub fn create_material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    material_buffer: &wgpu::Buffer,
    albedo_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("GBuffer Material BG"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(albedo_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Single-uniform group (per-frame, per-object and light data share this shape).
pub fn create_uniform_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}
