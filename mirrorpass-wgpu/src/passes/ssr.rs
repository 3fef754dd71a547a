//! SSR pass: ray march reflections for stencil-marked pixels only.

use mirrorpass_render::scene::REFLECTIVE_STENCIL;
use mirrorpass_render::targets::AttachmentAccess;

use crate::backend::{GBuffer, RenderTarget};

type DepthStencilOps = (Option<wgpu::Operations<f32>>, Option<wgpu::Operations<u32>>);

/// Attachment ops for the G-Buffer depth-stencil in the SSR pass. Read-only
/// access has no ops, which is what lets the pass sample the same texture.
pub fn depth_stencil_ops(access: AttachmentAccess) -> DepthStencilOps {
    match access {
        AttachmentAccess::ReadOnly => (None, None),
        AttachmentAccess::ReadWrite => (
            Some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            }),
            Some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            }),
        ),
    }
}

/// Render SSR from G-Buffer depth + normals + lit scene, stencil-tested
/// against the reflective marks left by the geometry pass.
pub fn render_ssr_pass(
    encoder: &mut wgpu::CommandEncoder,
    target: &RenderTarget,
    gbuffer: &GBuffer,
    depth_access: AttachmentAccess,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let (depth_ops, stencil_ops) = depth_stencil_ops(depth_access);
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("SSR Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &target.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &gbuffer.depth_stencil_view,
            depth_ops,
            stencil_ops,
        }),
        ..Default::default()
    });

    pass.set_pipeline(pipeline);
    pass.set_stencil_reference(u32::from(REFLECTIVE_STENCIL));
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

pub fn create_ssr_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params_buffer: &wgpu::Buffer,
    gbuffer: &GBuffer,
    lit: &RenderTarget,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSR Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&gbuffer.depth_sample_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&gbuffer.normal_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&lit.color_view),
            },
        ],
    })
}
