//! Render target allocation for the deferred SSR pipeline.
//! Textures are only created from a validated `RenderTargetSet` layout.

use mirrorpass_render::targets::{
    AttachmentRole, FilterMode, FramebufferGroup, PixelFormat, RenderTargetSet,
};

use crate::backend::{GBuffer, RenderTarget};

/// Depth-stencil format shared by the geometry and SSR passes.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Depth24PlusStencil8 => DEPTH_FORMAT,
    }
}

pub fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// wgpu format of `role` in `targets`. Every role exists in a validated set.
pub fn role_format(targets: &RenderTargetSet, role: AttachmentRole) -> wgpu::TextureFormat {
    targets
        .format(role)
        .map(texture_format)
        .unwrap_or(wgpu::TextureFormat::Rgba8Unorm)
}

fn create_attachment_texture(
    device: &wgpu::Device,
    label: &str,
    group: &FramebufferGroup,
    role: AttachmentRole,
) -> wgpu::Texture {
    let format = group
        .attachment(role)
        .map(|spec| texture_format(spec.format))
        .unwrap_or(wgpu::TextureFormat::Rgba8Unorm);

    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: group.width,
            height: group.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Create the G-Buffer: normal, albedo, specular + depth-stencil.
pub fn create_gbuffer(device: &wgpu::Device, group: &FramebufferGroup) -> GBuffer {
    let normal = create_attachment_texture(device, "GBuffer Normal", group, AttachmentRole::Normal);
    let albedo = create_attachment_texture(device, "GBuffer Albedo", group, AttachmentRole::Albedo);
    let specular =
        create_attachment_texture(device, "GBuffer Specular", group, AttachmentRole::Specular);
    let depth_stencil = create_attachment_texture(
        device,
        "GBuffer Depth-Stencil",
        group,
        AttachmentRole::DepthStencil,
    );

    let view_desc = wgpu::TextureViewDescriptor::default();

    GBuffer {
        normal_view: normal.create_view(&view_desc),
        normal,
        albedo_view: albedo.create_view(&view_desc),
        albedo,
        specular_view: specular.create_view(&view_desc),
        specular,
        depth_stencil_view: depth_stencil.create_view(&view_desc),
        // Shaders can only bind one aspect of a combined depth-stencil texture.
        depth_sample_view: depth_stencil.create_view(&wgpu::TextureViewDescriptor {
            label: Some("GBuffer Depth (sampled)"),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        }),
        depth_stencil,
        width: group.width,
        height: group.height,
    }
}

/// Create a single-attachment color target for `role`.
pub fn create_color_target(
    device: &wgpu::Device,
    label: &str,
    group: &FramebufferGroup,
    role: AttachmentRole,
) -> RenderTarget {
    let color_texture = create_attachment_texture(device, label, group, role);
    let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());
    RenderTarget {
        color_texture,
        color_view,
        width: group.width,
        height: group.height,
    }
}

/// Sampler for reading back attachments; honours the layout's filter mode.
pub fn create_target_sampler(device: &wgpu::Device, filter: FilterMode) -> wgpu::Sampler {
    let filter = filter_mode(filter);
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Render Target Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// 1x1 white texture bound for materials without an albedo map.
pub fn create_default_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Default White Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255, 255, 255, 255],
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping_matches_layout() {
        let targets = RenderTargetSet::standard(64, 64).unwrap();
        assert_eq!(
            role_format(&targets, AttachmentRole::Normal),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            role_format(&targets, AttachmentRole::ReflectionColor),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(role_format(&targets, AttachmentRole::DepthStencil), DEPTH_FORMAT);
        assert!(DEPTH_FORMAT.has_stencil_aspect());
    }

    #[test]
    fn test_filter_mapping() {
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
        assert_eq!(filter_mode(FilterMode::Linear), wgpu::FilterMode::Linear);
    }
}
