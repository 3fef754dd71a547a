use mirrorpass_gpu_shared::scene_format::{CompositeSettings, SsrSettings};
use mirrorpass_gpu_shared::uniforms::{
    CompositeParams, LightUniforms, MaterialUniforms, PerFrameUniforms, PerObjectUniforms, SsrParams,
};
use mirrorpass_render::scene::{Scene, SceneObject, StencilRule};
use mirrorpass_render::targets::{AttachmentAccess, AttachmentRole, FilterMode, RenderTargetSet};
use mirrorpass_render::{FrameContext, Texture, TriangleMesh};
use wgpu::util::DeviceExt;

use crate::error::BackendError;
use crate::handle::HandleStore;
use crate::passes::composite::{create_composite_bind_group, render_composite_pass};
use crate::passes::gbuffer::{
    create_material_bind_group, create_uniform_bind_group, render_gbuffer_pass, GBufferDraw,
    GBufferPipelines,
};
use crate::passes::lighting::{create_lighting_bind_group, render_lighting_pass};
use crate::passes::ssr::{create_ssr_bind_group, render_ssr_pass};
use crate::pipeline;
use crate::render_targets;

/// GPU mesh with an interleaved `MeshVertex` buffer and u32 indices.
pub struct GPUMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// GPU texture with associated view and sampler.
pub struct GPUTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Single color attachment (lit color or reflection color).
pub struct RenderTarget {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// G-Buffer with multiple render targets for deferred shading.
pub struct GBuffer {
    /// RGB = view-space normal
    pub normal: wgpu::Texture,
    pub normal_view: wgpu::TextureView,
    /// RGB = diffuse albedo
    pub albedo: wgpu::Texture,
    pub albedo_view: wgpu::TextureView,
    /// RGB = specular color, A = shininess / 256
    pub specular: wgpu::Texture,
    pub specular_view: wgpu::TextureView,
    /// Depth + 8-bit stencil. The stencil marks reflective pixels.
    pub depth_stencil: wgpu::Texture,
    pub depth_stencil_view: wgpu::TextureView,
    /// Depth-only view for shader reads.
    pub depth_sample_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// One scene object with its uniform buffers and bind groups.
pub struct GPUObject {
    pub mesh: u64,
    pub rule: StencilRule,
    pub object_buffer: wgpu::Buffer,
    pub object_bg: wgpu::BindGroup,
    pub material_buffer: wgpu::Buffer,
    pub material_bg: wgpu::BindGroup,
    pub source: SceneObject,
}

/// Scene resources resident on the GPU, objects in draw order.
#[derive(Default)]
pub struct GpuScene {
    pub meshes: HandleStore<GPUMesh>,
    pub textures: HandleStore<GPUTexture>,
    pub objects: Vec<GPUObject>,
}

impl GpuScene {
    fn draws(&self) -> Vec<GBufferDraw<'_>> {
        self.objects
            .iter()
            .filter_map(|object| {
                let Some(mesh) = self.meshes.get(object.mesh) else {
                    log::warn!("Object '{}' refers to a missing mesh", object.source.name);
                    return None;
                };
                Some(GBufferDraw {
                    mesh,
                    material_bg: &object.material_bg,
                    object_bg: &object.object_bg,
                    rule: object.rule,
                })
            })
            .collect()
    }
}

/// Size-dependent resources, rebuilt on resize.
struct FrameTargets {
    gbuffer: GBuffer,
    lit: RenderTarget,
    reflection: RenderTarget,
    ssr_depth_access: AttachmentAccess,
    lighting_bg: wgpu::BindGroup,
    ssr_bg: wgpu::BindGroup,
    composite_bg: wgpu::BindGroup,
}

/// Deferred SSR pipeline: pipelines, layouts, uniform buffers and targets.
pub struct DeferredPipeline {
    // Layouts
    material_bgl: wgpu::BindGroupLayout,
    per_object_bgl: wgpu::BindGroupLayout,
    lighting_bgl: wgpu::BindGroupLayout,
    ssr_bgl: wgpu::BindGroupLayout,
    composite_bgl: wgpu::BindGroupLayout,

    // Pipelines
    gbuffer_opaque: wgpu::RenderPipeline,
    gbuffer_reflective: wgpu::RenderPipeline,
    lighting: wgpu::RenderPipeline,
    ssr: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,

    // Uniforms
    per_frame_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    ssr_params_buffer: wgpu::Buffer,
    composite_params_buffer: wgpu::Buffer,
    per_frame_bg: wgpu::BindGroup,
    light_data_bg: wgpu::BindGroup,

    // Shared resources
    target_sampler: wgpu::Sampler,
    _default_texture: wgpu::Texture,
    default_texture_view: wgpu::TextureView,
    default_sampler: wgpu::Sampler,

    targets: FrameTargets,
}

fn uniform_buffer<T>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Nearest filtering with repeat addressing, matching the CPU sampler.
fn create_albedo_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

impl DeferredPipeline {
    /// Build every pipeline for `targets` and a final output of `output_format`.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: &RenderTargetSet,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let per_frame_bgl = pipeline::create_per_frame_bgl(device);
        let material_bgl = pipeline::create_material_bgl(device);
        let per_object_bgl = pipeline::create_per_object_bgl(device);
        let lighting_bgl = pipeline::create_lighting_bgl(device);
        let light_data_bgl = pipeline::create_light_data_bgl(device);
        let ssr_bgl = pipeline::create_ssr_bgl(device);
        let composite_bgl = pipeline::create_composite_bgl(device);

        log::info!("Creating G-Buffer pipelines...");
        let gbuffer_opaque = pipeline::create_gbuffer_pipeline(
            device,
            targets,
            StencilRule::for_object(false),
            &per_frame_bgl,
            &material_bgl,
            &per_object_bgl,
        );
        let gbuffer_reflective = pipeline::create_gbuffer_pipeline(
            device,
            targets,
            StencilRule::for_object(true),
            &per_frame_bgl,
            &material_bgl,
            &per_object_bgl,
        );

        log::info!("Creating deferred lighting pipeline...");
        let lighting =
            pipeline::create_lighting_pipeline(device, targets, &lighting_bgl, &light_data_bgl);

        log::info!("Creating SSR pipeline...");
        let ssr = pipeline::create_ssr_pipeline(device, targets, &ssr_bgl);

        log::info!("Creating composite pipeline...");
        let composite = pipeline::create_composite_pipeline(device, &composite_bgl, output_format);

        let per_frame_buffer = uniform_buffer::<PerFrameUniforms>(device, "Per-Frame Uniforms");
        let light_buffer = uniform_buffer::<LightUniforms>(device, "Light Uniforms");
        let ssr_params_buffer = uniform_buffer::<SsrParams>(device, "SSR Params");
        let composite_params_buffer = uniform_buffer::<CompositeParams>(device, "Composite Params");

        let per_frame_bg =
            create_uniform_bind_group(device, "Per-Frame BG", &per_frame_bgl, &per_frame_buffer);
        let light_data_bg =
            create_uniform_bind_group(device, "Light Data BG", &light_data_bgl, &light_buffer);

        let lit_filter = targets
            .lighting
            .attachment(AttachmentRole::LitColor)
            .map(|spec| spec.filter)
            .unwrap_or(FilterMode::Nearest);
        let target_sampler = render_targets::create_target_sampler(device, lit_filter);
        let (default_texture, default_texture_view) =
            render_targets::create_default_texture(device, queue);
        let default_sampler = create_albedo_sampler(device, "Default Albedo Sampler");

        let frame_targets = Self::create_frame_targets(
            device,
            targets,
            &lighting_bgl,
            &ssr_bgl,
            &composite_bgl,
            &per_frame_buffer,
            &ssr_params_buffer,
            &composite_params_buffer,
            &target_sampler,
        );

        log::info!(
            "Deferred pipeline ready at {}x{}",
            targets.width(),
            targets.height()
        );

        Self {
            material_bgl,
            per_object_bgl,
            lighting_bgl,
            ssr_bgl,
            composite_bgl,
            gbuffer_opaque,
            gbuffer_reflective,
            lighting,
            ssr,
            composite,
            per_frame_buffer,
            light_buffer,
            ssr_params_buffer,
            composite_params_buffer,
            per_frame_bg,
            light_data_bg,
            target_sampler,
            _default_texture: default_texture,
            default_texture_view,
            default_sampler,
            targets: frame_targets,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create_frame_targets(
        device: &wgpu::Device,
        targets: &RenderTargetSet,
        lighting_bgl: &wgpu::BindGroupLayout,
        ssr_bgl: &wgpu::BindGroupLayout,
        composite_bgl: &wgpu::BindGroupLayout,
        per_frame_buffer: &wgpu::Buffer,
        ssr_params_buffer: &wgpu::Buffer,
        composite_params_buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
    ) -> FrameTargets {
        let gbuffer = render_targets::create_gbuffer(device, &targets.geometry);
        let lit = render_targets::create_color_target(
            device,
            "Lit Color",
            &targets.lighting,
            AttachmentRole::LitColor,
        );
        let reflection = render_targets::create_color_target(
            device,
            "Reflection Color",
            &targets.ssr,
            AttachmentRole::ReflectionColor,
        );

        let ssr_depth_access = targets
            .ssr
            .depth_stencil()
            .map(|spec| spec.access)
            .unwrap_or(AttachmentAccess::ReadOnly);

        let lighting_bg = create_lighting_bind_group(device, lighting_bgl, per_frame_buffer, &gbuffer);
        let ssr_bg = create_ssr_bind_group(device, ssr_bgl, ssr_params_buffer, &gbuffer, &lit);
        let composite_bg = create_composite_bind_group(
            device,
            composite_bgl,
            composite_params_buffer,
            &lit,
            &reflection,
            &gbuffer,
            sampler,
        );

        FrameTargets {
            gbuffer,
            lit,
            reflection,
            ssr_depth_access,
            lighting_bg,
            ssr_bg,
            composite_bg,
        }
    }

    /// Recreate all size-dependent targets. Pipelines are format-bound only.
    pub fn resize(&mut self, device: &wgpu::Device, targets: &RenderTargetSet) {
        self.targets = Self::create_frame_targets(
            device,
            targets,
            &self.lighting_bgl,
            &self.ssr_bgl,
            &self.composite_bgl,
            &self.per_frame_buffer,
            &self.ssr_params_buffer,
            &self.composite_params_buffer,
            &self.target_sampler,
        );
        log::debug!(
            "Deferred targets resized to {}x{}",
            targets.width(),
            targets.height()
        );
    }

    fn upload_mesh(device: &wgpu::Device, mesh: &TriangleMesh) -> GPUMesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        GPUMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, image: &Texture) -> GPUTexture {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Albedo Map"),
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
            &image.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GPUTexture {
            texture,
            view,
            sampler: create_albedo_sampler(device, "Albedo Sampler"),
        }
    }

    /// Upload meshes, textures and per-object uniforms. Material uniforms are
    /// written once here; object matrices are rewritten every frame.
    pub fn upload_scene(&self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) -> GpuScene {
        let mut gpu = GpuScene::default();

        let mesh_handles: Vec<u64> = scene
            .meshes
            .iter()
            .map(|mesh| gpu.meshes.insert(Self::upload_mesh(device, mesh)))
            .collect();
        let texture_handles: Vec<u64> = scene
            .textures
            .iter()
            .map(|texture| gpu.textures.insert(Self::upload_texture(device, queue, texture)))
            .collect();

        for object in scene.objects() {
            let object_buffer = uniform_buffer::<PerObjectUniforms>(device, "Per-Object UBO");
            let object_bg =
                create_uniform_bind_group(device, "Per-Object BG", &self.per_object_bgl, &object_buffer);

            let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material UBO"),
                contents: bytemuck::bytes_of::<MaterialUniforms>(&object.material.to_gpu()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let albedo_map = object
                .material
                .albedo_map
                .and_then(|id| texture_handles.get(id.0))
                .and_then(|&handle| gpu.textures.get(handle));
            let (view, sampler) = match albedo_map {
                Some(texture) => (&texture.view, &texture.sampler),
                None => (&self.default_texture_view, &self.default_sampler),
            };
            let material_bg =
                create_material_bind_group(device, &self.material_bgl, &material_buffer, view, sampler);

            gpu.objects.push(GPUObject {
                mesh: mesh_handles[object.mesh.0],
                rule: object.stencil_rule(),
                object_buffer,
                object_bg,
                material_buffer,
                material_bg,
                source: object.clone(),
            });
        }

        log::info!(
            "Uploaded scene: {} meshes, {} textures, {} objects",
            gpu.meshes.len(),
            gpu.textures.len(),
            gpu.objects.len()
        );
        gpu
    }

    /// Write this frame's uniforms and record all four passes.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameContext,
        scene: &GpuScene,
        ssr: &SsrSettings,
        composite: &CompositeSettings,
        output_view: &wgpu::TextureView,
    ) {
        queue.write_buffer(&self.per_frame_buffer, 0, bytemuck::bytes_of(&frame.frame_uniforms()));
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&frame.light_uniforms()));
        let ssr_params = mirrorpass_render::ssr::ssr_params(
            ssr,
            &frame.projection,
            self.targets.gbuffer.width,
            self.targets.gbuffer.height,
        );
        queue.write_buffer(&self.ssr_params_buffer, 0, bytemuck::bytes_of(&ssr_params));
        let composite_params = CompositeParams {
            reflection_strength: composite.reflection_strength,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        };
        queue.write_buffer(
            &self.composite_params_buffer,
            0,
            bytemuck::bytes_of(&composite_params),
        );
        for object in &scene.objects {
            let uniforms = object.source.object_uniforms(&frame.view);
            queue.write_buffer(&object.object_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let targets = &self.targets;
        render_gbuffer_pass(
            encoder,
            &targets.gbuffer,
            &GBufferPipelines {
                opaque: &self.gbuffer_opaque,
                reflective: &self.gbuffer_reflective,
            },
            &self.per_frame_bg,
            &scene.draws(),
        );
        render_lighting_pass(
            encoder,
            &targets.lit,
            &self.lighting,
            &targets.lighting_bg,
            &self.light_data_bg,
        );
        render_ssr_pass(
            encoder,
            &targets.reflection,
            &targets.gbuffer,
            targets.ssr_depth_access,
            &self.ssr,
            &targets.ssr_bg,
        );
        render_composite_pass(encoder, output_view, &self.composite, &targets.composite_bg);
    }
}

/// Downlevel features every frame relies on: the SSR pass stencil-tests
/// against the G-Buffer depth-stencil while sampling its depth.
pub const REQUIRED_DOWNLEVEL_FLAGS: wgpu::DownlevelFlags =
    wgpu::DownlevelFlags::READ_ONLY_DEPTH_STENCIL;

/// Reject adapters missing any of [`REQUIRED_DOWNLEVEL_FLAGS`].
pub fn check_downlevel_support(adapter: &str, flags: wgpu::DownlevelFlags) -> Result<(), BackendError> {
    let missing = REQUIRED_DOWNLEVEL_FLAGS.difference(flags);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BackendError::UnsupportedAdapter {
            adapter: adapter.to_string(),
            missing,
        })
    }
}

/// Main backend state: device, swapchain, deferred pipeline and the scene.
pub struct WGPUBackendState {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub width: u32,
    pub height: u32,
    pub deferred: DeferredPipeline,
    pub scene: GpuScene,
}

impl WGPUBackendState {
    /// Create the device and surface for `window`, build the pipeline and
    /// upload `scene`.
    pub fn new(
        window: impl raw_window_handle::HasWindowHandle
            + raw_window_handle::HasDisplayHandle
            + Send
            + Sync
            + 'static,
        width: u32,
        height: u32,
        scene: &Scene,
    ) -> Result<Self, BackendError> {
        let width = width.max(1);
        let height = height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(BackendError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Using adapter: {info:?}");
        check_downlevel_support(&info.name, adapter.get_downlevel_capabilities().flags)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mirrorpass Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;

        // Lighting output is already display-ready; avoid a second gamma curve.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(BackendError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("Surface configured: {surface_format:?} {width}x{height}");

        let targets = RenderTargetSet::standard(width, height)?;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let deferred = DeferredPipeline::new(&device, &queue, &targets, surface_format);
        let gpu_scene = deferred.upload_scene(&device, &queue, scene);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(BackendError::Validation(err.to_string()));
        }

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            width,
            height,
            deferred,
            scene: gpu_scene,
        })
    }

    /// Resize the surface and recreate every off-screen target. A zero
    /// dimension (minimized window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let targets = RenderTargetSet::standard(width, height)?;

        self.width = width;
        self.height = height;
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.deferred.resize(&self.device, &targets);
        Ok(())
    }

    /// Render one frame and present it. Lost or outdated surfaces are
    /// reconfigured and the frame is skipped.
    pub fn render_frame(
        &mut self,
        frame: &FrameContext,
        ssr: &SsrSettings,
        composite: &CompositeSettings,
    ) -> Result<(), BackendError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface texture timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.deferred.render(
            &self.queue,
            &mut encoder,
            frame,
            &self.scene,
            ssr,
            composite,
            &view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
