use mirrorpass_render::RenderError;

/// Failures of the wgpu backend. Surface loss is handled internally and
/// never reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("adapter '{adapter}' lacks required capabilities: {missing:?}")]
    UnsupportedAdapter {
        adapter: String,
        missing: wgpu::DownlevelFlags,
    },

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats for this adapter")]
    UnsupportedSurface,

    #[error("surface texture error: {0}")]
    SurfaceTexture(#[from] wgpu::SurfaceError),

    #[error("GPU validation failed while building the pipeline: {0}")]
    Validation(String),

    #[error(transparent)]
    Targets(#[from] RenderError),
}
