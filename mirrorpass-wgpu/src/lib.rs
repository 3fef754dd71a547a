//! WebGPU backend for mirrorpass.
//!
//! Owns every wgpu resource of the deferred SSR renderer: the G-Buffer with
//! its depth-stencil attachment, the lit and reflection targets, the four
//! pipelines and the swapchain. Scene data and per-frame state come from
//! `mirrorpass-render`; this crate only uploads and draws them.

pub mod backend;
pub mod error;
pub mod handle;
pub mod passes;
pub mod pipeline;
pub mod render_targets;

pub use backend::{DeferredPipeline, GpuScene, WGPUBackendState};
pub use error::BackendError;
