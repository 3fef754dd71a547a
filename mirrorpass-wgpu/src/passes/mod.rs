//! Render pass implementations for the deferred SSR pipeline.

pub mod composite;
pub mod gbuffer;
pub mod lighting;
pub mod ssr;
