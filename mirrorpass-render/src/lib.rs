//! Platform-independent core of the mirrorpass deferred renderer.
//!
//! Holds everything a backend needs that is not tied to a graphics API:
//! camera and projection math, lights, meshes, scene objects, the render
//! target layout, and the per-pixel algorithms of the lighting, SSR and
//! composite passes. The `software` module runs all four passes on the CPU
//! with the same math the WGSL shaders use.

pub mod camera;
pub mod error;
pub mod frame;
pub mod light;
pub mod math;
pub mod mesh;
pub mod scene;
pub mod shading;
pub mod software;
pub mod ssr;
pub mod targets;
pub mod texture;

pub use camera::{Camera, CameraMovement, Projection};
pub use error::RenderError;
pub use frame::FrameContext;
pub use light::{Attenuation, LightSet, PointLight};
pub use mesh::{MeshError, MeshVertex, TriangleMesh};
pub use scene::{Material, ObjectTransform, Scene, SceneObject, StencilRule};
pub use ssr::{MissReason, RayMarch};
pub use targets::{
    create_framebuffer_group, AttachmentAccess, AttachmentRole, AttachmentSlot, AttachmentSpec,
    FilterMode, FramebufferGroup, FramebufferIssue, FramebufferKind, PixelFormat,
    RenderTargetSet,
};
pub use texture::{Texture, TextureError};

pub use mirrorpass_gpu_shared::scene_format::SsrSettings;
