use mirrorpass_gpu_shared::scene_format::SceneFormatError;

use crate::mesh::MeshError;
use crate::targets::{FramebufferIssue, FramebufferKind};
use crate::texture::TextureError;

/// Errors raised while building the scene or the render target layout.
/// All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("incomplete {kind:?} framebuffer: {issue}")]
    IncompleteFramebuffer {
        kind: FramebufferKind,
        issue: FramebufferIssue,
    },
    #[error("{requested} point lights requested, at most {max} supported")]
    TooManyLights { requested: usize, max: usize },
    #[error("object '{object}': {source}")]
    Mesh {
        object: String,
        #[source]
        source: MeshError,
    },
    #[error("object '{object}': {source}")]
    Texture {
        object: String,
        #[source]
        source: TextureError,
    },
    #[error(transparent)]
    SceneFormat(#[from] SceneFormatError),
}
