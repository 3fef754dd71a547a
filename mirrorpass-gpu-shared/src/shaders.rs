//! Embedded WGSL shader source strings for the deferred SSR pipeline.
//! The CPU reference passes in `mirrorpass-render` implement the same math.

pub const FULLSCREEN_TRIANGLE_VERT: &str = include_str!("../shaders/fullscreen_triangle.wgsl");
pub const GBUFFER_SHADER: &str = include_str!("../shaders/gbuffer.wgsl");
pub const DEFERRED_LIGHTING_FRAG: &str = include_str!("../shaders/deferred_lighting.wgsl");
pub const SSR_FRAG: &str = include_str!("../shaders/ssr.wgsl");
pub const COMPOSITE_FRAG: &str = include_str!("../shaders/composite.wgsl");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_shaders_export_fs_main() {
        for src in [GBUFFER_SHADER, DEFERRED_LIGHTING_FRAG, SSR_FRAG, COMPOSITE_FRAG] {
            assert!(src.contains("fn fs_main"));
        }
        assert!(FULLSCREEN_TRIANGLE_VERT.contains("fn vs_main"));
        assert!(GBUFFER_SHADER.contains("fn vs_main"));
    }
}
