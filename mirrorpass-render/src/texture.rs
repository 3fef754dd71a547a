//! RGBA8 albedo textures decoded with `image`.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec4};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to decode texture {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Tightly packed RGBA8 texels, row-major from the top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Texture {
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        if !path.is_file() {
            return Err(TextureError::FileNotFound(path.to_path_buf()));
        }
        let image = image::open(path)
            .map_err(|source| TextureError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        log::info!("Loaded texture {} ({width}x{height})", path.display());
        Ok(Self {
            width,
            height,
            data: image.into_raw(),
        })
    }

    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected || width == 0 || height == 0 {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// 1x1 opaque white, bound when a material has no albedo map.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            data: vec![255; 4],
        }
    }

    /// Nearest-neighbour lookup with repeat addressing.
    pub fn sample_nearest(&self, uv: Vec2) -> Vec4 {
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let texel = &self.data[i..i + 4];
        Vec4::new(
            texel[0] as f32,
            texel[1] as f32,
            texel[2] as f32,
            texel[3] as f32,
        ) / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Texture {
        #[rustfmt::skip]
        let data = vec![
            255, 0, 0, 255,   0, 255, 0, 255,
            0, 0, 255, 255,   255, 255, 255, 255,
        ];
        Texture::from_rgba8(2, 2, data).unwrap()
    }

    #[test]
    fn test_sample_nearest_picks_quadrants() {
        let tex = checker();
        assert_eq!(tex.sample_nearest(Vec2::new(0.25, 0.25)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tex.sample_nearest(Vec2::new(0.75, 0.25)), Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(tex.sample_nearest(Vec2::new(0.25, 0.75)), Vec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_sample_nearest_repeats() {
        let tex = checker();
        assert_eq!(
            tex.sample_nearest(Vec2::new(1.25, -0.75)),
            tex.sample_nearest(Vec2::new(0.25, 0.25))
        );
    }

    #[test]
    fn test_from_rgba8_rejects_wrong_length() {
        assert!(matches!(
            Texture::from_rgba8(2, 2, vec![0; 15]),
            Err(TextureError::SizeMismatch { expected: 16, actual: 15, .. })
        ));
    }

    #[test]
    fn test_load_missing_texture() {
        let err = Texture::load(Path::new("/no/such/texture.png")).unwrap_err();
        assert!(matches!(err, TextureError::FileNotFound(_)));
    }

    #[test]
    fn test_load_png_round_trip() {
        let path = std::env::temp_dir().join(format!("mirrorpass-{}-tex.png", std::process::id()));
        let tex = checker();
        image::save_buffer(&path, &tex.data, 2, 2, image::ColorType::Rgba8).unwrap();
        let loaded = Texture::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, tex);
    }
}
