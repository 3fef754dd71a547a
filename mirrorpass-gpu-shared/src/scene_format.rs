//! Scene description format: window, camera, objects, lights and pass settings.
//!
//! Loaded from TOML at launch. The built-in default reproduces the reference
//! SSR scene (three models over a reflective ground plane, three point lights).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::uniforms::MAX_POINT_LIGHTS;

#[derive(Debug, thiserror::Error)]
pub enum SceneFormatError {
    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene description: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize scene description: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid scene description: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub window: WindowDescription,
    pub camera: CameraDescription,
    pub ssr: SsrSettings,
    pub composite: CompositeSettings,
    pub objects: Vec<ObjectDescription>,
    pub lights: Vec<LightDescription>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDescription {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowDescription {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "SSR".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub position: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Mouse-look sensitivity in degrees per pixel.
    pub sensitivity: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 30.0],
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 300.0,
            speed: 2.0,
            sensitivity: 0.1,
        }
    }
}

/// Ray-march settings for the SSR pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrSettings {
    pub max_steps: u32,
    /// View-space distance advanced per step.
    pub step_size: f32,
    /// Rays longer than this (view-space units) are misses.
    pub max_distance: f32,
}

impl Default for SsrSettings {
    fn default() -> Self {
        Self {
            max_steps: 300,
            step_size: 0.25,
            max_distance: 75.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    pub reflection_strength: f32,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            reflection_strength: 1.0,
        }
    }
}

/// Procedural meshes that need no asset file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinMesh {
    /// 10x10 quad in the XZ plane, normal +Y.
    Plane,
    /// Unit-half-extent cube centred on the origin.
    Cube,
    /// Unit-radius UV sphere.
    Sphere,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshSource {
    Path(PathBuf),
    Builtin(BuiltinMesh),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    pub albedo: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albedo_map: Option<PathBuf>,
}

impl Default for MaterialDescription {
    fn default() -> Self {
        Self {
            albedo: [0.8, 0.8, 0.8],
            specular: [0.5, 0.5, 0.5],
            shininess: 32.0,
            albedo_map: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Mirror the object horizontally (object-space X negated).
    #[serde(default)]
    pub flip: bool,
    /// Marks the object's pixels for screen-space reflections.
    #[serde(default)]
    pub reflective: bool,
    pub mesh: MeshSource,
    #[serde(default)]
    pub material: MaterialDescription,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightDescription {
    pub position: [f32; 3],
    pub color: [f32; 3],
    /// (constant, linear, quadratic)
    pub attenuation: [f32; 3],
}

impl Default for SceneDescription {
    fn default() -> Self {
        let model = |name: &str, path: &str, translation: [f32; 3], scale: [f32; 3], flip: bool| {
            ObjectDescription {
                name: name.to_string(),
                translation,
                scale,
                flip,
                reflective: false,
                mesh: MeshSource::Path(PathBuf::from(path)),
                material: MaterialDescription::default(),
            }
        };

        Self {
            window: WindowDescription::default(),
            camera: CameraDescription::default(),
            ssr: SsrSettings::default(),
            composite: CompositeSettings::default(),
            objects: vec![
                model("bunny", "models/bunny.obj", [0.0, 5.0, -20.0], [3.0, 3.0, 3.0], false),
                model(
                    "round table",
                    "models/SIMPLE ROUND TABLE.obj",
                    [-17.0, -9.0, 0.0],
                    [1.0, 1.0, 1.0],
                    false,
                ),
                model("teapot", "models/teapot.obj", [-17.0, -2.0, 0.0], [0.5, 0.5, 0.5], true),
                ObjectDescription {
                    name: "ground".to_string(),
                    translation: [0.0, -20.0, 0.0],
                    scale: [10.0, 1.0, 10.0],
                    flip: false,
                    reflective: true,
                    mesh: MeshSource::Builtin(BuiltinMesh::Plane),
                    material: MaterialDescription {
                        albedo: [0.45, 0.45, 0.5],
                        specular: [0.8, 0.8, 0.8],
                        shininess: 64.0,
                        albedo_map: None,
                    },
                },
            ],
            lights: vec![
                LightDescription {
                    position: [20.0, 10.0, 10.0],
                    color: [1.0, 1.0, 1.0],
                    attenuation: [1.0, 0.007, 0.0002],
                },
                LightDescription {
                    position: [-25.0, -5.0, -35.0],
                    color: [0.224, 0.42, 0.659],
                    attenuation: [1.0, 0.007, 0.0002],
                },
                LightDescription {
                    position: [25.0, -5.0, -35.0],
                    color: [0.306, 0.714, 0.71],
                    attenuation: [1.0, 0.027, 0.0028],
                },
            ],
        }
    }
}

impl SceneDescription {
    /// Parse and validate a TOML scene description. Relative paths are left untouched.
    pub fn from_toml_str(source: &str) -> Result<Self, SceneFormatError> {
        let description: Self = toml::from_str(source)?;
        description.validate()?;
        Ok(description)
    }

    /// Read a scene file; relative mesh and texture paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, SceneFormatError> {
        let source = std::fs::read_to_string(path).map_err(|source| SceneFormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut description = Self::from_toml_str(&source)?;
        if let Some(base) = path.parent() {
            description.resolve_paths(base);
        }
        Ok(description)
    }

    pub fn to_toml_string(&self) -> Result<String, SceneFormatError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Prefix every relative asset path with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for object in &mut self.objects {
            if let MeshSource::Path(path) = &mut object.mesh {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
            if let Some(map) = &mut object.material.albedo_map {
                if map.is_relative() {
                    *map = base.join(&*map);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), SceneFormatError> {
        let invalid = |msg: String| Err(SceneFormatError::Invalid(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }
        let cam = &self.camera;
        if !(cam.fov_y_degrees > 0.0 && cam.fov_y_degrees < 180.0) {
            return invalid(format!("camera fov must be in (0, 180), got {}", cam.fov_y_degrees));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return invalid(format!(
                "camera planes must satisfy 0 < near < far, got near={} far={}",
                cam.near, cam.far
            ));
        }
        if self.lights.len() > MAX_POINT_LIGHTS {
            return invalid(format!(
                "{} lights configured, at most {MAX_POINT_LIGHTS} supported",
                self.lights.len()
            ));
        }
        for (i, light) in self.lights.iter().enumerate() {
            let [c, l, q] = light.attenuation;
            if c < 0.0 || l < 0.0 || q < 0.0 || c + l + q <= 0.0 {
                return invalid(format!(
                    "light {i}: attenuation coefficients must be non-negative and not all zero"
                ));
            }
        }
        for object in &self.objects {
            if object.scale.iter().any(|s| *s == 0.0) {
                return invalid(format!("object '{}' has a zero scale component", object.name));
            }
        }
        if self.ssr.max_steps == 0 || self.ssr.step_size <= 0.0 || self.ssr.max_distance <= 0.0 {
            return invalid("ssr max_steps, step_size and max_distance must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_matches_reference_layout() {
        let scene = SceneDescription::default();
        assert_eq!(scene.window.width, 1280);
        assert_eq!(scene.window.height, 720);
        assert_eq!(scene.camera.position, [0.0, 0.0, 30.0]);
        assert_eq!(scene.objects.len(), 4);
        assert_eq!(scene.lights.len(), 3);

        let reflective: Vec<_> = scene.objects.iter().filter(|o| o.reflective).collect();
        assert_eq!(reflective.len(), 1);
        assert_eq!(reflective[0].translation, [0.0, -20.0, 0.0]);

        let teapot = scene.objects.iter().find(|o| o.name == "teapot").unwrap();
        assert!(teapot.flip);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_scene_fills_defaults() {
        let src = r#"
            [[objects]]
            name = "floor"
            reflective = true
            mesh = { builtin = "plane" }

            [[lights]]
            position = [0.0, 10.0, 0.0]
            color = [1.0, 1.0, 1.0]
            attenuation = [1.0, 0.0, 0.0]
        "#;
        let scene = SceneDescription::from_toml_str(src).unwrap();
        assert_eq!(scene.window, WindowDescription::default());
        assert_eq!(scene.ssr, SsrSettings::default());
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.objects[0].scale, [1.0, 1.0, 1.0]);
        assert_eq!(scene.objects[0].mesh, MeshSource::Builtin(BuiltinMesh::Plane));
        assert!(!scene.objects[0].flip);
        assert_eq!(scene.objects[0].material, MaterialDescription::default());
    }

    #[test]
    fn test_parse_mesh_path_and_albedo_map() {
        let src = r#"
            [[objects]]
            name = "bunny"
            translation = [0.0, 5.0, -20.0]
            mesh = { path = "models/bunny.obj" }
            material = { albedo = [1.0, 0.0, 0.0], albedo_map = "tex/bunny.png" }
        "#;
        let mut scene = SceneDescription::from_toml_str(src).unwrap();
        scene.resolve_paths(Path::new("/assets"));
        assert_eq!(
            scene.objects[0].mesh,
            MeshSource::Path(PathBuf::from("/assets/models/bunny.obj"))
        );
        assert_eq!(
            scene.objects[0].material.albedo_map.as_deref(),
            Some(Path::new("/assets/tex/bunny.png"))
        );
        assert_eq!(scene.objects[0].material.albedo, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_default_scene_survives_toml_export() {
        let scene = SceneDescription::default();
        let text = scene.to_toml_string().unwrap();
        let parsed = SceneDescription::from_toml_str(&text).unwrap();
        assert_eq!(parsed, scene);
    }

    #[test]
    fn test_rejects_too_many_lights() {
        let mut scene = SceneDescription::default();
        scene.lights = vec![scene.lights[0].clone(); MAX_POINT_LIGHTS + 1];
        assert!(matches!(scene.validate(), Err(SceneFormatError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_attenuation_and_bad_planes() {
        let mut scene = SceneDescription::default();
        scene.lights[0].attenuation = [0.0, 0.0, 0.0];
        assert!(scene.validate().is_err());

        let mut scene = SceneDescription::default();
        scene.camera.near = 10.0;
        scene.camera.far = 1.0;
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_window() {
        let src = "[window]\nwidth = 0\nheight = 720\n";
        assert!(matches!(
            SceneDescription::from_toml_str(src),
            Err(SceneFormatError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = SceneDescription::from_toml_str("[window\nwidth = 3").unwrap_err();
        assert!(matches!(err, SceneFormatError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SceneDescription::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, SceneFormatError::Io { .. }));
    }

    #[test]
    fn test_showcase_scene_uses_only_builtin_meshes() {
        let scene = SceneDescription::from_toml_str(include_str!("../../scenes/showcase.toml")).unwrap();
        assert_eq!(scene.window.title, "SSR showcase");
        assert!(scene
            .objects
            .iter()
            .all(|o| matches!(o.mesh, MeshSource::Builtin(_))));
        assert_eq!(scene.objects.iter().filter(|o| o.reflective).count(), 1);
        assert_eq!(scene.lights.len(), 3);
    }
}
