//! Scene objects and the loaded scene.
//!
//! Meshes and textures are loaded once and referenced by index. Objects are
//! kept in draw order: every non-reflective object before any reflective one,
//! which the geometry pass stencil rules depend on.

use glam::{Mat3, Mat4, Vec3, Vec4};
use mirrorpass_gpu_shared::scene_format::{
    MaterialDescription, MeshSource, ObjectDescription, SceneDescription,
};
use mirrorpass_gpu_shared::uniforms::{MaterialUniforms, PerObjectUniforms};

use crate::error::RenderError;
use crate::light::{LightSet, PointLight};
use crate::mesh::TriangleMesh;
use crate::texture::Texture;

/// Reference value written for reflective pixels.
pub const REFLECTIVE_STENCIL: u8 = 1;

/// How a draw interacts with the 8-bit stencil buffer during the geometry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilRule {
    /// Pass only where stencil == ref; stencil is never written.
    KeepWhereEqual(u8),
    /// Always pass; write ref wherever the depth test passes.
    ReplaceAlways(u8),
}

impl StencilRule {
    pub fn for_object(reflective: bool) -> Self {
        if reflective {
            Self::ReplaceAlways(REFLECTIVE_STENCIL)
        } else {
            Self::KeepWhereEqual(0)
        }
    }

    pub fn reference(self) -> u8 {
        match self {
            Self::KeepWhereEqual(r) | Self::ReplaceAlways(r) => r,
        }
    }

    pub fn passes(self, stored: u8) -> bool {
        match self {
            Self::KeepWhereEqual(r) => stored == r,
            Self::ReplaceAlways(_) => true,
        }
    }

    /// Stencil value after a fragment passed both stencil and depth tests.
    pub fn on_depth_pass(self, stored: u8) -> u8 {
        match self {
            Self::KeepWhereEqual(_) => stored,
            Self::ReplaceAlways(r) => r,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTransform {
    pub translation: Vec3,
    pub scale: Vec3,
    /// Horizontal mirror: object-space X is negated before scaling.
    pub flip: bool,
}

impl ObjectTransform {
    pub fn model_matrix(&self) -> Mat4 {
        let mirror = if self.flip { -1.0 } else { 1.0 };
        Mat4::from_translation(self.translation)
            * Mat4::from_scale(self.scale * Vec3::new(mirror, 1.0, 1.0))
    }
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            flip: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub albedo: Vec3,
    pub specular: Vec3,
    /// Phong exponent, clamped to 1..=256 so it fits the specular buffer alpha.
    pub shininess: f32,
    pub albedo_map: Option<TextureId>,
}

impl Material {
    pub fn new(albedo: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self {
            albedo,
            specular,
            shininess: shininess.clamp(1.0, 256.0),
            albedo_map: None,
        }
    }

    fn from_description(desc: &MaterialDescription, albedo_map: Option<TextureId>) -> Self {
        Self {
            albedo_map,
            ..Self::new(Vec3::from(desc.albedo), Vec3::from(desc.specular), desc.shininess)
        }
    }

    /// Specular buffer texel: rgb = specular color, a = shininess / 256.
    pub fn specular_texel(&self) -> Vec4 {
        self.specular.extend(self.shininess / 256.0)
    }

    pub fn to_gpu(&self) -> MaterialUniforms {
        MaterialUniforms {
            albedo: self.albedo.extend(1.0).to_array(),
            specular: self.specular_texel().to_array(),
            has_albedo_map: self.albedo_map.is_some() as i32,
            _pad1: 0,
            _pad2: 0,
            _pad3: 0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Vec3::splat(0.8), Vec3::splat(0.5), 32.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshId,
    pub transform: ObjectTransform,
    pub material: Material,
    pub reflective: bool,
}

impl SceneObject {
    pub fn stencil_rule(&self) -> StencilRule {
        StencilRule::for_object(self.reflective)
    }

    pub fn model_view(&self, view: &Mat4) -> Mat4 {
        *view * self.transform.model_matrix()
    }

    /// Inverse-transpose of the model-view upper 3x3. Handles the negative
    /// determinant of flipped objects.
    pub fn normal_matrix(&self, view: &Mat4) -> Mat3 {
        Mat3::from_mat4(self.model_view(view)).inverse().transpose()
    }

    pub fn object_uniforms(&self, view: &Mat4) -> PerObjectUniforms {
        let normal = self.normal_matrix(view);
        PerObjectUniforms {
            model_view: self.model_view(view).to_cols_array_2d(),
            normal_matrix_col0: normal.x_axis.extend(0.0).to_array(),
            normal_matrix_col1: normal.y_axis.extend(0.0).to_array(),
            normal_matrix_col2: normal.z_axis.extend(0.0).to_array(),
            _pad: [0.0; 4],
        }
    }
}

/// Everything loaded for rendering: geometry, textures, objects in draw order, lights.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<TriangleMesh>,
    pub textures: Vec<Texture>,
    objects: Vec<SceneObject>,
    pub lights: LightSet,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every mesh and texture a description refers to. Paths are used
    /// as given; resolve them against the scene file before calling.
    pub fn from_description(desc: &SceneDescription) -> Result<Self, RenderError> {
        desc.validate()?;

        let mut scene = Self::new();
        for object in &desc.objects {
            scene.load_object(object)?;
        }
        scene.lights = LightSet::from_lights(desc.lights.iter().map(PointLight::from_description))?;

        log::info!(
            "Scene ready: {} objects ({} reflective), {} meshes, {} textures, {} lights",
            scene.objects.len(),
            scene.objects.iter().filter(|o| o.reflective).count(),
            scene.meshes.len(),
            scene.textures.len(),
            scene.lights.len()
        );
        Ok(scene)
    }

    fn load_object(&mut self, desc: &ObjectDescription) -> Result<(), RenderError> {
        let mesh = match &desc.mesh {
            MeshSource::Path(path) => {
                TriangleMesh::load_obj(path).map_err(|source| RenderError::Mesh {
                    object: desc.name.clone(),
                    source,
                })?
            }
            MeshSource::Builtin(kind) => TriangleMesh::builtin(*kind),
        };
        let mesh = self.add_mesh(mesh);

        let albedo_map = match &desc.material.albedo_map {
            Some(path) => {
                let texture = Texture::load(path).map_err(|source| RenderError::Texture {
                    object: desc.name.clone(),
                    source,
                })?;
                Some(self.add_texture(texture))
            }
            None => None,
        };

        self.add_object(SceneObject {
            name: desc.name.clone(),
            mesh,
            transform: ObjectTransform {
                translation: Vec3::from(desc.translation),
                scale: Vec3::from(desc.scale),
                flip: desc.flip,
            },
            material: Material::from_description(&desc.material, albedo_map),
            reflective: desc.reflective,
        });
        Ok(())
    }

    pub fn add_mesh(&mut self, mesh: TriangleMesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Insert keeping non-reflective objects ahead of reflective ones.
    pub fn add_object(&mut self, object: SceneObject) {
        let at = if object.reflective {
            self.objects.len()
        } else {
            self.objects.iter().take_while(|o| !o.reflective).count()
        };
        self.objects.insert(at, object);
    }

    /// Objects in draw order.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn mesh(&self, id: MeshId) -> &TriangleMesh {
        &self.meshes[id.0]
    }

    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorpass_gpu_shared::scene_format::BuiltinMesh;

    fn object(name: &str, reflective: bool) -> SceneObject {
        SceneObject {
            name: name.to_string(),
            mesh: MeshId(0),
            transform: ObjectTransform::default(),
            material: Material::default(),
            reflective,
        }
    }

    #[test]
    fn test_stencil_rules() {
        let opaque = StencilRule::for_object(false);
        assert!(opaque.passes(0));
        assert!(!opaque.passes(1));
        assert_eq!(opaque.on_depth_pass(0), 0);

        let mirror = StencilRule::for_object(true);
        assert!(mirror.passes(0) && mirror.passes(1));
        assert_eq!(mirror.on_depth_pass(0), 1);
        assert_eq!(mirror.reference(), REFLECTIVE_STENCIL);
    }

    #[test]
    fn test_flip_negates_object_x() {
        let t = ObjectTransform {
            translation: Vec3::new(-17.0, -2.0, 0.0),
            scale: Vec3::splat(0.5),
            flip: true,
        };
        let p = t.model_matrix().transform_point3(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(p, Vec3::new(-18.0, 0.0, 3.0));
    }

    #[test]
    fn test_normal_matrix_of_flipped_object_mirrors_normals() {
        let mut obj = object("teapot", false);
        obj.transform.flip = true;
        let n = obj.normal_matrix(&Mat4::IDENTITY) * Vec3::X;
        assert!((n.normalize() - Vec3::NEG_X).length() < 1e-6);
        let up = obj.normal_matrix(&Mat4::IDENTITY) * Vec3::Y;
        assert!((up.normalize() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_add_object_keeps_reflective_last() {
        let mut scene = Scene::new();
        scene.add_object(object("ground", true));
        scene.add_object(object("bunny", false));
        scene.add_object(object("mirror", true));
        scene.add_object(object("teapot", false));
        let names: Vec<_> = scene.objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["bunny", "teapot", "ground", "mirror"]);
    }

    #[test]
    fn test_material_packs_shininess_into_alpha() {
        let m = Material::new(Vec3::ONE, Vec3::splat(0.5), 64.0);
        assert_eq!(m.specular_texel().w, 0.25);
        assert_eq!(Material::new(Vec3::ONE, Vec3::ONE, 1000.0).shininess, 256.0);
        assert_eq!(m.to_gpu().has_albedo_map, 0);
    }

    #[test]
    fn test_from_description_with_builtins() {
        let mut desc = SceneDescription::default();
        for object in &mut desc.objects {
            object.mesh = MeshSource::Builtin(BuiltinMesh::Cube);
        }
        let scene = Scene::from_description(&desc).unwrap();
        assert_eq!(scene.objects().len(), 4);
        assert_eq!(scene.lights.len(), 3);
        assert!(scene.objects().last().unwrap().reflective);
        let teapot = scene.objects().iter().find(|o| o.name == "teapot").unwrap();
        assert!(teapot.transform.flip);
    }

    #[test]
    fn test_from_description_reports_missing_mesh() {
        let mut desc = SceneDescription::default();
        desc.objects.truncate(1);
        desc.objects[0].mesh = MeshSource::Path("/no/such/bunny.obj".into());
        let err = Scene::from_description(&desc).unwrap_err();
        assert!(matches!(err, RenderError::Mesh { ref object, .. } if object == "bunny"));
    }
}
