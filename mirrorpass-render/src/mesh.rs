//! Triangle meshes: OBJ loading through `tobj` plus a few procedural shapes.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use mirrorpass_gpu_shared::scene_format::BuiltinMesh;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("mesh file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to parse mesh {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Interleaved vertex, matching the geometry pass vertex layout
/// (location 0 position, 1 normal, 2 uv).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Load every model in an OBJ file and merge them into one mesh.
    ///
    /// Missing normals are generated (area-weighted), missing UVs are zero.
    /// UV v is flipped so (0,0) is the top-left of the texture image.
    pub fn load_obj(path: &Path) -> Result<Self, MeshError> {
        if !path.is_file() {
            return Err(MeshError::FileNotFound(path.to_path_buf()));
        }

        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };
        let (models, _materials) = tobj::load_obj(path, &options).map_err(|e| match e {
            tobj::LoadError::OpenFileFailed => MeshError::FileNotFound(path.to_path_buf()),
            other => MeshError::Parse {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        let mut mesh = Self::default();
        for model in &models {
            mesh.append_obj_mesh(&model.mesh);
        }

        if mesh.indices.is_empty() {
            return Err(MeshError::Parse {
                path: path.to_path_buf(),
                message: "no triangles".to_string(),
            });
        }

        log::info!(
            "Loaded {} ({} models, {} vertices, {} triangles)",
            path.display(),
            models.len(),
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    fn append_obj_mesh(&mut self, obj: &tobj::Mesh) {
        let base = self.vertices.len() as u32;
        let count = obj.positions.len() / 3;
        let has_normals = obj.normals.len() == obj.positions.len();
        let has_uvs = obj.texcoords.len() / 2 == count;

        for i in 0..count {
            let position = [
                obj.positions[3 * i],
                obj.positions[3 * i + 1],
                obj.positions[3 * i + 2],
            ];
            let normal = if has_normals {
                [obj.normals[3 * i], obj.normals[3 * i + 1], obj.normals[3 * i + 2]]
            } else {
                [0.0; 3]
            };
            let uv = if has_uvs {
                [obj.texcoords[2 * i], 1.0 - obj.texcoords[2 * i + 1]]
            } else {
                [0.0; 2]
            };
            self.vertices.push(MeshVertex {
                position,
                normal,
                uv,
            });
        }

        let start = self.indices.len();
        self.indices.extend(obj.indices.iter().map(|i| base + i));

        if !has_normals {
            generate_normals(&mut self.vertices[base as usize..], &self.indices[start..], base);
        }
    }

    pub fn builtin(kind: BuiltinMesh) -> Self {
        match kind {
            BuiltinMesh::Plane => Self::plane(5.0),
            BuiltinMesh::Cube => Self::cube(1.0),
            BuiltinMesh::Sphere => Self::sphere(1.0, 32, 16),
        }
    }

    /// Square in the XZ plane spanning `[-half_extent, half_extent]`, normal +Y.
    pub fn plane(half_extent: f32) -> Self {
        let h = half_extent;
        let n = [0.0, 1.0, 0.0];
        let vertices = vec![
            MeshVertex { position: [-h, 0.0, -h], normal: n, uv: [0.0, 0.0] },
            MeshVertex { position: [-h, 0.0, h], normal: n, uv: [0.0, 1.0] },
            MeshVertex { position: [h, 0.0, h], normal: n, uv: [1.0, 1.0] },
            MeshVertex { position: [h, 0.0, -h], normal: n, uv: [1.0, 0.0] },
        ];
        Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Axis-aligned cube with flat per-face normals.
    pub fn cube(half_extent: f32) -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut mesh = Self::default();
        for (normal, u, v) in faces {
            let base = mesh.vertices.len() as u32;
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
            for (su, sv) in corners {
                let p = (normal + u * su + v * sv) * half_extent;
                mesh.vertices.push(MeshVertex {
                    position: p.to_array(),
                    normal: normal.to_array(),
                    uv: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// UV sphere centred on the origin.
    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut mesh = Self::default();

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let theta = v * std::f32::consts::PI;
            for segment in 0..=segments {
                let u = segment as f32 / segments as f32;
                let phi = u * std::f32::consts::TAU;
                let normal = Vec3::new(phi.cos() * theta.sin(), theta.cos(), -phi.sin() * theta.sin());
                mesh.vertices.push(MeshVertex {
                    position: (normal * radius).to_array(),
                    normal: normal.to_array(),
                    uv: [u, v],
                });
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [&MeshVertex; 3]> {
        self.indices.chunks_exact(3).map(|tri| {
            [
                &self.vertices[tri[0] as usize],
                &self.vertices[tri[1] as usize],
                &self.vertices[tri[2] as usize],
            ]
        })
    }

    /// Axis-aligned bounds `(min, max)`; `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

/// Area-weighted vertex normals. `indices` are absolute; `base` is the index
/// of `vertices[0]` within the full mesh.
fn generate_normals(vertices: &mut [MeshVertex], indices: &[u32], base: u32) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] - base, tri[1] - base, tri[2] - base].map(|i| i as usize);
        let (pa, pb, pc) = (
            Vec3::from(vertices[a].position),
            Vec3::from(vertices[b].position),
            Vec3::from(vertices[c].position),
        );
        // Cross product length is twice the area, so larger faces weigh more.
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    for (vertex, n) in vertices.iter_mut().zip(accum) {
        vertex.normal = n.normalize_or(Vec3::Y).to_array();
    }
}
