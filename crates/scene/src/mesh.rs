use crate::error::SceneError;
use framestep_common::{BufferHandle, Vertex};
use framestep_render::GraphicsDevice;
use std::path::Path;

/// CPU-side geometry: a vertex list and a triangle-list index buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl MeshData {
    /// Validates that indices form whole triangles and stay in range.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, SceneError> {
        if indices.len() % 3 != 0 {
            return Err(SceneError::NotTriangles(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(SceneError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        Ok(Self { vertices, indices })
    }

    /// Load every model in a Wavefront OBJ file into one mesh.
    ///
    /// OBJ is right-handed; positions and normals are mirrored in Z, V is
    /// flipped and triangle winding reversed so the result is left-handed
    /// with clockwise front faces.
    pub fn from_obj(path: &Path) -> Result<Self, SceneError> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let base = vertices.len() as u32;
            let count = mesh.positions.len() / 3;
            for i in 0..count {
                let position = [
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    -mesh.positions[i * 3 + 2],
                ];
                let normal = if mesh.normals.len() >= (i + 1) * 3 {
                    [
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        -mesh.normals[i * 3 + 2],
                    ]
                } else {
                    [0.0, 0.0, -1.0]
                };
                let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                    [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0, 0.0]
                };
                vertices.push(Vertex::new(position, normal, uv));
            }
            for tri in mesh.indices.chunks_exact(3) {
                indices.extend_from_slice(&[base + tri[0], base + tri[2], base + tri[1]]);
            }
        }

        if indices.is_empty() {
            return Err(SceneError::EmptyObj(path.to_path_buf()));
        }
        tracing::debug!(
            path = %path.display(),
            models = models.len(),
            vertices = vertices.len(),
            indices = indices.len(),
            "loaded OBJ"
        );
        Self::new(vertices, indices)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Geometry uploaded to a device.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: String,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    pub fn upload<D: GraphicsDevice + ?Sized>(
        name: impl Into<String>,
        data: &MeshData,
        device: &mut D,
    ) -> Result<Self, SceneError> {
        let vertex_buffer = device.create_vertex_buffer(data.vertices())?;
        let index_buffer = device.create_index_buffer(data.indices())?;
        Ok(Self {
            name: name.into(),
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertices().len() as u32,
            index_count: data.indices().len() as u32,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn release<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        device.release_buffer(self.vertex_buffer);
        device.release_buffer(self.index_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framestep_render::RecordingBackend;
    use std::io::Write;

    const QUAD_OBJ: &str = "\
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    fn write_obj(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn rejects_partial_triangles() {
        let err = MeshData::new(vec![Vertex::default(); 3], vec![0, 1]).unwrap_err();
        assert!(matches!(err, SceneError::NotTriangles(2)));
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let err = MeshData::new(vec![Vertex::default(); 3], vec![0, 1, 3]).unwrap_err();
        assert!(matches!(
            err,
            SceneError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        ));
    }

    #[test]
    fn obj_quad_is_triangulated_and_mirrored() {
        let file = write_obj(QUAD_OBJ);
        let data = MeshData::from_obj(file.path()).unwrap();
        assert_eq!(data.vertices().len(), 4);
        assert_eq!(data.indices().len(), 6);
        for v in data.vertices() {
            assert_eq!(v.position[2], -1.0);
            assert_eq!(v.normal, [0.0, 0.0, -1.0]);
        }
        let first = data
            .vertices()
            .iter()
            .find(|v| v.position[0] == 0.0 && v.position[1] == 0.0)
            .unwrap();
        assert_eq!(first.uv, [0.0, 1.0]);
    }

    #[test]
    fn obj_winding_is_reversed() {
        let file = write_obj(QUAD_OBJ);
        let data = MeshData::from_obj(file.path()).unwrap();
        let p = |i: u32| glam::Vec3::from(data.vertices()[i as usize].position);
        for tri in data.indices().chunks_exact(3) {
            let n = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            // Mirrored face points at -Z; clockwise seen from -Z.
            assert!(n.z < 0.0, "{tri:?} -> {n:?}");
        }
    }

    #[test]
    fn obj_without_faces_is_an_error() {
        let file = write_obj("v 0 0 0\nv 1 0 0\n");
        assert!(matches!(
            MeshData::from_obj(file.path()),
            Err(SceneError::EmptyObj(_))
        ));
    }

    #[test]
    fn missing_obj_is_an_error() {
        assert!(matches!(
            MeshData::from_obj(Path::new("/no/such/model.obj")),
            Err(SceneError::Obj(_))
        ));
    }

    #[test]
    fn upload_and_release() {
        let mut backend = RecordingBackend::new(1, 1);
        let data = MeshData::new(vec![Vertex::default(); 3], vec![0, 1, 2]).unwrap();
        let mesh = Mesh::upload("tri", &data, &mut backend).unwrap();
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(backend.live_buffers(), 2);
        mesh.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }
}
