use crate::config::ConfigError;
use framestep_common::{MaterialHandle, MeshHandle};
use framestep_render::RenderError;
use std::path::PathBuf;

/// Errors from building or running a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("{} contains no triangles", .0.display())]
    EmptyObj(PathBuf),
    #[error("index count {0} is not a multiple of 3")]
    NotTriangles(usize),
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("no mesh for handle {0:?}")]
    MissingMesh(MeshHandle),
    #[error("no material for handle {0:?}")]
    MissingMaterial(MaterialHandle),
}
