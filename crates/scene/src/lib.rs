//! Scene model and frame loop: camera, entities, meshes, materials and the
//! driver that updates and draws them.
//!
//! # Invariants
//! - View and world matrices are rebuilt only when their inputs change;
//!   equality is exact per component.
//! - Entities refer to meshes and materials by index into tables the driver
//!   owns; the tables outlive every entity.
//! - Each frame runs update, then draw. Draw order is entity order.
//! - Matrices reach the shader as column-major `Mat4` for `M * v`.

mod camera;
mod config;
mod driver;
mod entity;
mod error;
pub mod geometry;
mod material;
mod mesh;

pub use camera::{Camera, CameraConfig};
pub use config::{ConfigError, EntityConfig, MaterialConfig, SceneConfig};
pub use driver::{FrameControl, FrameStats, SceneDriver};
pub use entity::{Entity, Motion};
pub use error::SceneError;
pub use geometry::MeshKind;
pub use material::{Material, checkerboard};
pub use mesh::{Mesh, MeshData};

pub fn crate_info() -> &'static str {
    "framestep-scene v0.1.0"
}
