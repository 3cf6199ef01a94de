//! Shared types for the framestep workspace.
//!
//! # Invariants
//! - GPU-facing structs are `#[repr(C)]` and `Pod`; their sizes are fixed.
//! - Handles are plain indices; whoever issued a handle owns the resource.

mod dirty;
mod types;

pub use dirty::Cached;
pub use types::{
    BufferHandle, DirectionalLight, DirectionalLightRaw, MaterialHandle, MeshHandle,
    SamplerHandle, ShaderHandle, TextureHandle, Vertex,
};
