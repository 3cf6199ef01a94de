use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Per-vertex layout shared by every mesh: position, normal, texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// A directional light as seen by the pixel stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub direction: Vec3,
}

impl DirectionalLight {
    /// Pack into the 16-byte aligned layout the shader constant block expects.
    pub fn to_raw(&self) -> DirectionalLightRaw {
        DirectionalLightRaw {
            ambient: self.ambient.to_array(),
            diffuse: self.diffuse.to_array(),
            direction: self.direction.to_array(),
            _pad: 0.0,
        }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.1, 0.1, 0.1, 1.0),
            diffuse: Vec4::ONE,
            direction: Vec3::new(0.0, -1.0, 0.0),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightRaw {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub direction: [f32; 3],
    pub _pad: f32,
}

/// Index into a scene's mesh table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u32);

/// Index into a scene's material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(pub u32);

/// Backend-owned GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Backend-owned texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Backend-owned sampler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerHandle(pub u64);

/// Backend-owned shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u64);
