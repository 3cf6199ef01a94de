use crate::error::RenderError;
use crate::shader::ShaderStage;
use framestep_common::{
    BufferHandle, DirectionalLight, SamplerHandle, ShaderHandle, TextureHandle, Vertex,
};
use glam::Mat4;
use std::path::Path;

/// Resource creation and frame submission.
///
/// Buffer, texture and sampler handles are owned by the device until
/// released. Draws always use a triangle list with `u32` indices.
pub trait GraphicsDevice {
    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle, RenderError>;

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle, RenderError>;

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, RenderError>;

    /// Decode an image file into a sampled texture.
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, RenderError>;

    /// Upload tightly packed RGBA8 pixels.
    fn create_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureHandle, RenderError>;

    /// Linear filtering, wrap addressing on all axes.
    fn create_sampler(&mut self) -> Result<SamplerHandle, RenderError>;

    fn release_buffer(&mut self, buffer: BufferHandle);

    fn release_texture(&mut self, texture: TextureHandle);

    /// Begin a frame by clearing color and depth.
    fn clear(&mut self, color: [f32; 4], depth: f32);

    /// Draw `index_count` indices with whatever constants are committed on the
    /// active shader pair at the time of the call.
    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    ) -> Result<(), RenderError>;

    fn present(&mut self) -> Result<(), RenderError>;

    fn resize(&mut self, width: u32, height: u32);
}

/// Named constant writes into a shader's staging area.
///
/// The setters return `false` when the shader does not declare `name` with a
/// matching type; nothing is written in that case.
pub trait ShaderBindings {
    fn set_matrix4x4(&mut self, shader: ShaderHandle, name: &str, value: Mat4) -> bool;

    fn set_light(&mut self, shader: ShaderHandle, name: &str, light: DirectionalLight) -> bool;

    fn set_texture(&mut self, shader: ShaderHandle, name: &str, texture: TextureHandle) -> bool;

    fn set_sampler(&mut self, shader: ShaderHandle, name: &str, sampler: SamplerHandle) -> bool;

    /// Commit staged values so subsequent draws see them.
    fn copy_all_buffer_data(&mut self, shader: ShaderHandle) -> Result<(), RenderError>;

    /// Make `shader` the active shader for its stage.
    fn set_shader(&mut self, shader: ShaderHandle) -> Result<(), RenderError>;
}

/// Everything the scene needs from a backend.
pub trait RenderBackend: GraphicsDevice + ShaderBindings {}

impl<T: GraphicsDevice + ShaderBindings> RenderBackend for T {}
