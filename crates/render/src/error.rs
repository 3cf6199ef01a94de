use crate::shader::ShaderStage;
use framestep_common::{BufferHandle, SamplerHandle, ShaderHandle, TextureHandle};
use std::path::PathBuf;

/// Errors surfaced by render backends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),
    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureSize { expected: usize, actual: usize },
    #[error("unknown buffer handle: {0:?}")]
    UnknownBuffer(BufferHandle),
    #[error("unknown shader handle: {0:?}")]
    UnknownShader(ShaderHandle),
    #[error("unknown texture handle: {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("unknown sampler handle: {0:?}")]
    UnknownSampler(SamplerHandle),
    #[error("draw of {requested} indices exceeds index buffer length {available}")]
    IndexRange { requested: u32, available: u32 },
    #[error("no {0:?} shader is active")]
    NoActiveShader(ShaderStage),
    #[error("shader {shader:?} rejected variable `{name}`")]
    UnboundVariable { shader: ShaderHandle, name: String },
    #[error("frame exceeds {0} draws")]
    FrameCapacity(usize),
    #[error("surface error: {0}")]
    Surface(String),
}
