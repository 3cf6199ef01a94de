//! Backend-agnostic rendering interface.
//!
//! # Invariants
//! - Draws read only committed shader constants, never staged ones.
//! - Every draw is an indexed triangle list.
//! - Handles are issued and owned by the backend that created them.
//!
//! The scene talks to [`RenderBackend`]; the wgpu backend and the in-memory
//! [`RecordingBackend`] are interchangeable behind it.

mod backend;
mod error;
mod recording;
pub mod shader;

pub use backend::{GraphicsDevice, RenderBackend, ShaderBindings};
pub use error::RenderError;
pub use recording::{Command, RecordingBackend};
pub use shader::{ConstantBlock, DrawConstants, ShaderStage, ShaderTable, VariableKind};

pub fn crate_info() -> &'static str {
    "framestep-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
