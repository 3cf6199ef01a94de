//! wgpu render backend for framestep.
//!
//! Implements the device and shader-binding traits from `framestep-render`
//! over a single textured, two-light pipeline.
//!
//! # Invariants
//! - Draw constants are snapshotted at `draw_indexed`; later writes never
//!   affect an already recorded draw.
//! - Nothing reaches the surface until `present`.
//! - A lost or outdated surface skips the frame rather than failing.

mod gpu;
mod shaders;
mod texture;

pub use gpu::{MAX_DRAWS_PER_FRAME, WgpuBackend};
pub use shaders::SCENE_SHADER;
pub use texture::{DecodedImage, decode_rgba};
