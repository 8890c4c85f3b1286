//! Glint GPU text renderer
//!
//! Draws [`glint_text`] objects with wgpu: an R8 coverage atlas texture,
//! one vertex buffer per text object, and per-object translate uniforms
//! bound with dynamic offsets.

pub mod renderer;
pub mod shaders;

pub use renderer::{RendererConfig, RendererError, TextRenderer};
