//! GPU rendering subsystem.
//!
//! Renderers own their GPU resources (pipelines, buffers, bind groups) in a
//! [`ResourceStack`](crate::lifecycle::ResourceStack) and record into the
//! encoder of the current frame.

mod ctx;
mod mesh;

pub use ctx::{RenderCtx, RenderTarget};
pub use mesh::{indexed_draw_range, MeshRenderer, SceneUniforms};
