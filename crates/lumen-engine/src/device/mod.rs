//! GPU device + surface management.
//!
//! This module is responsible for:
//! - acquiring the wgpu Instance/Adapter/Device/Queue through the blocking bridge
//! - negotiating required limits against what the adapter supports
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//!
//! Handles are stored in reverse acquisition order so that dropping a context
//! releases the queue first and the surface (or adapter) last. The instance is
//! released as soon as the adapter exists; the adapter keeps the backend alive.

mod acquire;
mod gpu;
mod headless;
mod init;
mod inspect;
mod limits;
mod surface;

pub use gpu::{Gpu, GpuFrame};
pub use headless::HeadlessGpu;
pub use init::GpuInit;
pub use limits::negotiate_limits;
pub use surface::SurfaceErrorAction;
