//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop)
//! and applications: the [`App`] callbacks and the per-frame context that
//! drives acquire → clear → draw → submit → present.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
