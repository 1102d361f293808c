//! Lumen engine crate.
//!
//! Blocking bridge over wgpu's asynchronous requests, ordered GPU resource
//! lifecycle, a windowed render loop and a headless compute path.

pub mod bridge;
pub mod lifecycle;

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod resources;
pub mod render;
pub mod compute;
