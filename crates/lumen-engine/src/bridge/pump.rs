use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll, Waker};

use anyhow::{Context, Result};

/// One step of driver event processing.
///
/// Implementations must not block indefinitely; the waiting loop calls
/// `pump` repeatedly and checks for completion in between.
pub trait EventPump {
    fn pump(&mut self) -> Result<()>;
}

/// Drains a device's pending callbacks (buffer maps, submitted work).
pub struct DevicePump<'a> {
    device: &'a wgpu::Device,
}

impl<'a> DevicePump<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }
}

impl EventPump for DevicePump<'_> {
    fn pump(&mut self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Poll)
            .context("device poll failed")?;
        Ok(())
    }
}

/// Advances a future by one poll per step.
///
/// wgpu exposes adapter and device requests as futures. Polling them with a
/// no-op waker is enough because the waiting loop re-polls on every step
/// instead of relying on wake-ups.
pub struct FuturePump<'a> {
    future: Option<Pin<Box<dyn Future<Output = ()> + 'a>>>,
}

impl<'a> FuturePump<'a> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + 'a,
    {
        Self {
            future: Some(Box::pin(future)),
        }
    }

}

impl EventPump for FuturePump<'_> {
    fn pump(&mut self) -> Result<()> {
        let Some(future) = self.future.as_mut() else { return Ok(()) };

        let mut cx = TaskContext::from_waker(Waker::noop());
        if let Poll::Ready(()) = future.as_mut().poll(&mut cx) {
            self.future = None;
        }
        Ok(())
    }
}
