use std::sync::Arc;

use anyhow::{Context, Result};

use crate::bridge;

use super::{inspect, limits, GpuInit};

pub(crate) fn create_instance() -> wgpu::Instance {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    log::debug!("wgpu instance created");
    instance
}

/// Requests an adapter, compatible with `surface` when one is given.
pub(crate) fn acquire_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
    init: &GpuInit,
) -> Result<wgpu::Adapter> {
    log::info!("requesting adapter...");

    let adapter = bridge::request_adapter_sync(
        instance,
        &wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        },
        &init.request_policy,
    )
    .context("failed to find a suitable GPU adapter")?;

    inspect::log_adapter(&adapter);
    Ok(adapter)
}

/// Negotiates limits/features against `adapter` and requests the device + queue.
pub(crate) fn acquire_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
    label: &str,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let required_limits = limits::negotiate_limits(&init.required_limits, &adapter.limits())?;

    let supported = adapter.features();
    anyhow::ensure!(
        supported.contains(init.required_features),
        "adapter lacks required features: requested {:?}, supported {supported:?}",
        init.required_features
    );

    log::info!("requesting device...");

    let (device, queue) = bridge::request_device_sync(
        adapter,
        &wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: init.required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        },
        &init.request_policy,
    )
    .context("failed to create wgpu device/queue")?;

    install_error_handlers(&device);
    inspect::log_device(&device);

    Ok((device, queue))
}

// Without a handler wgpu panics on the first validation error.
fn install_error_handlers(device: &wgpu::Device) {
    device.set_device_lost_callback(|reason, message| {
        log::error!("device lost ({reason:?}): {message}");
    });

    device.on_uncaptured_error(Arc::new(|error: wgpu::Error| {
        log::error!("uncaptured device error: {error}");
    }));
}
