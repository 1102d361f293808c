//! Capability dumps for the selected adapter and device.

pub(crate) fn log_adapter(adapter: &wgpu::Adapter) {
    let info = adapter.get_info();
    log::info!(
        "adapter: {} ({:?}, {:?} backend)",
        info.name,
        info.device_type,
        info.backend
    );
    log::debug!(" - vendor id: {:#06x}", info.vendor);
    log::debug!(" - device id: {:#06x}", info.device);
    if !info.driver.is_empty() {
        log::debug!(" - driver: {} {}", info.driver, info.driver_info);
    }

    log_limits("adapter", &adapter.limits());
    log::debug!("adapter features: {:?}", adapter.features());
}

pub(crate) fn log_device(device: &wgpu::Device) {
    log_limits("device", &device.limits());
    log::debug!("device features: {:?}", device.features());
}

// Only the subset useful when diagnosing surface/texture problems.
fn log_limits(owner: &str, limits: &wgpu::Limits) {
    log::debug!("{owner} limits:");
    log::debug!(" - max_texture_dimension_1d: {}", limits.max_texture_dimension_1d);
    log::debug!(" - max_texture_dimension_2d: {}", limits.max_texture_dimension_2d);
    log::debug!(" - max_texture_dimension_3d: {}", limits.max_texture_dimension_3d);
    log::debug!(" - max_texture_array_layers: {}", limits.max_texture_array_layers);
    log::debug!(" - max_vertex_attributes: {}", limits.max_vertex_attributes);
    log::debug!(" - max_buffer_size: {}", limits.max_buffer_size);
}
