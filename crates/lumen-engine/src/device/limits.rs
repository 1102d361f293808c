use anyhow::{bail, Result};

/// Checks `requested` against the adapter's `supported` limits.
///
/// Returns the limits to put in the device descriptor. Maximums must not
/// exceed what the adapter supports and alignments must not be finer;
/// otherwise the device request would fail inside the driver with a less
/// useful message.
pub fn negotiate_limits(requested: &wgpu::Limits, supported: &wgpu::Limits) -> Result<wgpu::Limits> {
    if !requested.check_limits(supported) {
        log::error!("requested limits: {requested:?}");
        log::error!("supported limits: {supported:?}");
        bail!("adapter does not support the requested device limits");
    }
    Ok(requested.clone())
}
