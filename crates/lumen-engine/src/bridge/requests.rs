use super::error::RequestError;
use super::pending::PendingRequest;
use super::policy::WaitPolicy;
use super::pump::{DevicePump, FuturePump};

/// Requests an adapter and blocks until the driver answers.
pub fn request_adapter_sync(
    instance: &wgpu::Instance,
    options: &wgpu::RequestAdapterOptions<'_, '_>,
    policy: &WaitPolicy,
) -> Result<wgpu::Adapter, RequestError> {
    let (pending, completion) = PendingRequest::new("adapter");

    let request = instance.request_adapter(options);
    let mut pump = FuturePump::new(async move {
        match request.await {
            Ok(adapter) => completion.succeed(adapter),
            Err(err) => completion.fail(err),
        }
    });

    pending.wait(&mut pump, policy)
}

/// Requests a device/queue pair and blocks until the driver answers.
pub fn request_device_sync(
    adapter: &wgpu::Adapter,
    descriptor: &wgpu::DeviceDescriptor<'_>,
    policy: &WaitPolicy,
) -> Result<(wgpu::Device, wgpu::Queue), RequestError> {
    let (pending, completion) = PendingRequest::new("device");

    let request = adapter.request_device(descriptor);
    let mut pump = FuturePump::new(async move {
        match request.await {
            Ok(pair) => completion.succeed(pair),
            Err(err) => completion.fail(err),
        }
    });

    pending.wait(&mut pump, policy)
}

/// Maps the whole of `buffer` for reading and blocks until the mapping is live.
///
/// The mapped bytes are read afterwards through `buffer.slice(..).get_mapped_range()`;
/// the caller must `unmap` before the buffer is used by the GPU again.
pub fn map_read_sync(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
    policy: &WaitPolicy,
) -> Result<(), RequestError> {
    let (pending, completion) = PendingRequest::new("buffer map");

    buffer
        .slice(..)
        .map_async(wgpu::MapMode::Read, move |result| match result {
            Ok(()) => completion.succeed(()),
            Err(err) => completion.fail(err),
        });

    pending.wait(&mut DevicePump::new(device), policy)
}

/// Closes `scope` and blocks until the driver reports what it captured.
///
/// Returns `Ok(None)` when the work recorded inside the scope was accepted.
pub fn pop_error_scope_sync(
    scope: wgpu::ErrorScopeGuard,
    policy: &WaitPolicy,
) -> Result<Option<wgpu::Error>, RequestError> {
    let (pending, completion) = PendingRequest::new("error scope");

    let popped = scope.pop();
    let mut pump = FuturePump::new(async move {
        completion.succeed(popped.await);
    });

    pending.wait(&mut pump, policy)
}
