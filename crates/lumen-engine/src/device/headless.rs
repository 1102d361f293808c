use anyhow::Result;

use crate::bridge::WaitPolicy;

use super::{acquire, GpuInit};

/// GPU context without a presentation surface, for compute work.
///
/// Acquisition order: instance → adapter → device → queue. Fields are
/// declared in reverse so that drop releases the queue first.
pub struct HeadlessGpu {
    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter: wgpu::Adapter,
    request_policy: WaitPolicy,
}

impl HeadlessGpu {
    pub fn new(init: GpuInit) -> Result<Self> {
        let instance = acquire::create_instance();
        let adapter = acquire::acquire_adapter(&instance, None, &init)?;
        drop(instance);

        let (device, queue) = acquire::acquire_device(&adapter, &init, "lumen compute device")?;

        Ok(Self {
            queue,
            device,
            adapter,
            request_policy: init.request_policy,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Policy used for buffer-map waits on this device.
    pub fn request_policy(&self) -> &WaitPolicy {
        &self.request_policy
    }
}
