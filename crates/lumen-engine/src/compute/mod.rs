//! Single-shot compute dispatch with host readback.
//!
//! A [`ComputeJob`] owns a compute pipeline over two storage buffers plus a
//! mappable readback buffer. [`ComputeJob::run`] records the dispatch and a
//! copy into the readback buffer, submits, maps the readback buffer through
//! the blocking bridge, reads the values and unmaps.
//!
//! Work the device rejects is reported as an error: sizes are checked against
//! the device limits up front, and each run executes inside a validation
//! error scope.

use anyhow::{Context, Result};

use crate::bridge::{self, RequestError, WaitPolicy};
use crate::device::HeadlessGpu;
use crate::lifecycle::{ResourceStack, Slot, Stage};
use crate::resources::create_shader_module;

/// Shader-side parameters of a compute job.
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    /// Entry point of the compute shader.
    pub entry_point: &'static str,

    /// Must match the shader's `@workgroup_size` x dimension.
    pub workgroup_size: u32,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            entry_point: "main",
            workgroup_size: 32,
        }
    }
}

/// Number of workgroups needed to cover `len` invocations, `None` if it
/// does not fit in a `u32`.
pub fn workgroup_count(len: usize, workgroup_size: u32) -> Option<u32> {
    let size = workgroup_size.max(1) as usize;
    u32::try_from(len.div_ceil(size)).ok()
}

/// Buffer size and workgroup count for a job of `len` elements.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct JobSize {
    pub bytes: wgpu::BufferAddress,
    pub workgroups: u32,
}

/// Checks a job of `len` `f32` elements against the device `limits`.
pub fn check_job_size(len: usize, workgroup_size: u32, limits: &wgpu::Limits) -> Result<JobSize> {
    anyhow::ensure!(len > 0, "compute job needs at least one element");
    anyhow::ensure!(workgroup_size > 0, "workgroup size must be non-zero");

    let bytes = len
        .checked_mul(std::mem::size_of::<f32>())
        .and_then(|b| wgpu::BufferAddress::try_from(b).ok())
        .with_context(|| format!("{len} elements overflow a buffer size"))?;

    anyhow::ensure!(
        bytes <= limits.max_buffer_size,
        "{len} elements need {bytes} bytes; device max_buffer_size is {}",
        limits.max_buffer_size
    );
    anyhow::ensure!(
        bytes <= u64::from(limits.max_storage_buffer_binding_size),
        "{len} elements need {bytes} bytes; device max_storage_buffer_binding_size is {}",
        limits.max_storage_buffer_binding_size
    );

    let workgroups = workgroup_count(len, workgroup_size)
        .filter(|&w| w <= limits.max_compute_workgroups_per_dimension)
        .with_context(|| {
            format!(
                "{len} elements at workgroup size {workgroup_size} exceed \
                 max_compute_workgroups_per_dimension ({})",
                limits.max_compute_workgroups_per_dimension
            )
        })?;

    Ok(JobSize { bytes, workgroups })
}

/// Reads a mapped buffer, then unmaps it.
///
/// The buffer is unmapped on a failed or timed-out map too, so no map request
/// is left pending for the next run.
fn read_then_unmap<T>(
    mapped: Result<(), RequestError>,
    read: impl FnOnce() -> T,
    unmap: impl FnOnce(),
) -> Result<T, RequestError> {
    let values = mapped.map(|()| read());
    unmap();
    values
}

/// `f32 → f32` compute kernel over a fixed-length array.
///
/// The shader binds `@group(0) @binding(0)` as a read-only storage input and
/// `@binding(1)` as a read-write storage output of the same length.
pub struct ComputeJob {
    stack: ResourceStack,

    pipeline: Slot<wgpu::ComputePipeline>,
    input: Slot<wgpu::Buffer>,
    output: Slot<wgpu::Buffer>,
    readback: Slot<wgpu::Buffer>,
    bind_group: Slot<wgpu::BindGroup>,

    len: usize,
    workgroups: u32,
}

impl ComputeJob {
    pub fn new(device: &wgpu::Device, shader_source: &str, len: usize, config: &ComputeConfig) -> Result<Self> {
        let JobSize {
            bytes: size,
            workgroups,
        } = check_job_size(len, config.workgroup_size, &device.limits())?;

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = create_shader_module(device, "lumen compute shader", shader_source);

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen compute bgl"),
            entries: &[storage_entry(0, true), storage_entry(1, false)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen compute pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("lumen compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(config.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        let buffer = |label: &'static str, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };

        let input = buffer(
            "lumen compute input",
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        let output = buffer(
            "lumen compute output",
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );
        let readback = buffer(
            "lumen compute readback",
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen compute bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.as_entire_binding(),
                },
            ],
        });

        if let Some(err) = bridge::pop_error_scope_sync(scope, &WaitPolicy::default())
            .context("failed to collect compute setup errors")?
        {
            anyhow::bail!("device rejected compute job setup: {err}");
        }

        let mut stack = ResourceStack::new();
        stack.push(Stage::Shader, "compute shader", shader)?;
        stack.push(Stage::BindGroupLayout, "compute bgl", bind_group_layout)?;
        stack.push(Stage::PipelineLayout, "compute pipeline layout", pipeline_layout)?;
        let pipeline = stack.push(Stage::Pipeline, "compute pipeline", pipeline)?;
        let input = stack.push(Stage::Buffer, "compute input", input)?;
        let output = stack.push(Stage::Buffer, "compute output", output)?;
        let readback = stack.push(Stage::Buffer, "compute readback", readback)?;
        let bind_group = stack.push(Stage::BindGroup, "compute bind group", bind_group)?;

        Ok(Self {
            stack,
            pipeline,
            input,
            output,
            readback,
            bind_group,
            len,
            workgroups,
        })
    }

    /// Number of elements processed per run.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Uploads `input`, dispatches, and blocks until the results are readable.
    pub fn run(&self, gpu: &HeadlessGpu, input: &[f32]) -> Result<Vec<f32>> {
        anyhow::ensure!(
            input.len() == self.len,
            "compute job expects {} values, got {}",
            self.len,
            input.len()
        );

        let pipeline = self.stack.get(self.pipeline).context("compute pipeline released")?;
        let bind_group = self.stack.get(self.bind_group).context("compute bind group released")?;
        let input_buffer = self.stack.get(self.input).context("compute input released")?;
        let output_buffer = self.stack.get(self.output).context("compute output released")?;
        let readback = self.stack.get(self.readback).context("compute readback released")?;

        let device = gpu.device();
        let queue = gpu.queue();

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        queue.write_buffer(input_buffer, 0, bytemuck::cast_slice(input));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen compute encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("lumen compute pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(self.workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(output_buffer, 0, readback, 0, readback.size());

        queue.submit(std::iter::once(encoder.finish()));

        if let Some(err) = bridge::pop_error_scope_sync(scope, gpu.request_policy())
            .context("failed to collect compute validation errors")?
        {
            anyhow::bail!("device rejected compute work: {err}");
        }
        log::debug!("compute dispatched: {} workgroups", self.workgroups);

        let values = read_then_unmap(
            bridge::map_read_sync(device, readback, gpu.request_policy()),
            || {
                let mapped = readback.slice(..).get_mapped_range();
                bytemuck::cast_slice::<u8, f32>(&mapped).to_vec()
            },
            || readback.unmap(),
        )
        .context("failed to map compute readback buffer")?;

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    // ── workgroups ────────────────────────────────────────────────────────

    #[test]
    fn workgroups_cover_every_element() {
        assert_eq!(workgroup_count(1, 32), Some(1));
        assert_eq!(workgroup_count(32, 32), Some(1));
        assert_eq!(workgroup_count(33, 32), Some(2));
        assert_eq!(workgroup_count(64, 32), Some(2));
        assert_eq!(workgroup_count(0, 32), Some(0));
    }

    #[test]
    fn zero_workgroup_size_does_not_divide_by_zero() {
        assert_eq!(workgroup_count(5, 0), Some(5));
    }

    #[test]
    fn default_config_matches_bundled_kernels() {
        let config = ComputeConfig::default();
        assert_eq!(config.entry_point, "main");
        assert_eq!(config.workgroup_size, 32);
    }

    // ── device limits ─────────────────────────────────────────────────────

    #[test]
    fn job_within_limits_is_sized() {
        let size = check_job_size(64, 32, &wgpu::Limits::default()).unwrap();
        assert_eq!(size, JobSize { bytes: 256, workgroups: 2 });
    }

    #[test]
    fn largest_dispatch_is_accepted() {
        let limits = wgpu::Limits::default();
        let len = 32 * limits.max_compute_workgroups_per_dimension as usize;
        let size = check_job_size(len, 32, &limits).unwrap();
        assert_eq!(size.workgroups, limits.max_compute_workgroups_per_dimension);
    }

    #[test]
    fn too_many_workgroups_is_rejected() {
        let limits = wgpu::Limits::default();
        let err = check_job_size(32 * 70_000, 32, &limits).unwrap_err();
        assert!(err.to_string().contains("max_compute_workgroups_per_dimension"), "{err}");
    }

    #[test]
    fn oversized_storage_binding_is_rejected() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 64,
            ..wgpu::Limits::default()
        };
        assert!(check_job_size(16, 32, &limits).is_ok());
        let err = check_job_size(17, 32, &limits).unwrap_err();
        assert!(err.to_string().contains("max_storage_buffer_binding_size"), "{err}");
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        let limits = wgpu::Limits {
            max_buffer_size: 40,
            ..wgpu::Limits::default()
        };
        let err = check_job_size(11, 32, &limits).unwrap_err();
        assert!(err.to_string().contains("max_buffer_size"), "{err}");
    }

    #[test]
    fn byte_size_overflow_is_rejected() {
        assert!(check_job_size(usize::MAX, 32, &wgpu::Limits::default()).is_err());
    }

    #[test]
    fn empty_job_is_rejected() {
        assert!(check_job_size(0, 32, &wgpu::Limits::default()).is_err());
    }

    // ── readback ──────────────────────────────────────────────────────────

    #[test]
    fn readback_is_unmapped_after_read() {
        let journal = RefCell::new(Vec::new());
        let values = read_then_unmap(
            Ok(()),
            || {
                journal.borrow_mut().push("read");
                vec![1.0f32, 3.0]
            },
            || journal.borrow_mut().push("unmap"),
        )
        .unwrap();

        assert_eq!(values, [1.0, 3.0]);
        assert_eq!(*journal.borrow(), ["read", "unmap"]);
    }

    #[test]
    fn failed_map_is_still_unmapped() {
        let journal = RefCell::new(Vec::new());
        let result = read_then_unmap(
            Err(RequestError::TimedOut {
                what: "buffer map",
                waited: std::time::Duration::from_millis(5),
            }),
            || journal.borrow_mut().push("read"),
            || journal.borrow_mut().push("unmap"),
        );

        assert!(matches!(result, Err(RequestError::TimedOut { .. })));
        assert_eq!(*journal.borrow(), ["unmap"]);
    }
}
