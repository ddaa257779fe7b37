// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::fmt;
use std::sync::Arc;

use wgpu::{Buffer, ComputePipeline, Device, Queue};

use crate::util::{self, PipelineCache, ELEMENT_BYTES};
use crate::{AdapterSummary, WgpuError};

/// An open device/queue pair together with its compiled kernels.
pub struct WgpuDevice {
    device: Arc<Device>,
    queue: Arc<Queue>,
    summary: AdapterSummary,
    pipelines: PipelineCache,
}

impl WgpuDevice {
    pub(crate) fn new(device: Arc<Device>, queue: Arc<Queue>, summary: AdapterSummary) -> Self {
        Self {
            device,
            queue,
            summary,
            pipelines: PipelineCache::new(),
        }
    }

    pub fn summary(&self) -> &AdapterSummary {
        &self.summary
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Number of kernels compiled on this device so far.
    pub fn compiled_kernels(&self) -> usize {
        self.pipelines.len()
    }

    pub(crate) fn pipeline(
        &self,
        label: &'static str,
        source: &'static str,
    ) -> Result<Arc<ComputePipeline>, WgpuError> {
        Ok(self.pipelines.get_or_compile(&self.device, label, source)?)
    }

    /// Reject buffers the device cannot bind as a single storage binding.
    pub(crate) fn check_binding(&self, kernel: &'static str, elements: usize) -> Result<(), WgpuError> {
        let limit = u64::from(self.device.limits().max_storage_buffer_binding_size);
        let bytes = elements as u64 * ELEMENT_BYTES;
        if bytes > limit || u32::try_from(elements).is_err() {
            return Err(WgpuError::Limits {
                kernel,
                work_items: elements as u64,
                limit: format!("max_storage_buffer_binding_size = {limit} bytes"),
            });
        }
        Ok(())
    }

    /// Workgroup grid for a flat dispatch of `len` items with `width`-wide groups.
    pub(crate) fn linear_groups(
        &self,
        kernel: &'static str,
        len: u32,
        width: u32,
    ) -> Result<(u32, u32), WgpuError> {
        let max = self.device.limits().max_compute_workgroups_per_dimension;
        util::linear_grid(util::ceil_div(len, width), max).ok_or_else(|| WgpuError::Limits {
            kernel,
            work_items: u64::from(len),
            limit: format!("max_compute_workgroups_per_dimension = {max}"),
        })
    }

    /// Workgroup grid for a `rows x cols` dispatch with square `tile`-wide groups.
    pub(crate) fn grid_groups(
        &self,
        kernel: &'static str,
        rows: u32,
        cols: u32,
        tile: u32,
    ) -> Result<(u32, u32), WgpuError> {
        let max = self.device.limits().max_compute_workgroups_per_dimension;
        let x = util::ceil_div(cols, tile);
        let y = util::ceil_div(rows, tile);
        if x > max || y > max {
            return Err(WgpuError::Limits {
                kernel,
                work_items: u64::from(rows) * u64::from(cols),
                limit: format!("max_compute_workgroups_per_dimension = {max}"),
            });
        }
        Ok((x, y))
    }

    /// Bind `buffers` in order to group 0, dispatch once and wait for the queue.
    pub(crate) fn submit(
        &self,
        kernel: &'static str,
        pipeline: &ComputePipeline,
        buffers: &[&Buffer],
        groups: (u32, u32),
    ) -> Result<(), WgpuError> {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel),
            layout: &layout,
            entries: &entries,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups.0, groups.1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        let drained = self.device.poll(wgpu::Maintain::Wait).is_queue_empty();

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(WgpuError::Submission {
                kernel,
                message: err.to_string(),
            });
        }
        tracing::trace!(
            kernel,
            groups_x = groups.0,
            groups_y = groups.1,
            drained,
            "wgpu dispatch complete"
        );
        Ok(())
    }

    /// Copy `buffer` back into `dst` after the preceding dispatch.
    pub(crate) fn read_into(
        &self,
        buffer: &Buffer,
        dst: &mut [f64],
        label: &'static str,
    ) -> Result<(), WgpuError> {
        util::read_buffer(&self.device, &self.queue, buffer, dst, label)
    }
}

impl fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("summary", &self.summary)
            .field("pipelines", &self.pipelines)
            .finish()
    }
}
