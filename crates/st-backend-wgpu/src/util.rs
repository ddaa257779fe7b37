// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::{
    any::Any,
    borrow::Cow,
    collections::HashMap,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex},
};

use thiserror::Error;
use wgpu::util::DeviceExt;
use wgpu::{
    Buffer, BufferUsages, ComputePipeline, ComputePipelineDescriptor, Device, MapMode, Queue,
    ShaderModuleDescriptor, ShaderSource,
};

use crate::WgpuError;

/// Size in bytes of one element in every kernel buffer.
pub const ELEMENT_BYTES: u64 = std::mem::size_of::<f64>() as u64;

/// Errors that may occur when turning inline WGSL into a compute pipeline.
#[derive(Debug, Error)]
pub enum ShaderLoadError {
    /// WGSL failed to compile or validate when creating a shader module.
    #[error("failed to compile WGSL shader '{label}'")]
    Compile {
        /// Label assigned to the shader module.
        label: String,
        /// Underlying error reported by WGPU.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug)]
struct ShaderCompileError(String);

impl fmt::Display for ShaderCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ShaderCompileError {}

fn panic_payload_to_string(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Per-device memo of compiled kernels keyed by their label.
///
/// Every kernel in this crate is a single inline WGSL module with a `main`
/// entry point and an automatically derived bind group layout, so the label
/// alone identifies the pipeline.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: Mutex<HashMap<&'static str, Arc<ComputePipeline>>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pipeline for `label`, compiling `source` on first use.
    pub fn get_or_compile(
        &self,
        device: &Device,
        label: &'static str,
        source: &'static str,
    ) -> Result<Arc<ComputePipeline>, ShaderLoadError> {
        let mut pipelines = self
            .pipelines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pipeline) = pipelines.get(label) {
            return Ok(Arc::clone(pipeline));
        }

        let pipeline = compile_pipeline(device, label, source)?;
        tracing::debug!(kernel = label, "compiled wgpu pipeline");
        pipelines.insert(label, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Number of pipelines compiled so far.
    pub fn len(&self) -> usize {
        self.pipelines
            .lock()
            .map(|pipelines| pipelines.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PipelineCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineCache")
            .field("pipelines", &self.len())
            .finish()
    }
}

fn compile_pipeline(
    device: &Device,
    label: &'static str,
    source: &'static str,
) -> Result<Arc<ComputePipeline>, ShaderLoadError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let compiled = catch_unwind(AssertUnwindSafe(|| {
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(Cow::Borrowed(source)),
        });
        Arc::new(device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(label),
            layout: None,
            module: &module,
            entry_point: "main",
            compilation_options: Default::default(),
        }))
    }));
    let scope = pollster::block_on(device.pop_error_scope());

    let compile_error = |message: String| ShaderLoadError::Compile {
        label: label.to_string(),
        source: Box::new(ShaderCompileError(message)),
    };
    let pipeline = compiled.map_err(|payload| compile_error(panic_payload_to_string(payload)))?;
    match scope {
        Some(err) => Err(compile_error(err.to_string())),
        None => Ok(pipeline),
    }
}

/// Create a storage buffer initialised with the provided `f64` slice.
pub fn upload_slice(device: &Device, label: &str, data: &[f64], usage: BufferUsages) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage,
    })
}

/// Create a uniform buffer holding a single `Pod` parameter block.
pub fn upload_uniform<T: bytemuck::Pod>(device: &Device, label: &str, params: &T) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(params),
        usage: BufferUsages::UNIFORM,
    })
}

/// Allocate an uninitialised storage buffer sized to `elements` `f64` values.
pub fn empty_buffer(device: &Device, label: &str, elements: usize, usage: BufferUsages) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: elements as u64 * ELEMENT_BYTES,
        usage,
        mapped_at_creation: false,
    })
}

/// Copy `buffer` into host memory, blocking until the device has finished.
///
/// `dst` is only written once the staging copy has been mapped successfully.
pub fn read_buffer(
    device: &Device,
    queue: &Queue,
    buffer: &Buffer,
    dst: &mut [f64],
    label: &'static str,
) -> Result<(), WgpuError> {
    let size = dst.len() as u64 * ELEMENT_BYTES;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("st.compute.wgpu.readback"),
        size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("st.compute.wgpu.readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    slice.map_async(MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    // Blocks until the map callback has fired; the queue state is not needed.
    let _ = device.poll(wgpu::Maintain::Wait);
    futures_lite::future::block_on(async {
        receiver
            .receive()
            .await
            .ok_or_else(|| WgpuError::Readback {
                label,
                message: "map_async was cancelled".to_string(),
            })?
            .map_err(|err| WgpuError::Readback {
                label,
                message: err.to_string(),
            })
    })?;

    let data = slice.get_mapped_range();
    dst.copy_from_slice(bytemuck::cast_slice(&data));
    drop(data);
    staging.unmap();
    Ok(())
}

/// Number of workgroups required to cover `len` items with groups of `width`.
pub fn ceil_div(len: u32, width: u32) -> u32 {
    len.div_ceil(width.max(1))
}

/// Fold a 1-D workgroup count into an `(x, y)` grid that respects the
/// per-dimension limit. Kernels recover the flat index as
/// `gid.y * num_workgroups.x * WG + gid.x`.
pub fn linear_grid(groups: u32, max_per_dim: u32) -> Option<(u32, u32)> {
    let max_per_dim = max_per_dim.max(1);
    if groups <= max_per_dim {
        return Some((groups.max(1), 1));
    }
    let y = ceil_div(groups, max_per_dim);
    (y <= max_per_dim).then_some((max_per_dim, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_div_rounds_up() {
        assert_eq!(ceil_div(0, 64), 0);
        assert_eq!(ceil_div(1, 64), 1);
        assert_eq!(ceil_div(64, 64), 1);
        assert_eq!(ceil_div(65, 64), 2);
        assert_eq!(ceil_div(7, 0), 7);
    }

    #[test]
    fn linear_grid_stays_one_dimensional_when_possible() {
        assert_eq!(linear_grid(10, 65_535), Some((10, 1)));
        assert_eq!(linear_grid(0, 65_535), Some((1, 1)));
    }

    #[test]
    fn linear_grid_folds_large_counts() {
        let (x, y) = linear_grid(200_000, 65_535).expect("fits in two dimensions");
        assert_eq!(x, 65_535);
        assert_eq!(y, 4);
        assert!(u64::from(x) * u64::from(y) >= 200_000);
    }

    #[test]
    fn linear_grid_rejects_overflowing_counts() {
        assert_eq!(linear_grid(u32::MAX, 16), None);
    }
}
