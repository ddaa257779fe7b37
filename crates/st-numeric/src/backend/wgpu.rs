// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

#![cfg(feature = "wgpu")]

use st_backend_wgpu::wgpu::DeviceType;
use st_backend_wgpu::{AdapterSummary, ScalarKernel, WgpuAdapter, WgpuDevice, WgpuError};

use super::{ComputeBackend, DispatchRange, Kernel, ScalarOp};
use crate::device::{DeviceDescriptor, DeviceKind};
use crate::{ComputeError, ComputeResult};

const BACKEND: &str = "wgpu";

/// GPU backend running the f64 WGSL kernels of `st-backend-wgpu`.
#[derive(Debug)]
pub struct WgpuBackend {
    device: WgpuDevice,
    descriptor: DeviceDescriptor,
}

impl WgpuBackend {
    /// Open a device on `adapter`.
    pub fn open(adapter: &WgpuAdapter) -> ComputeResult<Self> {
        let device = adapter.open().map_err(backend_failure)?;
        let descriptor = descriptor_for(device.summary());
        Ok(Self { device, descriptor })
    }

    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }
}

pub(crate) fn descriptor_for(summary: &AdapterSummary) -> DeviceDescriptor {
    let kind = match summary.device_type {
        DeviceType::DiscreteGpu => DeviceKind::DiscreteGpu,
        DeviceType::IntegratedGpu => DeviceKind::IntegratedGpu,
        DeviceType::VirtualGpu => DeviceKind::VirtualGpu,
        DeviceType::Cpu => DeviceKind::Cpu,
        DeviceType::Other => DeviceKind::Other,
    };
    DeviceDescriptor {
        name: summary.name.clone(),
        vendor: summary.vendor.clone(),
        kind,
        backend: summary.backend_label().to_string(),
    }
}

fn backend_failure(err: WgpuError) -> ComputeError {
    ComputeError::backend(BACKEND, err.to_string())
}

fn scalar_kernel(op: ScalarOp) -> ScalarKernel {
    match op {
        ScalarOp::Fill(_) => ScalarKernel::Fill,
        ScalarOp::Add(_) => ScalarKernel::Add,
        ScalarOp::Sub(_) => ScalarKernel::Sub,
        ScalarOp::Mul(_) => ScalarKernel::Mul,
        ScalarOp::Div(_) => ScalarKernel::Div,
    }
}

impl ComputeBackend for WgpuBackend {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn parallel_for(&self, range: DispatchRange, kernel: Kernel<'_>) -> ComputeResult<()> {
        kernel.validate(range, BACKEND)?;
        tracing::debug!(
            kernel = kernel.label(),
            %range,
            adapter = %self.descriptor.name,
            backend = BACKEND,
            "dispatch"
        );

        let result = match (kernel, range) {
            (Kernel::Scalar { data, op }, _) => {
                self.device.scalar_map(data, scalar_kernel(op), op.operand())
            }
            (Kernel::Add { lhs, rhs, out }, DispatchRange::Grid { rows, cols }) => {
                self.device.add(lhs, rhs, out, rows, cols)
            }
            (
                Kernel::Multiply {
                    lhs,
                    rhs,
                    out,
                    inner,
                },
                DispatchRange::Grid { rows, cols },
            ) => self.device.matmul(lhs, rhs, out, rows, inner, cols),
            (kernel, range) => {
                return Err(ComputeError::backend(
                    BACKEND,
                    format!("{} cannot be dispatched over {range}", kernel.label()),
                ))
            }
        };
        result.map_err(backend_failure)
    }
}
