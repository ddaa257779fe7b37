// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use rayon::{current_num_threads, prelude::*};
use spiral_config::ComputeConfig;

use super::{ComputeBackend, DispatchRange, Kernel, ScalarOp};
use crate::device::{DeviceDescriptor, DeviceKind};
use crate::ComputeResult;

const BACKEND: &str = "rayon";

/// Host backend that fans work items out over the global rayon pool.
///
/// Small dispatches, and every dispatch in deterministic mode, run on the
/// calling thread instead.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    descriptor: DeviceDescriptor,
    config: ComputeConfig,
}

impl CpuBackend {
    /// Backend using the process-wide configuration snapshot.
    pub fn new() -> Self {
        Self::with_config(spiral_config::config().clone())
    }

    pub fn with_config(config: ComputeConfig) -> Self {
        let descriptor = DeviceDescriptor {
            name: format!("host ({} threads)", current_num_threads()),
            vendor: host_vendor().to_string(),
            kind: DeviceKind::Cpu,
            backend: BACKEND.to_string(),
        };
        Self { descriptor, config }
    }

    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn host_vendor() -> &'static str {
    if cfg!(target_arch = "x86_64") || cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "aarch64") || cfg!(target_arch = "arm") {
        "arm"
    } else {
        std::env::consts::ARCH
    }
}

impl ComputeBackend for CpuBackend {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn parallel_for(&self, range: DispatchRange, kernel: Kernel<'_>) -> ComputeResult<()> {
        kernel.validate(range, BACKEND)?;
        // `validate` has already rejected grids whose cell count overflows.
        let parallel = self
            .config
            .parallel_for(range.work_items().unwrap_or(usize::MAX));
        tracing::debug!(
            kernel = kernel.label(),
            %range,
            parallel,
            backend = BACKEND,
            "dispatch"
        );

        match (kernel, range) {
            (Kernel::Scalar { data, op }, _) => scalar(data, op, parallel),
            (Kernel::Add { lhs, rhs, out }, _) => add(lhs, rhs, out, parallel),
            (
                Kernel::Multiply {
                    lhs,
                    rhs,
                    out,
                    inner,
                },
                DispatchRange::Grid { cols, .. },
            ) => multiply(lhs, rhs, out, inner, cols, parallel),
            // `validate` already rejected multiply over a linear range.
            (Kernel::Multiply { .. }, DispatchRange::Linear(_)) => {}
        }
        Ok(())
    }
}

fn scalar(data: &mut [f64], op: ScalarOp, parallel: bool) {
    if parallel {
        data.par_iter_mut().for_each(|value| *value = op.apply(*value));
    } else {
        data.iter_mut().for_each(|value| *value = op.apply(*value));
    }
}

fn add(lhs: &[f64], rhs: &[f64], out: &mut [f64], parallel: bool) {
    if parallel {
        out.par_iter_mut()
            .zip(lhs.par_iter().zip(rhs.par_iter()))
            .for_each(|(dst, (a, b))| *dst = a + b);
    } else {
        for (dst, (a, b)) in out.iter_mut().zip(lhs.iter().zip(rhs.iter())) {
            *dst = a + b;
        }
    }
}

#[inline]
fn multiply_row(dst_row: &mut [f64], lhs_row: &[f64], rhs: &[f64], cols: usize) {
    for (col, dst) in dst_row.iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for (k, &a) in lhs_row.iter().enumerate() {
            acc += a * rhs[k * cols + col];
        }
        *dst = acc;
    }
}

fn multiply(lhs: &[f64], rhs: &[f64], out: &mut [f64], inner: usize, cols: usize, parallel: bool) {
    if out.is_empty() {
        return;
    }
    if inner == 0 {
        out.fill(0.0);
        return;
    }
    if parallel {
        out.par_chunks_mut(cols)
            .zip(lhs.par_chunks(inner))
            .for_each(|(dst_row, lhs_row)| multiply_row(dst_row, lhs_row, rhs, cols));
    } else {
        for (dst_row, lhs_row) in out.chunks_mut(cols).zip(lhs.chunks(inner)) {
            multiply_row(dst_row, lhs_row, rhs, cols);
        }
    }
}
