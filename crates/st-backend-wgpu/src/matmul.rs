// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense f64 GEMM: one invocation per output cell, each reducing over the
//! shared inner dimension.

use bytemuck::{Pod, Zeroable};
use wgpu::BufferUsages;

use crate::util::{empty_buffer, upload_slice, upload_uniform};
use crate::{WgpuDevice, WgpuError};

/// Side of the square workgroups used by [`MATMUL_WGSL`].
pub const MATMUL_TILE: u32 = 8;

/// `dst[r, c] = sum_k lhs[r, k] * rhs[k, c]` for `lhs: rows x inner`,
/// `rhs: inner x cols`.
pub const MATMUL_WGSL: &str = r#"
struct Params {
    rows: u32,
    inner: u32,
    cols: u32,
    _pad: u32,
};

@group(0) @binding(0) var<storage, read> lhs: array<f64>;
@group(0) @binding(1) var<storage, read> rhs: array<f64>;
@group(0) @binding(2) var<storage, read_write> dst: array<f64>;
@group(0) @binding(3) var<uniform> params: Params;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let col = gid.x;
    let row = gid.y;
    if (row >= params.rows || col >= params.cols) {
        return;
    }
    var acc: f64 = f64(0.0);
    for (var k: u32 = 0u; k < params.inner; k = k + 1u) {
        acc = acc + lhs[row * params.inner + k] * rhs[k * params.cols + col];
    }
    dst[row * params.cols + col] = acc;
}
"#;

const MATMUL_LABEL: &str = "st.compute.wgpu.matmul";

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
struct MatmulParams {
    rows: u32,
    inner: u32,
    cols: u32,
    _pad: u32,
}

impl WgpuDevice {
    /// Multiply `lhs (rows x inner)` by `rhs (inner x cols)` into `dst (rows x cols)`.
    pub fn matmul(
        &self,
        lhs: &[f64],
        rhs: &[f64],
        dst: &mut [f64],
        rows: usize,
        inner: usize,
        cols: usize,
    ) -> Result<(), WgpuError> {
        for (buffer, expected, got) in [
            ("lhs", rows * inner, lhs.len()),
            ("rhs", inner * cols, rhs.len()),
            ("dst", rows * cols, dst.len()),
        ] {
            if expected != got {
                return Err(WgpuError::BufferLength {
                    kernel: MATMUL_LABEL,
                    buffer,
                    expected,
                    got,
                });
            }
        }
        if dst.is_empty() {
            return Ok(());
        }
        if inner == 0 {
            dst.fill(0.0);
            return Ok(());
        }
        for elements in [lhs.len(), rhs.len(), dst.len()] {
            self.check_binding(MATMUL_LABEL, elements)?;
        }
        let params = MatmulParams {
            rows: rows as u32,
            inner: inner as u32,
            cols: cols as u32,
            _pad: 0,
        };
        let groups = self.grid_groups(MATMUL_LABEL, params.rows, params.cols, MATMUL_TILE)?;
        let pipeline = self.pipeline(MATMUL_LABEL, MATMUL_WGSL)?;

        let device = self.device();
        let lhs = upload_slice(device, "st.compute.wgpu.matmul.lhs", lhs, BufferUsages::STORAGE);
        let rhs = upload_slice(device, "st.compute.wgpu.matmul.rhs", rhs, BufferUsages::STORAGE);
        let out = empty_buffer(
            device,
            "st.compute.wgpu.matmul.dst",
            dst.len(),
            BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        );
        let params = upload_uniform(device, "st.compute.wgpu.matmul.params", &params);

        self.submit(MATMUL_LABEL, &pipeline, &[&lhs, &rhs, &out, &params], groups)?;
        self.read_into(&out, dst, MATMUL_LABEL)
    }
}
