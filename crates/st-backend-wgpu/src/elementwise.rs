// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Elementwise f64 kernels: in-place scalar updates over a vector and
//! cell-wise addition of two matrices.

use bytemuck::{Pod, Zeroable};
use wgpu::BufferUsages;

use crate::util::{empty_buffer, upload_slice, upload_uniform};
use crate::{WgpuDevice, WgpuError};

/// Width of the 1-D workgroups used by [`SCALAR_WGSL`].
pub const SCALAR_WG: u32 = 64;
/// Side of the square workgroups used by [`ADD_WGSL`].
pub const ADD_TILE: u32 = 8;

/// In-place `data[i] = data[i] OP operand`, one invocation per element.
pub const SCALAR_WGSL: &str = r#"
struct Params {
    len: u32,
    op: u32,
    _pad0: u32,
    _pad1: u32,
};

@group(0) @binding(0) var<storage, read_write> data: array<f64>;
@group(0) @binding(1) var<storage, read> operand: array<f64>;
@group(0) @binding(2) var<uniform> params: Params;

const WG: u32 = 64u;

@compute @workgroup_size(64)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) groups: vec3<u32>,
) {
    let idx = gid.y * groups.x * WG + gid.x;
    if (idx >= params.len) {
        return;
    }
    let x = operand[0];
    let a = data[idx];
    var result: f64 = a;
    switch params.op {
        case 0u: {
            result = x;
        }
        case 1u: {
            result = a + x;
        }
        case 2u: {
            result = a - x;
        }
        case 3u: {
            result = a * x;
        }
        default: {
            result = a / x;
        }
    }
    data[idx] = result;
}
"#;

/// `dst[r, c] = lhs[r, c] + rhs[r, c]` over a row-major `rows x cols` grid.
pub const ADD_WGSL: &str = r#"
struct Params {
    rows: u32,
    cols: u32,
    _pad0: u32,
    _pad1: u32,
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
    let idx = row * params.cols + col;
    dst[idx] = lhs[idx] + rhs[idx];
}
"#;

const SCALAR_LABEL: &str = "st.compute.wgpu.scalar_map";
const ADD_LABEL: &str = "st.compute.wgpu.matrix_add";

/// Scalar update applied by [`WgpuDevice::scalar_map`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKernel {
    /// Overwrite every element with the operand.
    Fill,
    Add,
    Sub,
    Mul,
    Div,
}

impl ScalarKernel {
    /// Opcode understood by [`SCALAR_WGSL`].
    pub const fn code(self) -> u32 {
        match self {
            ScalarKernel::Fill => 0,
            ScalarKernel::Add => 1,
            ScalarKernel::Sub => 2,
            ScalarKernel::Mul => 3,
            ScalarKernel::Div => 4,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
struct ScalarParams {
    len: u32,
    op: u32,
    _pad0: u32,
    _pad1: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
struct GridParams {
    rows: u32,
    cols: u32,
    _pad0: u32,
    _pad1: u32,
}

impl WgpuDevice {
    /// Apply `kernel` with `operand` to every element of `data` on the device.
    ///
    /// `data` is left untouched if the dispatch or readback fails.
    pub fn scalar_map(
        &self,
        data: &mut [f64],
        kernel: ScalarKernel,
        operand: f64,
    ) -> Result<(), WgpuError> {
        if data.is_empty() {
            return Ok(());
        }
        self.check_binding(SCALAR_LABEL, data.len())?;
        let len = data.len() as u32;
        let groups = self.linear_groups(SCALAR_LABEL, len, SCALAR_WG)?;
        let pipeline = self.pipeline(SCALAR_LABEL, SCALAR_WGSL)?;

        let device = self.device();
        let storage = upload_slice(
            device,
            "st.compute.wgpu.scalar_map.data",
            data,
            BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        );
        let operand = upload_slice(
            device,
            "st.compute.wgpu.scalar_map.operand",
            &[operand],
            BufferUsages::STORAGE,
        );
        let params = upload_uniform(
            device,
            "st.compute.wgpu.scalar_map.params",
            &ScalarParams {
                len,
                op: kernel.code(),
                _pad0: 0,
                _pad1: 0,
            },
        );

        self.submit(SCALAR_LABEL, &pipeline, &[&storage, &operand, &params], groups)?;
        self.read_into(&storage, data, SCALAR_LABEL)
    }

    /// Cell-wise sum of two row-major `rows x cols` matrices into `dst`.
    pub fn add(
        &self,
        lhs: &[f64],
        rhs: &[f64],
        dst: &mut [f64],
        rows: usize,
        cols: usize,
    ) -> Result<(), WgpuError> {
        let cells = rows * cols;
        for (buffer, got) in [("lhs", lhs.len()), ("rhs", rhs.len()), ("dst", dst.len())] {
            if got != cells {
                return Err(WgpuError::BufferLength {
                    kernel: ADD_LABEL,
                    buffer,
                    expected: cells,
                    got,
                });
            }
        }
        if cells == 0 {
            return Ok(());
        }
        self.check_binding(ADD_LABEL, cells)?;
        let (rows, cols) = (rows as u32, cols as u32);
        let groups = self.grid_groups(ADD_LABEL, rows, cols, ADD_TILE)?;
        let pipeline = self.pipeline(ADD_LABEL, ADD_WGSL)?;

        let device = self.device();
        let lhs = upload_slice(device, "st.compute.wgpu.matrix_add.lhs", lhs, BufferUsages::STORAGE);
        let rhs = upload_slice(device, "st.compute.wgpu.matrix_add.rhs", rhs, BufferUsages::STORAGE);
        let out = empty_buffer(
            device,
            "st.compute.wgpu.matrix_add.dst",
            cells,
            BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        );
        let params = upload_uniform(
            device,
            "st.compute.wgpu.matrix_add.params",
            &GridParams {
                rows,
                cols,
                _pad0: 0,
                _pad1: 0,
            },
        );

        self.submit(ADD_LABEL, &pipeline, &[&lhs, &rhs, &out, &params], groups)?;
        self.read_into(&out, dst, ADD_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_match_shader_switch() {
        assert_eq!(ScalarKernel::Fill.code(), 0);
        assert_eq!(ScalarKernel::Add.code(), 1);
        assert_eq!(ScalarKernel::Sub.code(), 2);
        assert_eq!(ScalarKernel::Mul.code(), 3);
        assert_eq!(ScalarKernel::Div.code(), 4);
    }

    #[test]
    fn params_are_uniform_sized() {
        assert_eq!(std::mem::size_of::<ScalarParams>(), 16);
        assert_eq!(std::mem::size_of::<GridParams>(), 16);
    }
}
