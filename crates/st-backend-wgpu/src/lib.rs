// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Double-precision WGPU compute kernels used by SpiralCompute.
//! The crate discovers `SHADER_F64` capable adapters, compiles the inline
//! WGSL kernels once per device and runs each dispatch to completion before
//! returning results to the host.

pub mod adapter;
pub mod elementwise;
pub mod matmul;

mod device;
mod error;
mod util;

pub use adapter::{vendor_name, AdapterSummary, WgpuAdapter};
pub use device::WgpuDevice;
pub use elementwise::{ScalarKernel, ADD_WGSL, SCALAR_WGSL};
pub use error::WgpuError;
pub use matmul::MATMUL_WGSL;
pub use util::{PipelineCache, ShaderLoadError};

pub use wgpu;
