// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Device-parallel `f64` primitives: a fixed-size [`NumericVector`] with
//! whole-vector scalar updates and the [`matrix`] add / multiply kernels.
//!
//! Work is dispatched through a [`ComputeBackend`](backend::ComputeBackend).
//! The rayon host backend is always available; enable the `wgpu` feature to
//! run the same kernels on GPUs that support 64-bit float shaders.

pub mod backend;
pub mod device;
pub mod matrix;
pub mod vector;

mod error;

use std::sync::OnceLock;

use spiral_config::tracing::{self as config_tracing, InitError};

pub use spiral_config::tracing::flush_chrome_trace;

pub use backend::{ComputeBackend, CpuBackend, DispatchRange, Kernel, ScalarOp};
pub use device::{
    default_device, enumerate_devices, select_device, Device, DeviceDescriptor, DeviceKind,
    DevicePreference,
};
pub use error::{ComputeError, ComputeResult};
pub use matrix::{matrix_add, matrix_multiply, MatrixShape};
pub use vector::NumericVector;

static INIT_GUARD: OnceLock<Result<(), InitError>> = OnceLock::new();

/// Ensures tracing has been initialised for the current process.
pub fn init_tracing() {
    let result = INIT_GUARD.get_or_init(|| match config_tracing::init_tracing() {
        Ok(()) => Ok(()),
        Err(InitError::AlreadyInitialised) => Ok(()),
        Err(err) => Err(err),
    });

    if let Err(err) = result {
        tracing::warn!("failed to initialise tracing subscriber: {err}");
    }
}
