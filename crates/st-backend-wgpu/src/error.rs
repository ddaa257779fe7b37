// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

use crate::ShaderLoadError;

/// Failures raised while opening a WGPU device or running one of its kernels.
#[derive(Debug, Error)]
pub enum WgpuError {
    /// The adapter does not expose `SHADER_F64`, so the f64 kernels cannot run.
    #[error("adapter '{adapter}' does not support 64-bit floating point shaders")]
    MissingF64 { adapter: String },
    /// `request_device` was rejected by the driver.
    #[error("failed to open device on adapter '{adapter}'")]
    RequestDevice {
        adapter: String,
        #[source]
        source: wgpu::RequestDeviceError,
    },
    /// A kernel shader could not be compiled.
    #[error(transparent)]
    Shader(#[from] ShaderLoadError),
    /// A dispatch would exceed the device's buffer or workgroup limits.
    #[error("{kernel} dispatch over {work_items} work items exceeds device limits ({limit})")]
    Limits {
        kernel: &'static str,
        work_items: u64,
        limit: String,
    },
    /// Host buffers disagree with the dispatch geometry.
    #[error("{kernel} expected {expected} elements in '{buffer}', got {got}")]
    BufferLength {
        kernel: &'static str,
        buffer: &'static str,
        expected: usize,
        got: usize,
    },
    /// WGPU reported a validation or out-of-memory error for the submission.
    #[error("{kernel} submission rejected by device: {message}")]
    Submission {
        kernel: &'static str,
        message: String,
    },
    /// The staging buffer could not be mapped for readback.
    #[error("failed to read back '{label}': {message}")]
    Readback { label: &'static str, message: String },
}
