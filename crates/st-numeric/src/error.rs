// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Errors emitted by vectors, matrix kernels and device selection.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ComputeError {
    /// A constructor or parser received an unusable argument.
    #[error("invalid argument '{label}': {message}")]
    InvalidArgument {
        label: &'static str,
        message: String,
    },
    /// A flattened matrix does not hold the number of values its dimensions declare.
    #[error("{label} holds {got} values but its {rows}x{cols} shape requires {expected}")]
    DimensionMismatch {
        label: &'static str,
        rows: usize,
        cols: usize,
        expected: usize,
        got: usize,
    },
    /// No device satisfies the requested preference.
    #[error("no compute device matches preference '{preference}'")]
    DeviceUnavailable { preference: String },
    /// Execution failed on the bound backend; no partial result was kept.
    #[error("{backend} backend failure: {message}")]
    BackendFailure {
        backend: &'static str,
        message: String,
    },
}

impl ComputeError {
    pub(crate) fn invalid(label: &'static str, message: impl Into<String>) -> Self {
        ComputeError::InvalidArgument {
            label,
            message: message.into(),
        }
    }

    pub(crate) fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        ComputeError::BackendFailure {
            backend,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_reports_shape() {
        let err = ComputeError::DimensionMismatch {
            label: "lhs",
            rows: 2,
            cols: 3,
            expected: 6,
            got: 5,
        };
        assert_eq!(
            err.to_string(),
            "lhs holds 5 values but its 2x3 shape requires 6"
        );
    }

    #[test]
    fn backend_failure_names_backend() {
        let err = ComputeError::backend("wgpu", "device lost");
        assert_eq!(err.to_string(), "wgpu backend failure: device lost");
    }
}
