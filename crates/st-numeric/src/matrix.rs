// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Matrix kernels over flattened row-major `f64` buffers.
//!
//! Inputs are validated against their declared dimensions before anything is
//! dispatched, and every call returns a freshly allocated result.

use core::fmt;

use crate::backend::{DispatchRange, Kernel};
use crate::device::{default_device, Device};
use crate::{ComputeError, ComputeResult};

/// Dimensions of a row-major matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatrixShape {
    pub rows: usize,
    pub cols: usize,
}

impl MatrixShape {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of cells, or an error when `rows * cols` overflows.
    pub fn len(&self) -> ComputeResult<usize> {
        self.rows.checked_mul(self.cols).ok_or_else(|| {
            ComputeError::invalid("matrix_shape", format!("{self} overflows usize"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Ensure `data` holds exactly `rows * cols` values.
    pub fn check(&self, label: &'static str, data: &[f64]) -> ComputeResult<()> {
        let expected = self.len()?;
        if data.len() != expected {
            return Err(ComputeError::DimensionMismatch {
                label,
                rows: self.rows,
                cols: self.cols,
                expected,
                got: data.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MatrixShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Cell-wise sum of two `rows x cols` matrices on `device`.
pub fn add(
    device: &Device,
    lhs: &[f64],
    rhs: &[f64],
    rows: usize,
    cols: usize,
) -> ComputeResult<Vec<f64>> {
    let shape = MatrixShape::new(rows, cols);
    shape.check("lhs", lhs)?;
    shape.check("rhs", rhs)?;

    let mut out = vec![0.0; shape.len()?];
    if shape.is_empty() {
        return Ok(out);
    }
    device.parallel_for(
        DispatchRange::Grid { rows, cols },
        Kernel::Add {
            lhs,
            rhs,
            out: &mut out,
        },
    )?;
    Ok(out)
}

/// Product of `lhs (rows x inner)` and `rhs (inner x cols)` on `device`,
/// returned as a `rows x cols` matrix.
pub fn multiply(
    device: &Device,
    lhs: &[f64],
    rhs: &[f64],
    rows: usize,
    inner: usize,
    cols: usize,
) -> ComputeResult<Vec<f64>> {
    MatrixShape::new(rows, inner).check("lhs", lhs)?;
    MatrixShape::new(inner, cols).check("rhs", rhs)?;
    let shape = MatrixShape::new(rows, cols);

    let mut out = vec![0.0; shape.len()?];
    if shape.is_empty() || inner == 0 {
        return Ok(out);
    }
    device.parallel_for(
        DispatchRange::Grid { rows, cols },
        Kernel::Multiply {
            lhs,
            rhs,
            out: &mut out,
            inner,
        },
    )?;
    Ok(out)
}

/// [`add`] on the default device.
pub fn matrix_add(lhs: &[f64], rhs: &[f64], rows: usize, cols: usize) -> ComputeResult<Vec<f64>> {
    add(&default_device(), lhs, rhs, rows, cols)
}

/// [`multiply`] on the default device.
pub fn matrix_multiply(
    lhs: &[f64],
    rhs: &[f64],
    rows: usize,
    inner: usize,
    cols: usize,
) -> ComputeResult<Vec<f64>> {
    multiply(&default_device(), lhs, rhs, rows, inner, cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_check_reports_expected_length() {
        let err = MatrixShape::new(2, 3).check("lhs", &[0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            ComputeError::DimensionMismatch {
                label: "lhs",
                rows: 2,
                cols: 3,
                expected: 6,
                got: 5,
            }
        );
    }

    #[test]
    fn overflowing_shape_is_invalid() {
        let err = MatrixShape::new(usize::MAX, 2).len().unwrap_err();
        assert!(matches!(err, ComputeError::InvalidArgument { .. }));
    }

    #[test]
    fn empty_matrices_skip_dispatch() {
        let host = Device::host();
        assert_eq!(add(&host, &[], &[], 0, 4).unwrap(), Vec::<f64>::new());
        assert_eq!(multiply(&host, &[], &[0.0; 3], 0, 1, 3).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn zero_inner_dimension_yields_zero_matrix() {
        let out = multiply(&Device::host(), &[], &[], 2, 0, 3).unwrap();
        assert_eq!(out, vec![0.0; 6]);
    }

    #[test]
    fn multiply_rejects_rhs_with_wrong_length() {
        let err = multiply(&Device::host(), &[1.0; 4], &[1.0; 5], 2, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::DimensionMismatch {
                label: "rhs",
                expected: 4,
                got: 5,
                ..
            }
        ));
    }
}
