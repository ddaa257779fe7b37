// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The dispatch contract shared by every execution backend.
//!
//! Numeric components describe *what* to run as a [`Kernel`] over a
//! [`DispatchRange`]; a [`ComputeBackend`] decides *how* to spread the work
//! items across its device. Every work item touches exactly one output
//! element and all of them have completed, with results visible to the host,
//! by the time [`ComputeBackend::parallel_for`] returns.

pub mod cpu;

#[cfg(feature = "wgpu")]
pub mod wgpu;

use core::fmt;

use crate::device::DeviceDescriptor;
use crate::{ComputeError, ComputeResult};

pub use cpu::CpuBackend;

#[cfg(feature = "wgpu")]
pub use self::wgpu::WgpuBackend;

/// Index space covered by one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchRange {
    /// `n` work items indexed `0..n`.
    Linear(usize),
    /// One work item per `(row, col)` cell of a `rows x cols` grid.
    Grid { rows: usize, cols: usize },
}

impl DispatchRange {
    /// Total number of work items, or `None` when a grid overflows `usize`.
    pub fn work_items(self) -> Option<usize> {
        match self {
            DispatchRange::Linear(len) => Some(len),
            DispatchRange::Grid { rows, cols } => rows.checked_mul(cols),
        }
    }
}

impl fmt::Display for DispatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchRange::Linear(len) => write!(f, "[{len}]"),
            DispatchRange::Grid { rows, cols } => write!(f, "[{rows}x{cols}]"),
        }
    }
}

/// Scalar update applied in place to every element of a buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarOp {
    /// `a[i] = v`
    Fill(f64),
    /// `a[i] = a[i] + v`
    Add(f64),
    /// `a[i] = a[i] - v`
    Sub(f64),
    /// `a[i] = a[i] * v`
    Mul(f64),
    /// `a[i] = a[i] / v`; IEEE semantics, division by zero is not rejected.
    Div(f64),
}

impl ScalarOp {
    /// Apply the operation to a single element.
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            ScalarOp::Fill(v) => v,
            ScalarOp::Add(v) => value + v,
            ScalarOp::Sub(v) => value - v,
            ScalarOp::Mul(v) => value * v,
            ScalarOp::Div(v) => value / v,
        }
    }

    pub fn operand(self) -> f64 {
        match self {
            ScalarOp::Fill(v)
            | ScalarOp::Add(v)
            | ScalarOp::Sub(v)
            | ScalarOp::Mul(v)
            | ScalarOp::Div(v) => v,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScalarOp::Fill(_) => "fill",
            ScalarOp::Add(_) => "add",
            ScalarOp::Sub(_) => "sub",
            ScalarOp::Mul(_) => "mul",
            ScalarOp::Div(_) => "div",
        }
    }
}

/// Body executed once per work item, with the buffers it may touch.
#[derive(Debug)]
pub enum Kernel<'a> {
    /// `data[i] = op(data[i])` over a linear range.
    Scalar { data: &'a mut [f64], op: ScalarOp },
    /// `out[r*cols + c] = lhs[..] + rhs[..]` over a grid.
    Add {
        lhs: &'a [f64],
        rhs: &'a [f64],
        out: &'a mut [f64],
    },
    /// `out[r*cols + c] = sum_k lhs[r*inner + k] * rhs[k*cols + c]` over a grid.
    Multiply {
        lhs: &'a [f64],
        rhs: &'a [f64],
        out: &'a mut [f64],
        inner: usize,
    },
}

impl Kernel<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Kernel::Scalar { op, .. } => op.label(),
            Kernel::Add { .. } => "matrix_add",
            Kernel::Multiply { .. } => "matrix_multiply",
        }
    }

    /// Check that `range` covers every buffer exactly; backends call this
    /// before touching any data.
    pub fn validate(&self, range: DispatchRange, backend: &'static str) -> ComputeResult<()> {
        let mismatch = |buffer: &str, expected: usize, got: usize| {
            ComputeError::backend(
                backend,
                format!(
                    "{} dispatch over {range} expects {expected} values in '{buffer}', got {got}",
                    self.label()
                ),
            )
        };
        let product = |buffer: &str, a: usize, b: usize| {
            a.checked_mul(b).ok_or_else(|| {
                ComputeError::backend(
                    backend,
                    format!(
                        "{} dispatch over {range}: '{buffer}' extent {a}x{b} overflows usize",
                        self.label()
                    ),
                )
            })
        };
        match (self, range) {
            (Kernel::Scalar { data, .. }, DispatchRange::Linear(len)) => {
                if data.len() != len {
                    return Err(mismatch("data", len, data.len()));
                }
            }
            (Kernel::Add { lhs, rhs, out }, DispatchRange::Grid { rows, cols }) => {
                let cells = product("out", rows, cols)?;
                for (buffer, got) in [("lhs", lhs.len()), ("rhs", rhs.len()), ("out", out.len())]
                {
                    if got != cells {
                        return Err(mismatch(buffer, cells, got));
                    }
                }
            }
            (
                Kernel::Multiply {
                    lhs,
                    rhs,
                    out,
                    inner,
                },
                DispatchRange::Grid { rows, cols },
            ) => {
                for (buffer, expected, got) in [
                    ("lhs", product("lhs", rows, *inner)?, lhs.len()),
                    ("rhs", product("rhs", *inner, cols)?, rhs.len()),
                    ("out", product("out", rows, cols)?, out.len()),
                ] {
                    if expected != got {
                        return Err(mismatch(buffer, expected, got));
                    }
                }
            }
            (kernel, range) => {
                return Err(ComputeError::backend(
                    backend,
                    format!("{} cannot be dispatched over {range}", kernel.label()),
                ));
            }
        }
        Ok(())
    }
}

/// A data-parallel execution runtime bound to one device.
pub trait ComputeBackend: Send + Sync + fmt::Debug {
    /// Static description of the device this backend executes on.
    fn descriptor(&self) -> &DeviceDescriptor;

    /// Run `kernel` once per index of `range` and wait for completion.
    fn parallel_for(&self, range: DispatchRange, kernel: Kernel<'_>) -> ComputeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_ops_apply_ieee_arithmetic() {
        assert_eq!(ScalarOp::Fill(3.0).apply(9.0), 3.0);
        assert_eq!(ScalarOp::Add(1.5).apply(2.0), 3.5);
        assert_eq!(ScalarOp::Sub(1.5).apply(2.0), 0.5);
        assert_eq!(ScalarOp::Mul(4.0).apply(2.5), 10.0);
        assert_eq!(ScalarOp::Div(0.0).apply(-1.0), f64::NEG_INFINITY);
        assert!(ScalarOp::Div(0.0).apply(0.0).is_nan());
    }

    #[test]
    fn grid_range_counts_cells() {
        assert_eq!(DispatchRange::Grid { rows: 3, cols: 4 }.work_items(), Some(12));
        assert_eq!(DispatchRange::Linear(7).work_items(), Some(7));
        assert_eq!(
            DispatchRange::Grid {
                rows: usize::MAX,
                cols: 2
            }
            .work_items(),
            None
        );
        assert_eq!(DispatchRange::Grid { rows: 2, cols: 5 }.to_string(), "[2x5]");
    }

    #[test]
    fn validate_rejects_wrong_range_shape() {
        let mut data = vec![0.0; 4];
        let kernel = Kernel::Scalar {
            data: &mut data,
            op: ScalarOp::Fill(0.0),
        };
        let err = kernel
            .validate(DispatchRange::Grid { rows: 2, cols: 2 }, "test")
            .unwrap_err();
        assert!(matches!(err, ComputeError::BackendFailure { backend: "test", .. }));
    }

    #[test]
    fn validate_checks_multiply_buffers() {
        let lhs = vec![0.0; 6];
        let rhs = vec![0.0; 12];
        let mut out = vec![0.0; 8];
        let kernel = Kernel::Multiply {
            lhs: &lhs,
            rhs: &rhs,
            out: &mut out,
            inner: 3,
        };
        assert!(kernel
            .validate(DispatchRange::Grid { rows: 2, cols: 4 }, "test")
            .is_ok());
        assert!(kernel
            .validate(DispatchRange::Grid { rows: 2, cols: 3 }, "test")
            .is_err());
    }

    #[test]
    fn validate_reports_overflowing_extents() {
        let lhs = vec![0.0; 4];
        let rhs = vec![0.0; 4];
        let mut out = vec![0.0; 4];
        let huge = DispatchRange::Grid {
            rows: usize::MAX,
            cols: 2,
        };

        let add = Kernel::Add {
            lhs: &lhs,
            rhs: &rhs,
            out: &mut out,
        };
        let err = add.validate(huge, "test").unwrap_err();
        assert!(matches!(err, ComputeError::BackendFailure { backend: "test", .. }));
        assert!(err.to_string().contains("overflows usize"), "{err}");

        let multiply = Kernel::Multiply {
            lhs: &lhs,
            rhs: &rhs,
            out: &mut out,
            inner: usize::MAX,
        };
        let err = multiply
            .validate(DispatchRange::Grid { rows: 2, cols: 2 }, "test")
            .unwrap_err();
        assert!(err.to_string().contains("overflows usize"), "{err}");
    }
}
