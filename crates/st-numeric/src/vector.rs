// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Fixed-size `f64` vector whose whole-vector updates run on a bound device.

use crate::backend::{DispatchRange, Kernel, ScalarOp};
use crate::device::{default_device, select_device, Device, DeviceDescriptor, DevicePreference};
use crate::{ComputeError, ComputeResult};

/// An owned, fixed-length sequence of `f64` values bound to a compute device.
///
/// The length is chosen at construction and never changes. Each scalar
/// update is a single dispatch with one work item per element.
#[derive(Clone, Debug)]
pub struct NumericVector {
    data: Vec<f64>,
    device: Device,
}

impl NumericVector {
    /// Zero-filled vector of `size` elements on the default device.
    pub fn new(size: usize) -> ComputeResult<Self> {
        Self::with_device(size, default_device())
    }

    /// Alias of [`NumericVector::new`].
    pub fn construct(size: usize) -> ComputeResult<Self> {
        Self::new(size)
    }

    /// Zero-filled vector of `size` elements bound to `device`.
    pub fn with_device(size: usize, device: Device) -> ComputeResult<Self> {
        if size == 0 {
            return Err(ComputeError::invalid(
                "size",
                "a numeric vector needs at least one element",
            ));
        }
        Ok(Self {
            data: vec![0.0; size],
            device,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; construction rejects empty vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Owned copy of the current contents.
    pub fn get_vector(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Set every element to `0.0`.
    pub fn reset(&mut self) -> ComputeResult<()> {
        self.apply(ScalarOp::Fill(0.0))
    }

    /// `a[i] += x` for every element.
    pub fn add_each_element(&mut self, x: f64) -> ComputeResult<()> {
        self.apply(ScalarOp::Add(x))
    }

    /// `a[i] -= x` for every element.
    pub fn subtract_each_element(&mut self, x: f64) -> ComputeResult<()> {
        self.apply(ScalarOp::Sub(x))
    }

    /// `a[i] *= x` for every element.
    pub fn multiply_each_element(&mut self, x: f64) -> ComputeResult<()> {
        self.apply(ScalarOp::Mul(x))
    }

    /// `a[i] /= x` for every element. Dividing by zero yields infinities or
    /// NaN as IEEE 754 prescribes; it is not an error.
    pub fn divide_each_element(&mut self, x: f64) -> ComputeResult<()> {
        self.apply(ScalarOp::Div(x))
    }

    fn apply(&mut self, op: ScalarOp) -> ComputeResult<()> {
        let range = DispatchRange::Linear(self.data.len());
        self.device.parallel_for(
            range,
            Kernel::Scalar {
                data: &mut self.data,
                op,
            },
        )
    }

    /// Rebind the vector to the device matching `preference`.
    ///
    /// On failure the current binding is kept.
    pub fn select_device(&mut self, preference: &DevicePreference) -> ComputeResult<()> {
        self.device = select_device(preference)?;
        Ok(())
    }

    /// Shorthand for `select_device(&DevicePreference::Gpu)`.
    pub fn select_gpu_device(&mut self) -> ComputeResult<()> {
        self.select_device(&DevicePreference::Gpu)
    }

    /// Bind the vector to an already resolved device.
    pub fn bind(&mut self, device: Device) {
        self.device = device;
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Descriptor of the bound device.
    pub fn describe_device(&self) -> DeviceDescriptor {
        self.device.descriptor().clone()
    }

    /// Log the bound device at `info` level.
    pub fn print_device(&self) {
        let descriptor = self.device.descriptor();
        tracing::info!(
            device = %descriptor.name,
            vendor = %descriptor.vendor,
            kind = %descriptor.kind,
            backend = %descriptor.backend,
            "{descriptor}"
        );
    }
}
