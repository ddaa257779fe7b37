// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Adapter discovery and device creation.

use std::fmt;
use std::sync::Arc;

use crate::{WgpuDevice, WgpuError};

/// Static description of a WGPU adapter, captured without opening a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterSummary {
    pub name: String,
    pub vendor: String,
    pub vendor_id: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
    pub supports_f64: bool,
}

impl AdapterSummary {
    fn from_adapter(adapter: &wgpu::Adapter) -> Self {
        let info = adapter.get_info();
        Self {
            vendor: vendor_name(info.vendor, &info.driver),
            name: info.name,
            vendor_id: info.vendor,
            device_type: info.device_type,
            backend: info.backend,
            supports_f64: adapter.features().contains(wgpu::Features::SHADER_F64),
        }
    }

    /// Lower-case backend label such as `vulkan` or `metal`.
    pub fn backend_label(&self) -> &'static str {
        match self.backend {
            wgpu::Backend::Empty => "empty",
            wgpu::Backend::Vulkan => "vulkan",
            wgpu::Backend::Metal => "metal",
            wgpu::Backend::Dx12 => "dx12",
            wgpu::Backend::Gl => "gl",
            wgpu::Backend::BrowserWebGpu => "webgpu",
            #[allow(unreachable_patterns)]
            _ => "other",
        }
    }

    /// Whether the adapter is backed by real or virtualised GPU hardware.
    pub fn is_gpu(&self) -> bool {
        matches!(
            self.device_type,
            wgpu::DeviceType::DiscreteGpu
                | wgpu::DeviceType::IntegratedGpu
                | wgpu::DeviceType::VirtualGpu
        )
    }
}

/// Map a PCI vendor id to a readable name, falling back to the driver string.
pub fn vendor_name(vendor_id: u32, driver: &str) -> String {
    let known = match vendor_id {
        0x10de => Some("NVIDIA"),
        0x1002 | 0x1022 => Some("AMD"),
        0x8086 => Some("Intel"),
        0x106b => Some("Apple"),
        0x13b5 => Some("ARM"),
        0x5143 => Some("Qualcomm"),
        0x1010 => Some("Imagination Technologies"),
        0x10005 => Some("Mesa"),
        _ => None,
    };
    match known {
        Some(name) => name.to_string(),
        None if !driver.trim().is_empty() => driver.trim().to_string(),
        None => format!("0x{vendor_id:04x}"),
    }
}

/// A discovered adapter that can be turned into a [`WgpuDevice`].
#[derive(Clone)]
pub struct WgpuAdapter {
    adapter: Arc<wgpu::Adapter>,
    summary: AdapterSummary,
}

impl WgpuAdapter {
    /// Enumerate every adapter visible to the native backends.
    pub fn enumerate() -> Vec<WgpuAdapter> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapters: Vec<WgpuAdapter> = instance
            .enumerate_adapters(wgpu::Backends::all())
            .into_iter()
            .map(|adapter| {
                let summary = AdapterSummary::from_adapter(&adapter);
                WgpuAdapter {
                    adapter: Arc::new(adapter),
                    summary,
                }
            })
            .collect();
        tracing::debug!(count = adapters.len(), "enumerated wgpu adapters");
        adapters
    }

    /// Enumerate only the adapters able to run the f64 kernels.
    pub fn enumerate_f64() -> Vec<WgpuAdapter> {
        Self::enumerate()
            .into_iter()
            .filter(|adapter| adapter.summary.supports_f64)
            .collect()
    }

    pub fn summary(&self) -> &AdapterSummary {
        &self.summary
    }

    /// Open a device and queue on this adapter with `SHADER_F64` enabled.
    pub fn open(&self) -> Result<WgpuDevice, WgpuError> {
        if !self.summary.supports_f64 {
            return Err(WgpuError::MissingF64 {
                adapter: self.summary.name.clone(),
            });
        }

        let (device, queue) = pollster::block_on(self.adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("st.compute.wgpu.device"),
                required_features: wgpu::Features::SHADER_F64,
                required_limits: self.adapter.limits(),
            },
            None,
        ))
        .map_err(|source| WgpuError::RequestDevice {
            adapter: self.summary.name.clone(),
            source,
        })?;

        let adapter_name = self.summary.name.clone();
        device.on_uncaptured_error(Box::new(move |err: wgpu::Error| {
            tracing::error!(adapter = %adapter_name, "uncaptured wgpu error: {err}");
        }));

        tracing::info!(
            adapter = %self.summary.name,
            backend = self.summary.backend_label(),
            "opened wgpu device"
        );
        Ok(WgpuDevice::new(
            Arc::new(device),
            Arc::new(queue),
            self.summary.clone(),
        ))
    }
}

impl fmt::Debug for WgpuAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuAdapter")
            .field("summary", &self.summary)
            .finish()
    }
}
