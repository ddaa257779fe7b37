// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Device discovery and selection.
//!
//! The host device is always present. With the `wgpu` feature every adapter
//! that exposes `SHADER_F64` is listed after it; those adapters are only
//! opened the first time a preference resolves to them, and the opened
//! handle is shared by every later selection.

use core::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

#[cfg(feature = "wgpu")]
use st_backend_wgpu::WgpuAdapter;

use crate::backend::{ComputeBackend, CpuBackend, DispatchRange, Kernel};
use crate::{ComputeError, ComputeResult};

/// Broad hardware class of a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Cpu,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Other,
}

impl DeviceKind {
    pub fn is_gpu(self) -> bool {
        matches!(
            self,
            DeviceKind::IntegratedGpu | DeviceKind::DiscreteGpu | DeviceKind::VirtualGpu
        )
    }

    fn label(self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::IntegratedGpu => "integrated-gpu",
            DeviceKind::DiscreteGpu => "discrete-gpu",
            DeviceKind::VirtualGpu => "virtual-gpu",
            DeviceKind::Other => "other",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Diagnostic description of a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub vendor: String,
    pub kind: DeviceKind,
    /// Runtime driving the device, e.g. `rayon` or `vulkan`.
    pub backend: String,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DEVICE: {}\nVENDOR: {}", self.name, self.vendor)
    }
}

/// What kind of device a caller wants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DevicePreference {
    /// A GPU when one is usable, otherwise the host.
    Any,
    /// A CPU device.
    Cpu,
    /// A GPU device. Never falls back to the host.
    Gpu,
    /// First device whose name or vendor contains the string, ignoring case.
    Named(String),
}

impl DevicePreference {
    /// Whether `descriptor` satisfies this preference.
    pub fn matches(&self, descriptor: &DeviceDescriptor) -> bool {
        match self {
            DevicePreference::Any => true,
            DevicePreference::Cpu => descriptor.kind == DeviceKind::Cpu,
            DevicePreference::Gpu => descriptor.kind.is_gpu(),
            DevicePreference::Named(needle) => {
                let needle = needle.to_lowercase();
                descriptor.name.to_lowercase().contains(&needle)
                    || descriptor.vendor.to_lowercase().contains(&needle)
            }
        }
    }

    /// Candidates matching this preference, in the order they should be tried.
    fn rank<'a>(&self, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
        let mut matching: Vec<&Candidate> = candidates
            .iter()
            .filter(|candidate| self.matches(&candidate.descriptor))
            .collect();
        if *self == DevicePreference::Any {
            // Stable sort keeps enumeration order within each class.
            matching.sort_by_key(|candidate| !candidate.descriptor.kind.is_gpu());
        }
        matching
    }
}

impl FromStr for DevicePreference {
    type Err = ComputeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let prefix = trimmed.get(..5);
        if let Some(name) = prefix
            .filter(|tag| tag.eq_ignore_ascii_case("name:"))
            .map(|tag| &trimmed[tag.len()..])
        {
            let name = name.trim();
            if name.is_empty() {
                return Err(ComputeError::invalid(
                    "device_preference",
                    "'name:' requires a non-empty device name",
                ));
            }
            return Ok(DevicePreference::Named(name.to_string()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "any" | "default" => Ok(DevicePreference::Any),
            "cpu" | "host" => Ok(DevicePreference::Cpu),
            "gpu" => Ok(DevicePreference::Gpu),
            other => Err(ComputeError::invalid(
                "device_preference",
                format!("unknown tag '{other}', expected any, cpu, gpu or name:<device>"),
            )),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::Any => f.write_str("any"),
            DevicePreference::Cpu => f.write_str("cpu"),
            DevicePreference::Gpu => f.write_str("gpu"),
            DevicePreference::Named(name) => write!(f, "name:{name}"),
        }
    }
}

/// Shared handle to a backend bound to one device.
#[derive(Clone)]
pub struct Device {
    backend: Arc<dyn ComputeBackend>,
}

impl Device {
    /// Wrap an arbitrary backend.
    pub fn from_backend(backend: Arc<dyn ComputeBackend>) -> Self {
        Self { backend }
    }

    /// The process-wide host device.
    pub fn host() -> Device {
        static HOST: OnceLock<Device> = OnceLock::new();
        HOST.get_or_init(|| Device::from_backend(Arc::new(CpuBackend::new())))
            .clone()
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        self.backend.descriptor()
    }

    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    /// Submit one dispatch and wait for it.
    pub fn parallel_for(&self, range: DispatchRange, kernel: Kernel<'_>) -> ComputeResult<()> {
        self.backend.parallel_for(range, kernel)
    }

    /// Whether both handles point at the same backend instance.
    pub fn same_device(&self, other: &Device) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("descriptor", self.descriptor())
            .finish()
    }
}

struct Candidate {
    descriptor: DeviceDescriptor,
    source: CandidateSource,
}

enum CandidateSource {
    Host,
    #[cfg(feature = "wgpu")]
    Wgpu {
        adapter: WgpuAdapter,
        opened: OnceLock<ComputeResult<Device>>,
    },
}

impl Candidate {
    fn open(&self) -> ComputeResult<Device> {
        match &self.source {
            CandidateSource::Host => Ok(Device::host()),
            #[cfg(feature = "wgpu")]
            CandidateSource::Wgpu { adapter, opened } => opened
                .get_or_init(|| {
                    crate::backend::WgpuBackend::open(adapter)
                        .map(|backend| Device::from_backend(Arc::new(backend)))
                })
                .clone(),
        }
    }
}

fn candidates() -> &'static [Candidate] {
    static CANDIDATES: OnceLock<Vec<Candidate>> = OnceLock::new();
    CANDIDATES.get_or_init(|| {
        #[allow(unused_mut)]
        let mut found = vec![Candidate {
            descriptor: Device::host().descriptor().clone(),
            source: CandidateSource::Host,
        }];
        #[cfg(feature = "wgpu")]
        found.extend(WgpuAdapter::enumerate_f64().into_iter().map(|adapter| Candidate {
            descriptor: crate::backend::wgpu::descriptor_for(adapter.summary()),
            source: CandidateSource::Wgpu {
                adapter,
                opened: OnceLock::new(),
            },
        }));
        tracing::debug!(count = found.len(), "discovered compute devices");
        found
    })
}

/// Every usable device, host first.
pub fn enumerate_devices() -> Vec<DeviceDescriptor> {
    candidates()
        .iter()
        .map(|candidate| candidate.descriptor.clone())
        .collect()
}

/// Resolve `preference` to a device.
///
/// Fails with [`ComputeError::DeviceUnavailable`] when nothing matches. When
/// devices match but none of them can be opened, the first open failure is
/// returned instead.
pub fn select_device(preference: &DevicePreference) -> ComputeResult<Device> {
    let mut first_failure = None;
    for candidate in preference.rank(candidates()) {
        match candidate.open() {
            Ok(device) => {
                tracing::info!(
                    %preference,
                    device = %device.descriptor().name,
                    backend = %device.descriptor().backend,
                    "selected compute device"
                );
                return Ok(device);
            }
            Err(err) => {
                tracing::warn!(
                    device = %candidate.descriptor.name,
                    "failed to open compute device: {err}"
                );
                first_failure.get_or_insert(err);
            }
        }
    }
    Err(first_failure.unwrap_or_else(|| ComputeError::DeviceUnavailable {
        preference: preference.to_string(),
    }))
}

/// The device named by `SPIRAL_COMPUTE_DEVICE`, resolved once per process.
///
/// Falls back to the host device, with a warning, when the configured
/// preference is malformed or cannot be satisfied.
pub fn default_device() -> Device {
    static DEFAULT: OnceLock<Device> = OnceLock::new();
    DEFAULT
        .get_or_init(|| resolve_default(&spiral_config::config().device))
        .clone()
}

fn resolve_default(configured: &str) -> Device {
    let resolved = configured
        .parse::<DevicePreference>()
        .and_then(|preference| select_device(&preference));
    match resolved {
        Ok(device) => device,
        Err(err) => {
            tracing::warn!(
                preference = %configured,
                "default device unavailable, using host: {err}"
            );
            Device::host()
        }
    }
}
