// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use st_numeric::{
    enumerate_devices, select_device, ComputeError, Device, DeviceKind, DevicePreference,
    NumericVector,
};

#[test]
fn unsatisfiable_preference_does_not_fall_back() {
    let preference = DevicePreference::Named("definitely-not-an-installed-device".to_string());
    let err = select_device(&preference).unwrap_err();
    assert_eq!(
        err,
        ComputeError::DeviceUnavailable {
            preference: "name:definitely-not-an-installed-device".to_string()
        }
    );
}

#[cfg(not(feature = "wgpu"))]
#[test]
fn gpu_preference_fails_without_gpu_backend() {
    let err = select_device(&DevicePreference::Gpu).unwrap_err();
    assert!(matches!(err, ComputeError::DeviceUnavailable { .. }));

    let mut vector = NumericVector::with_device(4, Device::host()).unwrap();
    assert!(vector.select_gpu_device().is_err());
    assert_eq!(vector.describe_device().kind, DeviceKind::Cpu);
}

#[test]
fn cpu_preference_selects_the_shared_host() {
    let device = select_device(&DevicePreference::Cpu).unwrap();
    assert!(device.same_device(&Device::host()));
    assert_eq!(device.descriptor().kind, DeviceKind::Cpu);
}

#[test]
fn any_preference_always_resolves() {
    let device = select_device(&DevicePreference::Any).unwrap();
    let devices = enumerate_devices();
    assert!(devices.contains(device.descriptor()));
}

#[test]
fn selection_is_stored_on_the_vector() {
    let mut vector = NumericVector::with_device(4, Device::host()).unwrap();
    let any = select_device(&DevicePreference::Any).unwrap();
    vector.select_device(&DevicePreference::Any).unwrap();
    assert!(vector.device().same_device(&any));

    vector.select_device(&DevicePreference::Cpu).unwrap();
    assert!(vector.device().same_device(&Device::host()));
    vector.add_each_element(1.0).unwrap();
    assert_eq!(vector.get_vector(), vec![1.0; 4]);
}

#[test]
fn describe_device_reports_name_and_vendor() {
    let vector = NumericVector::with_device(1, Device::host()).unwrap();
    let descriptor = vector.describe_device();
    assert!(!descriptor.name.is_empty());
    assert!(!descriptor.vendor.is_empty());
    assert!(descriptor.to_string().starts_with("DEVICE: "));
    vector.print_device();
}

#[test]
fn print_device_after_tracing_init() {
    st_numeric::init_tracing();
    st_numeric::init_tracing();

    let vector = NumericVector::with_device(2, Device::host()).unwrap();
    vector.print_device();
    assert!(vector.describe_device().to_string().starts_with("DEVICE: "));
    st_numeric::flush_chrome_trace();
}
