// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use approx::assert_relative_eq;
use proptest::prelude::*;
use st_numeric::{Device, NumericVector};

fn host_vector(size: usize) -> NumericVector {
    NumericVector::with_device(size, Device::host()).expect("non-zero size")
}

fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0].to_bits() == pair[1].to_bits())
}

#[test]
fn add_on_fresh_vector_fills_with_scalar() {
    let mut vector = host_vector(10_000);
    vector.add_each_element(2.5).unwrap();
    let values = vector.get_vector();
    assert_eq!(values.len(), 10_000);
    assert!(values.iter().all(|v| *v == 2.5));
}

#[test]
fn last_element_is_updated_not_only_the_first() {
    let mut vector = host_vector(3);
    vector.add_each_element(1.0).unwrap();
    vector.multiply_each_element(4.0).unwrap();
    assert_eq!(vector.get_vector(), vec![4.0, 4.0, 4.0]);
}

#[test]
fn dividing_zeros_by_zero_gives_nan() {
    let mut vector = host_vector(8);
    vector.divide_each_element(0.0).unwrap();
    assert!(vector.get_vector().iter().all(|v| v.is_nan()));
}

#[test]
fn dividing_non_zero_by_zero_gives_signed_infinity() {
    let mut positive = host_vector(4);
    positive.add_each_element(3.0).unwrap();
    positive.divide_each_element(0.0).unwrap();
    assert!(positive.get_vector().iter().all(|v| *v == f64::INFINITY));

    let mut negative = host_vector(4);
    negative.subtract_each_element(3.0).unwrap();
    negative.divide_each_element(0.0).unwrap();
    assert!(negative.get_vector().iter().all(|v| *v == f64::NEG_INFINITY));
}

#[test]
fn reset_is_idempotent() {
    let mut once = host_vector(16);
    once.add_each_element(9.0).unwrap();
    once.reset().unwrap();

    let mut twice = host_vector(16);
    twice.add_each_element(9.0).unwrap();
    twice.reset().unwrap();
    twice.reset().unwrap();

    assert_eq!(once.get_vector(), twice.get_vector());
    assert!(twice.get_vector().iter().all(|v| *v == 0.0));
}

proptest! {
    #[test]
    fn add_fills_every_slot(size in 1usize..512, x in -1.0e12f64..1.0e12) {
        let mut vector = host_vector(size);
        vector.add_each_element(x).unwrap();
        let values = vector.get_vector();
        prop_assert_eq!(values.len(), size);
        prop_assert!(values.iter().all(|v| *v == x));
    }

    #[test]
    fn add_then_subtract_restores_state(
        size in 1usize..256,
        start in -1.0e6f64..1.0e6,
        x in -1.0e6f64..1.0e6,
    ) {
        let mut vector = host_vector(size);
        vector.add_each_element(start).unwrap();
        let before = vector.get_vector();

        vector.add_each_element(x).unwrap();
        vector.subtract_each_element(x).unwrap();

        for (after, before) in vector.get_vector().iter().zip(before.iter()) {
            assert_relative_eq!(*after, *before, epsilon = 1e-9, max_relative = 1e-12);
        }
    }

    #[test]
    fn scalar_ops_keep_uniform_state_uniform(
        size in 1usize..256,
        start in -1.0e3f64..1.0e3,
        x in -1.0e3f64..1.0e3,
        op in 0u8..4,
    ) {
        let mut vector = host_vector(size);
        vector.add_each_element(start).unwrap();
        match op {
            0 => vector.add_each_element(x).unwrap(),
            1 => vector.subtract_each_element(x).unwrap(),
            2 => vector.multiply_each_element(x).unwrap(),
            _ => vector.divide_each_element(x).unwrap(),
        }
        prop_assert!(all_equal(vector.as_slice()));
    }
}
