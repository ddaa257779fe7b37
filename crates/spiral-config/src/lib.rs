//! Process-wide configuration shared by the SpiralCompute crates.
//!
//! Settings are read from the environment once and cached for the lifetime of
//! the process. Tests can install an explicit snapshot through
//! [`compute::configure`] before the first lookup.

pub mod compute;
pub mod tracing;

pub use compute::{config, configure, ComputeConfig};
