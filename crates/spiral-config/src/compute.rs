use std::sync::OnceLock;

/// Environment variable holding the default device preference tag.
pub const DEVICE_ENV: &str = "SPIRAL_COMPUTE_DEVICE";
/// Environment variable holding the host parallel threshold.
pub const PARALLEL_THRESHOLD_ENV: &str = "SPIRAL_PARALLEL_THRESHOLD";
/// Environment variable toggling deterministic (sequential) host execution.
pub const DETERMINISTIC_ENV: &str = "SPIRAL_DETERMINISTIC";

/// Dispatches with fewer work items than this run on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;
/// Preference tag used when [`DEVICE_ENV`] is unset or blank.
pub const DEFAULT_DEVICE: &str = "any";

/// Snapshot of the compute settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeConfig {
    /// Device preference tag resolved by the default device lookup
    /// (`any`, `cpu`, `gpu` or `name:<substring>`).
    pub device: String,
    /// Minimum number of work items before the host backend fans out to rayon.
    pub parallel_threshold: usize,
    /// Forces host dispatches to run sequentially so reductions keep a stable order.
    pub deterministic: bool,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            deterministic: false,
        }
    }
}

impl ComputeConfig {
    /// Builds a configuration snapshot from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let device = std::env::var(DEVICE_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.device);

        let parallel_threshold = std::env::var(PARALLEL_THRESHOLD_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.parallel_threshold);

        let deterministic = std::env::var(DETERMINISTIC_ENV)
            .ok()
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.deterministic);

        Self {
            device,
            parallel_threshold,
            deterministic,
        }
    }

    /// Returns whether a host dispatch over `work_items` should use the thread pool.
    pub fn parallel_for(&self, work_items: usize) -> bool {
        !self.deterministic && work_items >= self.parallel_threshold
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim(),
        "" | "0" | "false" | "False" | "FALSE" | "off" | "OFF" | "no"
    )
}

static CONFIG: OnceLock<ComputeConfig> = OnceLock::new();

/// Returns the lazily initialised configuration.
pub fn config() -> &'static ComputeConfig {
    CONFIG.get_or_init(ComputeConfig::from_env)
}

/// Installs `cfg` unless a snapshot already exists. Intended for tests and
/// embedders that configure the process programmatically.
pub fn configure(cfg: ComputeConfig) -> &'static ComputeConfig {
    CONFIG.get_or_init(|| cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
    use std::sync::{Mutex, OnceLock};

    fn with_env(vars: &[(&str, Option<&str>)], test: impl FnOnce()) {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let _lock = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                match value {
                    Some(val) => std::env::set_var(key, val),
                    None => std::env::remove_var(key),
                }
                ((*key).to_string(), previous)
            })
            .collect();

        let result = catch_unwind(AssertUnwindSafe(test));

        for (key, value) in snapshot {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }

        if let Err(err) = result {
            resume_unwind(err);
        }
    }

    #[test]
    fn unset_environment_yields_defaults() {
        with_env(
            &[
                (DEVICE_ENV, None),
                (PARALLEL_THRESHOLD_ENV, None),
                (DETERMINISTIC_ENV, None),
            ],
            || {
                assert_eq!(ComputeConfig::from_env(), ComputeConfig::default());
            },
        );
    }

    #[test]
    fn explicit_values_override_defaults() {
        with_env(
            &[
                (DEVICE_ENV, Some(" gpu ")),
                (PARALLEL_THRESHOLD_ENV, Some("128")),
                (DETERMINISTIC_ENV, Some("on")),
            ],
            || {
                let cfg = ComputeConfig::from_env();
                assert_eq!(cfg.device, "gpu");
                assert_eq!(cfg.parallel_threshold, 128);
                assert!(cfg.deterministic);
            },
        );
    }

    #[test]
    fn malformed_threshold_falls_back() {
        with_env(
            &[
                (PARALLEL_THRESHOLD_ENV, Some("lots")),
                (DEVICE_ENV, Some("   ")),
            ],
            || {
                let cfg = ComputeConfig::from_env();
                assert_eq!(cfg.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
                assert_eq!(cfg.device, DEFAULT_DEVICE);
            },
        );
    }

    #[test]
    fn textual_false_values_disable_determinism() {
        for raw in ["off", "0", "false"] {
            with_env(&[(DETERMINISTIC_ENV, Some(raw))], || {
                assert!(!ComputeConfig::from_env().deterministic);
            });
        }
    }

    #[test]
    fn configure_installs_snapshot_before_first_lookup() {
        let cfg = ComputeConfig {
            device: "cpu".to_string(),
            parallel_threshold: 7,
            deterministic: true,
        };
        assert_eq!(configure(cfg.clone()), &cfg);
        assert_eq!(config(), &cfg);
        assert_eq!(configure(ComputeConfig::default()), &cfg);
    }

    #[test]
    fn deterministic_mode_never_fans_out() {
        let cfg = ComputeConfig {
            deterministic: true,
            parallel_threshold: 0,
            ..ComputeConfig::default()
        };
        assert!(!cfg.parallel_for(1 << 20));

        let cfg = ComputeConfig {
            parallel_threshold: 16,
            ..ComputeConfig::default()
        };
        assert!(!cfg.parallel_for(15));
        assert!(cfg.parallel_for(16));
    }
}
