//! Sensor configuration.
//!
//! Everything here has a working default for a Linux host; tests point
//! `base_dir` at a temporary register tree instead.

use std::path::PathBuf;

/// Directory exposing one subdirectory per CPU core.
pub const DEFAULT_BASE_DIR: &str = "/dev/cpu";
/// Register device file name inside each core directory.
pub const DEFAULT_REGISTER_LEAF: &str = "msr";

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub base_dir: PathBuf,
    pub register_leaf: String,
    /// Hostname recorded in each sample; resolved from the environment when
    /// not set explicitly.
    pub hostname: Option<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            register_leaf: DEFAULT_REGISTER_LEAF.to_string(),
            hostname: None,
        }
    }
}

impl SensorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_register_leaf(mut self, leaf: impl Into<String>) -> Self {
        self.register_leaf = leaf.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Hostname resolution chain: explicit config, `$HOSTNAME`, the kernel's
    /// own record, then a recognizable fallback.
    pub fn resolve_hostname(&self) -> String {
        if let Some(name) = &self.hostname
            && !name.trim().is_empty()
        {
            return name.clone();
        }

        if let Ok(name) = std::env::var("HOSTNAME")
            && !name.trim().is_empty()
        {
            return name;
        }

        if let Ok(name) = std::fs::read_to_string("/proc/sys/kernel/hostname") {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }

        "unknown-host".to_string()
    }
}
