//! Per-core tracking records and their discovery.
//!
//! Discovery walks the base register directory once at sensor start, probes
//! each candidate core's register file, and captures the core's calibration
//! unit. The resulting table is insertion-ordered: directory-enumeration
//! order fixes which wire position each core's reading occupies.

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::msr::{self, MSR_RAPL_POWER_UNIT, POWER_UNIT_MASK};

/// Fatal discovery failures; the sensor must not start after either.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("register directory {path} is not readable: {source}")]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no core exposes a readable power register")]
    NoUsableHardware,
}

/// One monitored core: where its register file lives and how to scale raw
/// readings into watts.
///
/// `calibration_unit` is computed once at discovery and never refreshed.
#[derive(Debug, Clone)]
pub struct CoreTracker {
    pub core_index: u32,
    pub register_path: PathBuf,
    pub calibration_unit: f64,
}

/// Insertion-ordered collection of core trackers.
///
/// Discovery appends; the sampler evicts on read failure. Eviction is
/// permanent: a core that drops out is never re-probed.
#[derive(Debug, Default)]
pub struct TrackerTable {
    trackers: Vec<CoreTracker>,
}

impl TrackerTable {
    /// Enumerate `base_dir` and build a tracker per usable core.
    ///
    /// An entry is a candidate when its name ends in a decimal digit; the
    /// leading digits of the name become the core index. Candidates whose
    /// register file cannot be opened or whose unit register cannot be read
    /// are skipped without failing discovery.
    pub fn discover(base_dir: &Path, register_leaf: &str) -> Result<Self, DiscoverError> {
        let entries = std::fs::read_dir(base_dir).map_err(|source| {
            DiscoverError::DeviceUnavailable {
                path: base_dir.to_path_buf(),
                source,
            }
        })?;

        let mut table = Self::default();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            // Entries that share the directory without being cores
            // ("microcode", "cpuid", ...) never end in a digit.
            if !name.chars().next_back().is_some_and(|c| c.is_ascii_digit()) {
                debug!(entry = name, "skipping non-core directory entry");
                continue;
            }

            let core_index = leading_index(name);
            let register_path = base_dir.join(name).join(register_leaf);

            let file = match File::open(&register_path) {
                Ok(file) => file,
                Err(err) => {
                    debug!(core = core_index, path = %register_path.display(), error = %err,
                        "core register not accessible, skipping");
                    continue;
                }
            };
            let units = match msr::read_register(&file, MSR_RAPL_POWER_UNIT) {
                Ok(units) => units,
                Err(err) => {
                    debug!(core = core_index, error = %err,
                        "core unit register not readable, skipping");
                    continue;
                }
            };

            let raw_unit_bits = (units & POWER_UNIT_MASK) as i32;
            table.trackers.push(CoreTracker {
                core_index,
                register_path,
                calibration_unit: 0.5_f64.powi(raw_unit_bits),
            });
        }

        if table.is_empty() {
            return Err(DiscoverError::NoUsableHardware);
        }
        Ok(table)
    }

    /// Append a tracker; insertion order is wire order.
    pub fn push(&mut self, tracker: CoreTracker) {
        self.trackers.push(tracker);
    }

    /// Evict the tracker at `index`, shifting later cores up one position.
    pub fn remove(&mut self, index: usize) -> CoreTracker {
        self.trackers.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&CoreTracker> {
        self.trackers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoreTracker> {
        self.trackers.iter()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

/// Leading decimal digits of an entry name; zero when the name starts with
/// something else, matching the permissive parse discovery has always used.
fn leading_index(name: &str) -> u32 {
    let digits: &str = name
        .split_once(|c: char| !c.is_ascii_digit())
        .map_or(name, |(prefix, _)| prefix);
    digits.parse().unwrap_or(0)
}
