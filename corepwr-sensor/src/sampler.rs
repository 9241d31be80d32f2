//! Per-tick sampling pass over the tracker table.
//!
//! Ticks arrive serially from the host framework's scheduler; each pass
//! opens every tracked core's register file just long enough for one read,
//! evicting any core that fails. Eviction is permanent and is the only
//! failure handling here: the pass itself always yields a valid sample.

use std::fs::File;
use std::path::Path;

use chrono::Local;
use corepwr_common::wire::Sample;
use thiserror::Error;
use tracing::{debug, warn};

use crate::msr::{self, MSR_PKG_POWER_INFO, POWER_INFO_MASK, ReadError};
use crate::tracker::TrackerTable;

/// Timestamp layout carried in every sample: local date-time with UTC offset.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Why one core's reading was abandoned this pass.
#[derive(Debug, Error)]
pub enum CoreReadError {
    #[error("cannot open register file: {0}")]
    Open(#[from] std::io::Error),

    #[error(transparent)]
    Register(#[from] ReadError),
}

/// Runs sampling passes on behalf of one sensor instance.
pub struct Sampler {
    hostname: String,
}

impl Sampler {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Run one sampling pass.
    ///
    /// `core_count` is snapshotted before the pass; cores evicted while the
    /// pass runs still count toward it, leaving the reading sequence shorter
    /// than the declared count for this one sample. The receiving side
    /// rejects such a buffer, which is how an eviction tick surfaces
    /// downstream.
    pub fn sample(&self, table: &mut TrackerTable) -> Sample {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let core_count = table.len() as i32;
        debug!(host = %self.hostname, cores = core_count, "sampling per-core power");

        let mut power_readings = Vec::with_capacity(table.len());
        let mut index = 0;
        while let Some(tracker) = table.get(index) {
            let (core, path, unit) = (
                tracker.core_index,
                tracker.register_path.clone(),
                tracker.calibration_unit,
            );

            match read_core_power(&path, unit) {
                Ok(watts) => {
                    power_readings.push(watts);
                    index += 1;
                }
                Err(err) => {
                    table.remove(index);
                    warn!(core, path = %path.display(), error = %err,
                        "evicting core after failed register read");
                }
            }
        }

        Sample {
            hostname: self.hostname.clone(),
            core_count,
            timestamp,
            power_readings,
        }
    }
}

/// One core's watt reading: open, read the power-info register, convert.
///
/// The handle is scoped to this call, so it is closed on every path and no
/// descriptor outlives the read.
fn read_core_power(path: &Path, calibration_unit: f64) -> Result<f32, CoreReadError> {
    let file = File::open(path)?;
    let value = msr::read_register(&file, MSR_PKG_POWER_INFO)?;
    Ok(((value & POWER_INFO_MASK) as f64 * calibration_unit) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msr::MSR_RAPL_POWER_UNIT;
    use crate::tracker::CoreTracker;
    use std::os::unix::fs::FileExt;
    use std::path::PathBuf;

    fn write_register_file(path: &Path, unit_bits: u64, raw_power: u64) {
        let file = File::create(path).expect("create register file");
        file.write_all_at(&unit_bits.to_le_bytes(), MSR_RAPL_POWER_UNIT)
            .expect("write unit register");
        file.write_all_at(&raw_power.to_le_bytes(), MSR_PKG_POWER_INFO)
            .expect("write power register");
    }

    fn tracker_for(path: PathBuf, calibration_unit: f64) -> CoreTracker {
        CoreTracker {
            core_index: 0,
            register_path: path,
            calibration_unit,
        }
    }

    #[test]
    fn test_power_conversion_masks_and_scales() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("msr");
        // Raw value 100 with unit 0.125 reads as 12.5 W.
        write_register_file(&path, 3, 100);

        let watts = read_core_power(&path, 0.125).expect("read should succeed");
        assert!((watts - 12.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_power_conversion_ignores_bits_above_mask() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("msr");
        // Bits above the low 15 must not leak into the reading.
        write_register_file(&path, 0, 0xFFFF_8064);

        let watts = read_core_power(&path, 1.0).expect("read should succeed");
        assert!((watts - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_reports_open_failure() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("gone");

        let err = read_core_power(&path, 1.0).expect_err("open should fail");
        assert!(matches!(err, CoreReadError::Open(_)));
    }

    #[test]
    fn test_sample_keeps_pre_pass_count_on_eviction() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let alive = tmp.path().join("alive");
        write_register_file(&alive, 1, 200);

        let mut table = TrackerTable::default();
        table.push(tracker_for(alive, 0.5));
        table.push(tracker_for(tmp.path().join("missing"), 0.5));

        let sampler = Sampler::new("node-a");
        let sample = sampler.sample(&mut table);

        // The dead core was counted before the pass but produced no reading.
        assert_eq!(sample.core_count, 2);
        assert_eq!(sample.power_readings.len(), 1);
        assert_eq!(table.len(), 1);

        // The next tick reflects the shrunken table.
        let sample = sampler.sample(&mut table);
        assert_eq!(sample.core_count, 1);
        assert_eq!(sample.power_readings.len(), 1);
        assert!((sample.power_readings[0] - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sample_with_empty_table_is_valid() {
        let mut table = TrackerTable::default();
        let sampler = Sampler::new("node-a");

        let sample = sampler.sample(&mut table);
        assert_eq!(sample.core_count, 0);
        assert!(sample.power_readings.is_empty());
        assert_eq!(sample.hostname, "node-a");
        assert!(!sample.timestamp.is_empty());
    }

    #[test]
    fn test_timestamp_layout() {
        let mut table = TrackerTable::default();
        let sample = Sampler::new("node-a").sample(&mut table);

        // YYYY-MM-DD HH:MM:SS±ZZZZ
        assert_eq!(sample.timestamp.len(), 24);
        assert_eq!(&sample.timestamp[4..5], "-");
        assert_eq!(&sample.timestamp[10..11], " ");
        assert!(sample.timestamp[19..20] == *"+" || sample.timestamp[19..20] == *"-");
    }
}
