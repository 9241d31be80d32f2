//! Positioned reads against per-core register device files.
//!
//! A core's model-specific registers are exposed as a device file that
//! supports positioned 8-byte reads; the register address is the byte offset
//! into the file. Values are reported little-endian by the hardware.

use std::fs::File;
use std::os::unix::fs::FileExt;

use thiserror::Error;

/// Register holding the RAPL calibration units.
pub const MSR_RAPL_POWER_UNIT: u64 = 0x606;
/// Register holding package power information.
pub const MSR_PKG_POWER_INFO: u64 = 0x614;

/// Low 4 bits of `MSR_RAPL_POWER_UNIT`: the raw power-unit exponent.
pub const POWER_UNIT_MASK: i64 = 0x0F;
/// Low 15 bits of `MSR_PKG_POWER_INFO`: the raw power value.
pub const POWER_INFO_MASK: i64 = 0x7FFF;

/// A single register read failed; the caller decides eviction policy.
#[derive(Debug, Error)]
#[error("failed to read 8 bytes at register offset {offset:#x}: {source}")]
pub struct ReadError {
    pub offset: u64,
    #[source]
    pub source: std::io::Error,
}

/// Read the 64-bit register at `offset`: one positioned read, no retries.
///
/// The value is returned reinterpreted as signed; callers only consume the
/// low-order masked bits, so the sign of the high bit never matters.
pub fn read_register(file: &File, offset: u64) -> Result<i64, ReadError> {
    let mut raw = [0u8; 8];
    file.read_exact_at(&mut raw, offset)
        .map_err(|source| ReadError { offset, source })?;
    Ok(u64::from_le_bytes(raw) as i64)
}
