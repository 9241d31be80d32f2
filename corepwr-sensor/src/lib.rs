//! MSR-backed per-core power telemetry sensor.
//!
//! The engine discovers each core's register device file under a base
//! directory (`/dev/cpu` on Linux), computes a per-core calibration unit
//! once, then samples the package power-info register on every external
//! tick. Cores whose register file stops being readable are evicted rather
//! than retried; the surviving readings ship as a compact wire buffer via
//! [`corepwr_common::wire`].

pub mod config;
pub mod msr;
pub mod sampler;
pub mod sensor;
pub mod store;
pub mod tracker;

pub use config::SensorConfig;
pub use sensor::{JobId, LogOutcome, MsrPowerSensor, Sensor, SensorError};
pub use tracker::TrackerTable;
