//! Sensor lifecycle: the host-facing trait and its MSR-backed implementation.
//!
//! The host monitoring framework holds one sensor as a `Box<dyn Sensor>`,
//! drives `init` once before any tick, then calls `sample` serially on the
//! sampling node and `log` with received buffers on the consuming node.

use std::sync::atomic::{AtomicBool, Ordering};

use corepwr_common::record::{LOG_NAMESPACE, PowerRecord};
use corepwr_common::wire::Sample;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::SensorConfig;
use crate::sampler::Sampler;
use crate::store::LogSink;
use crate::tracker::{DiscoverError, TrackerTable};

/// Job identifier handed through the host framework's start/stop hooks.
pub type JobId = u32;

/// Fatal initialization failures, reported on the host's error channel.
/// Nothing here terminates the host process, only this sensor's
/// participation.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),
}

/// Lifecycle surface a sensor exposes to the host framework.
pub trait Sensor {
    /// One-time setup; a sensor that fails here must not be ticked.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Drop all tracking state.
    fn finalize(&mut self);

    /// Job started on this node.
    fn start(&mut self, job: JobId);

    /// Job finished on this node.
    fn stop(&mut self, job: JobId);

    /// One sampling tick: the encoded buffer for the transport, or `None`
    /// when this tick produced nothing to ship.
    fn sample(&mut self) -> Option<Vec<u8>>;

    /// One received buffer on the consuming node.
    fn log(&mut self, buf: &[u8]);
}

/// What a single `log` call did, observable for tests and callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Decoded and stored.
    Stored,
    /// Logging is disabled for this sensor stream; the buffer was not
    /// even decoded.
    Disabled,
    /// The buffer did not decode; the record was dropped.
    DecodeFailed,
    /// The store rejected the ingest; logging is now disabled.
    StoreFailed,
}

/// The MSR-backed power sensor.
pub struct MsrPowerSensor {
    config: SensorConfig,
    sampler: Sampler,
    table: Option<TrackerTable>,
    sink: Box<dyn LogSink>,
    log_enabled: AtomicBool,
}

impl MsrPowerSensor {
    pub fn new(config: SensorConfig, sink: Box<dyn LogSink>) -> Self {
        let sampler = Sampler::new(config.resolve_hostname());
        Self {
            config,
            sampler,
            table: None,
            sink,
            log_enabled: AtomicBool::new(true),
        }
    }

    /// Cores currently tracked; zero before `init` or after `finalize`.
    pub fn core_count(&self) -> usize {
        self.table.as_ref().map_or(0, TrackerTable::len)
    }

    /// Whether `log` still reaches the store.
    pub fn logging_enabled(&self) -> bool {
        self.log_enabled.load(Ordering::Relaxed)
    }

    /// Decode one received buffer and hand the record to the storage sink.
    ///
    /// A store rejection permanently disables this sensor stream's logging:
    /// later calls return [`LogOutcome::Disabled`] before any decode work.
    pub fn ingest(&mut self, buf: &[u8]) -> LogOutcome {
        if !self.log_enabled.load(Ordering::Relaxed) {
            return LogOutcome::Disabled;
        }

        let sample = match Sample::decode(buf) {
            Ok(sample) => sample,
            Err(err) => {
                error!(error = %err, "discarding power sample that failed to decode");
                return LogOutcome::DecodeFailed;
            }
        };
        debug!(host = %sample.hostname, cores = sample.core_count, "received power sample");

        let record = PowerRecord::from_sample(&sample);
        if let Err(err) = self.sink.add_log(LOG_NAMESPACE, &record) {
            // Don't bark about it on every tick; quietly stop logging.
            warn!(error = %err, "store rejected power record, disabling further logging");
            self.log_enabled.store(false, Ordering::Relaxed);
            return LogOutcome::StoreFailed;
        }
        LogOutcome::Stored
    }
}

impl Sensor for MsrPowerSensor {
    fn init(&mut self) -> Result<(), SensorError> {
        let table = TrackerTable::discover(&self.config.base_dir, &self.config.register_leaf)?;
        debug!(
            cores = table.len(),
            base_dir = %self.config.base_dir.display(),
            "power sensor initialized"
        );
        self.table = Some(table);
        Ok(())
    }

    fn finalize(&mut self) {
        self.table = None;
    }

    // Monitoring is always-on once initialized; per-job hooks are no-ops.
    fn start(&mut self, _job: JobId) {}

    fn stop(&mut self, _job: JobId) {}

    fn sample(&mut self) -> Option<Vec<u8>> {
        let table = self.table.as_mut()?;
        let sample = self.sampler.sample(table);
        match sample.encode() {
            Ok(buf) => Some(buf),
            Err(err) => {
                // The tick is lost, not retried; the next one proceeds
                // normally.
                warn!(error = %err, "dropping sample that failed to encode");
                None
            }
        }
    }

    fn log(&mut self, buf: &[u8]) {
        let _ = self.ingest(buf);
    }
}
