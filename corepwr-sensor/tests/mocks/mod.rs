//! Mock storage collaborators for sensor tests.

use std::sync::{Arc, Mutex};

use corepwr_common::record::PowerRecord;
use corepwr_sensor::store::{LogSink, StoreError};

/// Shared view into a [`MockSink`]'s activity, kept by the test after the
/// sink itself moves into the sensor.
#[derive(Debug, Default)]
pub struct MockSinkState {
    pub calls: usize,
    pub records: Vec<(String, PowerRecord)>,
    pub fail: bool,
}

/// A sink that records every ingest and can be told to reject them all.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    state: Arc<Mutex<MockSinkState>>,
}

#[allow(dead_code)]
impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose store is "down" from the first call.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.state.lock().expect("mock state").fail = true;
        sink
    }

    pub fn calls(&self) -> usize {
        self.state.lock().expect("mock state").calls
    }

    pub fn records(&self) -> Vec<(String, PowerRecord)> {
        self.state.lock().expect("mock state").records.clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.state.lock().expect("mock state").fail = fail;
    }
}

impl LogSink for MockSink {
    fn add_log(&mut self, namespace: &str, record: &PowerRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("mock state");
        state.calls += 1;
        if state.fail {
            return Err(StoreError::Backend("mock store is down".to_string()));
        }
        state.records.push((namespace.to_string(), record.clone()));
        Ok(())
    }
}
