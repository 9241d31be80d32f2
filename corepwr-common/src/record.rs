//! Key/value view of a decoded sample, as handed to the log store.
//!
//! A fully decoded sample flattens into one record per tick: `"ctime"` holds
//! the timestamp string and `"core<i>"` holds each core's watt reading, in
//! wire order. Records are built only from samples that decoded completely.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::wire::Sample;

/// Log namespace every power record is filed under.
pub const LOG_NAMESPACE: &str = "pwr";

/// A single record value: the timestamp string or a watt reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogValue {
    Text(String),
    Real(f32),
}

/// One keyed entry of a power record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub key: String,
    pub value: LogValue,
}

/// Ordered key/value record for the storage collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PowerRecord {
    entries: Vec<LogEntry>,
}

impl PowerRecord {
    /// Flatten a decoded sample: `"ctime"` first, then `"core0"`..`"core<n-1>"`.
    pub fn from_sample(sample: &Sample) -> Self {
        let mut entries = Vec::with_capacity(sample.power_readings.len() + 1);
        entries.push(LogEntry {
            key: "ctime".to_string(),
            value: LogValue::Text(sample.timestamp.clone()),
        });
        for (core, &watts) in sample.power_readings.iter().enumerate() {
            entries.push(LogEntry {
                key: format!("core{core}"),
                value: LogValue::Real(watts),
            });
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&LogValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// The timestamp entry, when present.
    pub fn ctime(&self) -> Option<&str> {
        match self.get("ctime") {
            Some(LogValue::Text(ts)) => Some(ts),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for PowerRecord {
    /// Records serialize as a flat map, preserving entry order.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}
