//! Shared surface between the power-sampling node and the log-consuming node.
//!
//! Both ends of the transport must agree on the wire layout of a sample and
//! on the key/value shape handed to the downstream log store. Those types
//! live here so the sensor engine and the consumer never drift apart.

pub mod logging;
pub mod record;
pub mod wire;

pub use logging::{LogConfig, init_logging};
pub use record::PowerRecord;
pub use wire::Sample;
