//! Wire encoding of power samples.
//!
//! The layout is fixed and length-implicit: hostname, core count, timestamp,
//! then `core_count` float readings, with no per-field type tags and no
//! framing beyond field order. Strings carry a u32 byte-length prefix;
//! integers, lengths, and float bit patterns travel big-endian. The receiver
//! trusts `core_count` to know how many readings follow, so a buffer that
//! declares more readings than it carries is rejected as truncated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while serializing a sample.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("string field of {0} bytes exceeds the u32 length prefix")]
    StringTooLong(usize),

    #[error("core count {0} is negative and cannot be encoded")]
    NegativeCount(i32),
}

/// Errors raised while deserializing a received buffer.
///
/// Any of these aborts the whole record: partially decoded state is
/// discarded and nothing reaches the storage collaborator.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer truncated at offset {offset}: needed {needed} more byte(s)")]
    Truncated { offset: usize, needed: usize },

    #[error("string field is not valid UTF-8: {0}")]
    InvalidString(#[from] std::str::Utf8Error),

    #[error("declared core count {0} is invalid")]
    InvalidCount(i32),
}

/// One snapshot of per-core power readings, as carried on the wire.
///
/// `core_count` is the tracker-table size when the sampling pass began.
/// `power_readings` may be shorter if cores were evicted mid-pass; such a
/// sample encodes fine but will be rejected by [`Sample::decode`] on the
/// receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub hostname: String,
    pub core_count: i32,
    pub timestamp: String,
    pub power_readings: Vec<f32>,
}

impl Sample {
    /// Serialize in wire order.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.core_count < 0 {
            return Err(EncodeError::NegativeCount(self.core_count));
        }

        let mut out = Vec::with_capacity(
            12 + self.hostname.len() + self.timestamp.len() + 4 * self.power_readings.len(),
        );
        put_str(&mut out, &self.hostname)?;
        out.extend_from_slice(&self.core_count.to_be_bytes());
        put_str(&mut out, &self.timestamp)?;
        for &watts in &self.power_readings {
            out.extend_from_slice(&watts.to_be_bytes());
        }
        Ok(out)
    }

    /// Deserialize a received buffer.
    ///
    /// Exactly `core_count` readings are consumed; a shorter sequence is a
    /// [`DecodeError::Truncated`]. Trailing bytes after the final reading are
    /// ignored so a framed transport may pad.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(buf);

        let hostname = reader.get_str()?.to_owned();
        let core_count = reader.get_i32()?;
        if core_count < 0 {
            return Err(DecodeError::InvalidCount(core_count));
        }
        let timestamp = reader.get_str()?.to_owned();

        // Pre-allocate no more than the buffer can actually hold, so a
        // corrupt count cannot balloon the allocation before the first
        // missing reading is noticed.
        let declared = core_count as usize;
        let mut power_readings = Vec::with_capacity(declared.min(reader.remaining() / 4));
        for _ in 0..declared {
            power_readings.push(reader.get_f32()?);
        }

        Ok(Self {
            hostname,
            core_count,
            timestamp,
            power_readings,
        })
    }
}

fn put_str(out: &mut Vec<u8>, value: &str) -> Result<(), EncodeError> {
    let len = u32::try_from(value.len()).map_err(|_| EncodeError::StringTooLong(value.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Bounds-checked cursor over a received buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn get_word(&mut self) -> Result<[u8; 4], DecodeError> {
        let raw = self.take(4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(raw);
        Ok(word)
    }

    fn get_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.get_word()?))
    }

    fn get_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.get_word()?))
    }

    fn get_str(&mut self) -> Result<&'a str, DecodeError> {
        let len = u32::from_be_bytes(self.get_word()?) as usize;
        let raw = self.take(len)?;
        Ok(std::str::from_utf8(raw)?)
    }
}
