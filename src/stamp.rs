//! Timestamp extraction from log record attributes
//!
//! Sprint 2: stamp parsing
//!
//! HotSpot writes event timestamps as fractional seconds since VM start
//! (`stamp='0.083'`). This module scales them to integer milliseconds so the
//! lifecycle model can subtract them without touching floating point again.
//! The unit is otherwise opaque to the rest of the crate; only differences
//! between two stamps are meaningful.

use crate::tag::{AttributeMap, ATTR_STAMP, ATTR_STAMP_COMPLETED};

/// Timestamp-bearing attribute keys, checked in order. The first present
/// key wins; `stamp_completed` outranks `stamp` on records that carry both.
pub const STAMP_KEYS: [&str; 2] = [ATTR_STAMP_COMPLETED, ATTR_STAMP];

/// Extract a millisecond stamp from an attribute bag.
///
/// Returns 0 when no timestamp key is present. Many record kinds
/// legitimately omit timestamps, so absence is not an error.
pub fn extract_stamp(attributes: &AttributeMap) -> i64 {
    for key in STAMP_KEYS {
        if let Some(value) = attributes.get(key) {
            return parse_stamp(value);
        }
    }
    0
}

/// Parse one stamp attribute value (fractional seconds) into milliseconds.
///
/// Tolerates a comma decimal separator, which JVMs under some locales emit.
/// Malformed or negative values are treated as "unknown" and come back as 0;
/// the lifecycle model then skips elapsed-time computation for the record.
pub fn parse_stamp(stamp: &str) -> i64 {
    let normalized = stamp.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(seconds) if seconds >= 0.0 => (seconds * 1000.0) as i64,
        Ok(seconds) => {
            tracing::warn!(stamp, seconds, "negative stamp treated as unknown");
            0
        }
        Err(_) => {
            tracing::warn!(stamp, "could not parse stamp attribute");
            0
        }
    }
}
