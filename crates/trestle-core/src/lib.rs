//! Foundational time utilities shared across trestle crates.
//!
//! Used by the audit log for entry timestamps and by request handlers that
//! need a cheap monotonic-enough clock value.

pub mod time_utils;

pub use time_utils::{current_rfc3339, current_unix_timestamp, current_unix_timestamp_ms};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_utils_round_trip_bounds() {
        let now_s = current_unix_timestamp();
        let now_ms = current_unix_timestamp_ms();
        let now_ms_s = now_ms / 1_000;
        assert!(now_ms_s >= now_s);
        assert!(now_ms_s <= now_s.saturating_add(1));
    }

    #[test]
    fn rfc3339_timestamp_is_utc_with_millis() {
        let stamp = current_rfc3339();
        assert!(stamp.ends_with('Z'));
        assert!(stamp.contains('.'));
    }
}
