//! Platform-aware time utilities.
//!
//! On native platforms, this uses `chrono::Utc::now()`.
//! On WASM, this uses `js_sys::Date::now()` since `std::time::SystemTime`
//! is not available on `wasm32-unknown-unknown`.

use chrono::{DateTime, TimeZone, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Utc::now().timestamp_millis()
    }
}

/// Returns the current instant, truncated to millisecond precision.
///
/// Every backend keeps at most milliseconds, so stamping with anything finer
/// would make freshly written records compare unequal to what is read back.
pub fn now() -> DateTime<Utc> {
    from_millis(now_timestamp_millis())
}

/// Converts Unix milliseconds into a UTC instant (epoch when out of range).
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_millis_is_reasonable() {
        let ts = now_timestamp_millis();
        // Should be after 2024-01-01 in millis
        assert!(ts > 1704067200_000, "Timestamp {} is too old", ts);
        // Should be before 2100-01-01 in millis
        assert!(ts < 4102444800_000, "Timestamp {} is too far in future", ts);
    }

    #[test]
    fn test_now_has_millisecond_precision() {
        let t = now();
        assert_eq!(t.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_from_millis() {
        assert_eq!(from_millis(1_700_000_000_123).timestamp_millis(), 1_700_000_000_123);
    }
}
