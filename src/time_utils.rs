// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Precision is fixed at microseconds so stored timestamps sort
/// lexicographically in chronological order.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time, formatted for storage.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_width_sorts_chronologically() {
        let whole = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let later = whole + chrono::Duration::milliseconds(500);

        let a = format_utc_rfc3339(whole);
        let b = format_utc_rfc3339(later);

        assert_eq!(a, "2026-03-01T12:00:00.000000Z");
        assert!(a < b);
    }
}
