//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Out-of-range values collapse to the Unix epoch.
    pub fn from_unix_secs(secs: i64) -> Self {
        Self(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_ordering_helpers_agree() {
        let ts1 = Timestamp::from_unix_secs(1_000);
        let ts2 = Timestamp::from_unix_secs(2_000);

        assert!(ts1.is_before(&ts2));
        assert!(ts2.is_after(&ts1));
        assert!(ts1 < ts2);
    }

    #[test]
    fn timestamp_displays_as_rfc3339() {
        let ts = Timestamp::from_unix_secs(1705276800);
        assert_eq!(ts.to_string(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn timestamp_from_unix_secs_works() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_secs(1705276800);
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().month(), 1);
        assert_eq!(ts.as_datetime().day(), 15);
        assert_eq!(ts.as_unix_secs(), 1705276800);
    }

    #[test]
    fn add_days_moves_forward_and_back() {
        let ts = Timestamp::from_unix_secs(1705276800);
        assert_eq!(ts.add_days(1).duration_since(&ts).num_days(), 1);
        assert_eq!(ts.add_days(-2).duration_since(&ts).num_days(), -2);
    }

    #[test]
    fn timestamp_deserializes_from_json() {
        let json = "\"2024-01-15T10:30:00Z\"";
        let ts: Timestamp = serde_json::from_str(json).unwrap();

        assert_eq!(ts.as_datetime().year(), 2024);
    }
}
