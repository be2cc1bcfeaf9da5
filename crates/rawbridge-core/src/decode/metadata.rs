//! Shot metadata from the native handle.

use chrono::DateTime;

use super::ShotMetadata;
use crate::session::RawSession;

/// Format used for `ShotMetadata::capture_date_time`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl ShotMetadata {
    /// Build metadata from epoch seconds, formatted in UTC.
    ///
    /// A zero timestamp (no capture time recorded) yields the epoch itself.
    /// Timestamps outside the representable calendar range fall back to the
    /// epoch as well.
    pub fn from_timestamp(timestamp: i64) -> Self {
        match DateTime::from_timestamp(timestamp, 0) {
            Some(date_time) => Self {
                capture_timestamp: timestamp,
                capture_date_time: date_time.format(DATE_TIME_FORMAT).to_string(),
            },
            None => {
                tracing::debug!(timestamp, "capture timestamp out of range");
                Self::from_timestamp(0)
            }
        }
    }

    /// Whether the file carried no capture time.
    pub fn is_epoch(&self) -> bool {
        self.capture_timestamp == 0
    }
}

/// Read the capture time from the session's "other parameters" block.
pub fn extract_metadata<S: RawSession>(session: &S) -> ShotMetadata {
    ShotMetadata::from_timestamp(session.capture_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::stub::StubSession;

    #[test]
    fn test_fixed_timestamp_formats_utc() {
        let meta = ShotMetadata::from_timestamp(1_700_000_000);
        assert_eq!(meta.capture_timestamp, 1_700_000_000);
        assert_eq!(meta.capture_date_time, "2023-11-14T22:13:20");
    }

    #[test]
    fn test_zero_timestamp_is_epoch() {
        let meta = ShotMetadata::from_timestamp(0);
        assert_eq!(meta.capture_date_time, "1970-01-01T00:00:00");
        assert!(meta.is_epoch());
    }

    #[test]
    fn test_negative_timestamp() {
        let meta = ShotMetadata::from_timestamp(-1);
        assert_eq!(meta.capture_date_time, "1969-12-31T23:59:59");
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_epoch() {
        let meta = ShotMetadata::from_timestamp(i64::MAX);
        assert_eq!(meta, ShotMetadata::from_timestamp(0));
    }

    #[test]
    fn test_extract_from_session() {
        let session = StubSession::new().with_timestamp(1_577_836_800);
        let meta = extract_metadata(&session);
        assert_eq!(meta.capture_date_time, "2020-01-01T00:00:00");
    }
}
