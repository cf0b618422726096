//! Date/time utilities for datashare.
//!
//! Timestamps are stored as fixed-width UTC text (`YYYY-MM-DD HH:MM:SS.ffffff`)
//! so that SQL string comparison orders them chronologically.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::{Result, ShareError};

const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current time at the precision the database keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage.
pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Plain SQLite `datetime('now')` values (no fractional part) are accepted too.
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ShareError::Database(format!("invalid timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_to_db_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 1, 5, 3, 4, 5).unwrap();
        assert_eq!(to_db(&whole), "2024-01-05 03:04:05.000000");

        let fractional = whole + Duration::microseconds(42);
        assert_eq!(to_db(&fractional), "2024-01-05 03:04:05.000042");
    }

    #[test]
    fn test_round_trip() {
        let dt = now();
        assert_eq!(from_db(&to_db(&dt)).unwrap(), dt);
    }

    #[test]
    fn test_from_db_accepts_sqlite_format() {
        let dt = from_db("2024-01-15 10:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(matches!(from_db("yesterday"), Err(ShareError::Database(_))));
    }

    #[test]
    fn test_lexical_order_matches_chronological() {
        let a = Utc.with_ymd_and_hms(2024, 1, 5, 9, 59, 59).unwrap();
        let b = a + Duration::microseconds(1);
        let c = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        assert!(to_db(&a) < to_db(&b));
        assert!(to_db(&b) < to_db(&c));
    }
}
