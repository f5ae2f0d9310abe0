//! # Freshness
//!
//! How old a result set is relative to its declared `as_of`.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_STALE_AFTER_SECONDS: u64 = 7200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Freshness {
    pub as_of: DateTime<Utc>,
    pub age_seconds: u64,
    pub stale: bool,
    pub stale_after_seconds: u64,
}

/// Age of `as_of` at `now`. An `as_of` in the future (clock skew) counts as
/// age zero.
pub fn evaluate(as_of: DateTime<Utc>, now: DateTime<Utc>, stale_after_seconds: u64) -> Freshness {
    let raw_age = (now - as_of).num_seconds();
    if raw_age < 0 {
        tracing::debug!(%as_of, %now, "as_of is ahead of the clock, clamping age to zero");
    }
    let age_seconds = u64::try_from(raw_age).unwrap_or(0);

    Freshness {
        as_of,
        age_seconds,
        stale: age_seconds > stale_after_seconds,
        stale_after_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_boundary_is_not_stale() {
        let now = as_of() + Duration::seconds(7200);
        let f = evaluate(as_of(), now, DEFAULT_STALE_AFTER_SECONDS);
        assert_eq!(f.age_seconds, 7200);
        assert!(!f.stale);
    }

    #[test]
    fn test_one_past_boundary_is_stale() {
        let now = as_of() + Duration::seconds(7201);
        assert!(evaluate(as_of(), now, DEFAULT_STALE_AFTER_SECONDS).stale);
    }

    #[test]
    fn test_future_as_of_clamps_to_zero() {
        let now = as_of() - Duration::minutes(5);
        let f = evaluate(as_of(), now, DEFAULT_STALE_AFTER_SECONDS);
        assert_eq!(f.age_seconds, 0);
        assert!(!f.stale);
    }

    #[test]
    fn test_custom_threshold() {
        let now = as_of() + Duration::seconds(61);
        assert!(evaluate(as_of(), now, 60).stale);
    }
}
