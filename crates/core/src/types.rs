use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of a [`Version`](crate::version::Version) within one history.
///
/// Derived from the creation time in milliseconds and bumped past the
/// previous id when two versions land in the same millisecond, so ids are
/// unique and strictly increasing in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub u64);

impl VersionId {
    /// Allocate the id for a version created at `at`, strictly after `last`.
    pub fn next_after(last: Option<VersionId>, at: Timestamp) -> Self {
        let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        match last {
            Some(VersionId(prev)) if millis <= prev => VersionId(prev + 1),
            _ => VersionId(millis),
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VersionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(VersionId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_id_uses_creation_millis() {
        let at = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(VersionId::next_after(None, at), VersionId(1_700_000_000_123));
    }

    #[test]
    fn same_millisecond_bumps_past_previous() {
        let at = chrono::Utc.timestamp_millis_opt(5_000).unwrap();
        let first = VersionId::next_after(None, at);
        let second = VersionId::next_after(Some(first), at);
        assert_eq!(second, VersionId(5_001));
    }

    #[test]
    fn clock_going_backwards_still_increases() {
        let at = chrono::Utc.timestamp_millis_opt(1_000).unwrap();
        let next = VersionId::next_after(Some(VersionId(9_000)), at);
        assert_eq!(next, VersionId(9_001));
    }

    #[test]
    fn parses_and_displays() {
        let id: VersionId = " 42 ".parse().unwrap();
        assert_eq!(id, VersionId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<VersionId>().is_err());
    }
}
