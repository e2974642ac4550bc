use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifies a tracking session. Viewers that observe a different epoch than the one they hold must discard
/// everything they derived from earlier fixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(i64);

impl Epoch {
    pub fn from_millis(millis: i64) -> Self {
        Epoch(millis)
    }

    pub fn now() -> Self {
        Epoch(Utc::now().timestamp_millis())
    }

    /// The epoch assigned at `now_millis`, strictly newer than `self` even if the clock stalled or went backwards.
    pub fn next_at(self, now_millis: i64) -> Self {
        Epoch(now_millis.max(self.0.saturating_add(1)))
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1_000, 2_000, 2_000)]
    #[case(1_000, 1_000, 1_001)]
    #[case(1_000, 500, 1_001)]
    fn next_at_is_strictly_newer(#[case] current: i64, #[case] now: i64, #[case] expected: i64) {
        let next = Epoch::from_millis(current).next_at(now);

        assert_eq!(next, Epoch::from_millis(expected));
        assert!(next > Epoch::from_millis(current));
    }

    #[test]
    fn serializes_as_a_plain_number() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&Epoch::from_millis(1_700_000_000_000))?;

        assert_eq!(json, "1700000000000");
        Ok(())
    }
}
