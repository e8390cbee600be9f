//! Tick counter and ISO-8601 timestamp helpers.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The orchestrator's tick counter. Strictly monotonic across successful
/// ticks (invariant #3); a failed tick leaves it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub fn zero() -> Self {
        Tick(0)
    }

    pub fn is_first(self) -> bool {
        self.0 == 0
    }

    pub fn next(self) -> Self {
        Tick(self.0 + 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current UTC time formatted as ISO-8601 with a trailing `Z`, as required
/// by the plan JSON's `timestamp` field (§6).
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_zero_is_first() {
        assert!(Tick::zero().is_first());
        assert!(!Tick(1).is_first());
    }

    #[test]
    fn tick_next_is_monotonic() {
        let t = Tick(5);
        assert_eq!(t.next(), Tick(6));
        assert!(t.next() > t);
    }

    #[test]
    fn timestamp_ends_with_z() {
        let ts = now_iso8601();
        assert!(ts.ends_with('Z'), "timestamp `{ts}` must end with Z");
    }
}
