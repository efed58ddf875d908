//! # Temporal Types: the Dispute Clock
//!
//! Every instant recorded on a dispute (filing, chat messages, jury votes,
//! status transitions) is a [`Timestamp`]: UTC, whole seconds. The escalation
//! clock starts at the first chat message and runs until the dispute leaves
//! the chat phase, so all of those instants have to compare on the same
//! footing. Sub-second noise is dropped on the way in so a record read back
//! from storage equals the one that was written.
//!
//! Wire form is `YYYY-MM-DDTHH:MM:SSZ`. Offsets other than `Z` are refused by
//! [`Timestamp::parse`].

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A point on the dispute clock: UTC, seconds precision.
///
/// Obtain one from the wall clock with [`Timestamp::now`], from an existing
/// `DateTime<Utc>` via `From`, or from its wire form with [`Timestamp::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Utc::now().into()
    }

    /// Reads the `Z`-suffixed wire form.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidTimestamp`] for malformed input and for any
    /// explicit offset, `+00:00` included.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason,
        };
        if !s.ends_with('Z') {
            return Err(invalid("offset must be Z".to_string()));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc).into())
            .map_err(|e| invalid(e.to_string()))
    }

    /// The underlying instant, for binding into storage queries.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Signed time elapsed between `earlier` and `self`.
    ///
    /// Goes negative when `earlier` is actually the later instant, which can
    /// happen when a sweep is evaluated against a clock behind the one that
    /// stamped the chat. The escalation policy compares the result strictly
    /// against its window, so a negative value never triggers escalation and
    /// a dispute is only due once the window has been exceeded, not merely
    /// reached.
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// The instant `d` after this one. Escalation tests use it to step a
    /// fixed clock past the window.
    pub fn plus(&self, d: Duration) -> Self {
        Self(self.0 + d)
    }

    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        // Zero nanoseconds always exist, the fallback is unreachable.
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }
}
