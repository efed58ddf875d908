//! # Escalation Trigger
//!
//! Moves a dispute from `in_chat` to `in_jury`, either because a participant
//! asked for it or because the negotiation window has elapsed since the first
//! chat message.
//!
//! The timed path runs as a sweep: list `in_chat` disputes, re-check
//! [`EscalationPolicy::is_due`] inside each atomic update, and escalate with
//! [`EscalationCause::Timeout`]. A dispute that was escalated between the
//! listing and the update is counted as a no-op, never as a failure.

use chrono::Duration;
use kome_core::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::dispute::{Dispute, DisputeStatus};

/// Default negotiation window before a chat is escalated to the jury.
pub const DEFAULT_ESCALATION_HOURS: i64 = 72;

/// Why a dispute left the chat phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationCause {
    /// A buyer, seller, or moderator escalated explicitly.
    Manual {
        /// Who escalated.
        actor: UserId,
    },
    /// The negotiation window elapsed.
    Timeout,
}

impl EscalationCause {
    /// Metric/log label for this cause.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual { .. } => "manual",
            Self::Timeout => "timeout",
        }
    }
}

/// Record of a dispute's escalation. Set once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    /// Why it escalated.
    pub cause: EscalationCause,
    /// When it escalated.
    pub at: Timestamp,
}

/// When a chat is considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Time allowed since the first chat message.
    pub window: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(DEFAULT_ESCALATION_HOURS),
        }
    }
}

impl EscalationPolicy {
    /// Create a policy with the given window.
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Whether `dispute` should be escalated by the sweep at `now`.
    ///
    /// Only `in_chat` disputes qualify. The window is strict: a chat exactly
    /// `window` old is not yet due.
    pub fn is_due(&self, dispute: &Dispute, now: &Timestamp) -> bool {
        if dispute.status != DisputeStatus::InChat || dispute.escalation.is_some() {
            return false;
        }
        match dispute.first_message_at() {
            Some(first) => now.duration_since(first) > self.window,
            None => false,
        }
    }
}

/// Summary of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// `in_chat` disputes examined.
    pub scanned: usize,
    /// Disputes moved to `in_jury` by this run.
    pub escalated: usize,
    /// Disputes whose update failed; they are retried on the next run.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispute::Filing;
    use kome_core::OrderId;

    fn chat_started_at(at: Timestamp) -> Dispute {
        let buyer = UserId::new();
        Dispute::file(
            Filing {
                order_id: OrderId::new(),
                buyer_id: buyer,
                seller_id: UserId::new(),
                filed_by: buyer,
                filer_name: "Buyer".into(),
                reason: "Damaged bag".into(),
                statement: "The sack was torn on arrival.".into(),
                jury_size: 5,
                require_review: false,
            },
            at,
        )
        .unwrap()
    }

    #[test]
    fn due_after_window() {
        let start = Timestamp::now();
        let dispute = chat_started_at(start);
        let policy = EscalationPolicy::default();
        assert!(!policy.is_due(&dispute, &start.plus(Duration::hours(71))));
        assert!(!policy.is_due(&dispute, &start.plus(Duration::hours(72))));
        assert!(policy.is_due(&dispute, &start.plus(Duration::hours(73))));
    }

    #[test]
    fn not_due_once_escalated() {
        let start = Timestamp::now();
        let mut dispute = chat_started_at(start);
        dispute
            .escalate(EscalationCause::Timeout, start.plus(Duration::hours(80)))
            .unwrap();
        assert!(!EscalationPolicy::default().is_due(&dispute, &start.plus(Duration::hours(90))));
    }

    #[test]
    fn cause_labels() {
        assert_eq!(EscalationCause::Timeout.as_str(), "timeout");
        assert_eq!(
            EscalationCause::Manual {
                actor: UserId::new()
            }
            .as_str(),
            "manual"
        );
    }
}
