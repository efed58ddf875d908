//! Dispute policy knobs.

use std::collections::HashSet;

use chrono::Duration;
use kome_core::{UserId, ValidationError};

use crate::escalation::{EscalationPolicy, DEFAULT_ESCALATION_HOURS};
use crate::jury::DEFAULT_JURY_SIZE;

/// Policy applied by [`DisputeService`](crate::DisputeService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeConfig {
    /// Votes required for quorum on newly filed disputes.
    pub jury_size: u32,
    /// Chat age after which the sweep escalates.
    pub escalation_window: Duration,
    /// Hold new disputes in `pending` until a moderator accepts them.
    pub require_review: bool,
    /// Users allowed to accept and escalate any dispute.
    pub moderators: HashSet<UserId>,
}

impl Default for DisputeConfig {
    fn default() -> Self {
        Self {
            jury_size: DEFAULT_JURY_SIZE,
            escalation_window: Duration::hours(DEFAULT_ESCALATION_HOURS),
            require_review: false,
            moderators: HashSet::new(),
        }
    }
}

impl DisputeConfig {
    /// Reject settings the state machine cannot honour.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jury_size == 0 {
            return Err(ValidationError::OutOfRange {
                field: "jury_size",
                min: 1,
                max: i64::from(u32::MAX),
                actual: 0,
            });
        }
        if self.escalation_window <= Duration::zero() {
            return Err(ValidationError::OutOfRange {
                field: "escalation_window",
                min: 1,
                max: i64::MAX,
                actual: self.escalation_window.num_seconds(),
            });
        }
        Ok(())
    }

    pub fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy::new(self.escalation_window)
    }

    pub fn is_moderator(&self, user: &UserId) -> bool {
        self.moderators.contains(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DisputeConfig::default();
        assert_eq!(cfg.jury_size, 5);
        assert_eq!(cfg.escalation_window, Duration::hours(72));
        assert!(!cfg.require_review);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_jury_rejected() {
        let cfg = DisputeConfig {
            jury_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_window_rejected() {
        let cfg = DisputeConfig {
            escalation_window: Duration::hours(-1),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
