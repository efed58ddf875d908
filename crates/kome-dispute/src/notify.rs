//! # Lifecycle Notifications
//!
//! Fire-and-forget events emitted after a mutation has been committed. A
//! notifier must never fail the operation that produced the event, so
//! [`Notifier::notify`] has no return value.

use std::sync::Arc;

use kome_core::{DisputeId, OrderId, UserId};
use serde::Serialize;

use crate::dispute::DisputeStatus;
use crate::escalation::EscalationCause;
use crate::jury::{Resolution, VoteSide};

/// Something observable happened to a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DisputeEvent {
    Filed {
        dispute_id: DisputeId,
        order_id: OrderId,
        filed_by: UserId,
        status: DisputeStatus,
    },
    MessagePosted {
        dispute_id: DisputeId,
        sender_id: UserId,
    },
    Accepted {
        dispute_id: DisputeId,
        moderator_id: UserId,
    },
    Escalated {
        dispute_id: DisputeId,
        cause: EscalationCause,
    },
    VoteRecorded {
        dispute_id: DisputeId,
        juror_id: UserId,
        vote: VoteSide,
        votes_cast: u32,
        jury_size: u32,
    },
    Resolved {
        dispute_id: DisputeId,
        resolution: Resolution,
    },
}

impl DisputeEvent {
    /// The dispute this event concerns.
    pub fn dispute_id(&self) -> DisputeId {
        match self {
            Self::Filed { dispute_id, .. }
            | Self::MessagePosted { dispute_id, .. }
            | Self::Accepted { dispute_id, .. }
            | Self::Escalated { dispute_id, .. }
            | Self::VoteRecorded { dispute_id, .. }
            | Self::Resolved { dispute_id, .. } => *dispute_id,
        }
    }

    /// Short event name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filed { .. } => "filed",
            Self::MessagePosted { .. } => "message_posted",
            Self::Accepted { .. } => "accepted",
            Self::Escalated { .. } => "escalated",
            Self::VoteRecorded { .. } => "vote_recorded",
            Self::Resolved { .. } => "resolved",
        }
    }
}

/// Receives dispute events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &DisputeEvent);
}

/// Writes every event to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &DisputeEvent) {
        match event {
            DisputeEvent::Resolved { dispute_id, resolution } => tracing::info!(
                dispute_id = %dispute_id,
                outcome = resolution.outcome.as_str(),
                compensation = resolution.compensation,
                "dispute resolved"
            ),
            DisputeEvent::Escalated { dispute_id, cause } => tracing::info!(
                dispute_id = %dispute_id,
                cause = cause.as_str(),
                "dispute escalated to jury"
            ),
            other => tracing::debug!(
                dispute_id = %other.dispute_id(),
                event = other.name(),
                "dispute event"
            ),
        }
    }
}

/// Forwards each event to every inner notifier in order.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target.
    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, event: &DisputeEvent) {
        for target in &self.targets {
            target.notify(event);
        }
    }
}
