//! # Dispute Error Types
//!
//! Structured error hierarchy for the dispute subsystem. Every variant is a
//! recoverable, caller-visible rejection: the operation that produced it made
//! no change to the dispute record.
//!
//! State machine rejections carry the dispute id, its current status, and the
//! attempted operation so the UI can explain why the action is unavailable.

use kome_core::{DisputeId, OrderId, UserId, ValidationError};
use thiserror::Error;

use crate::directory::OrderStatus;
use crate::dispute::DisputeStatus;

/// Errors arising from dispute operations.
#[derive(Error, Debug)]
pub enum DisputeError {
    /// The referenced dispute does not exist.
    #[error("dispute {0} not found")]
    DisputeNotFound(DisputeId),

    /// The referenced order does not exist in the order directory.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The operation is not permitted in the dispute's current status.
    #[error("cannot {operation} dispute {dispute_id} while it is {status}")]
    InvalidState {
        /// The dispute identifier.
        dispute_id: DisputeId,
        /// The status at the time of the attempt.
        status: DisputeStatus,
        /// The attempted operation (e.g., "post a message", "vote on").
        operation: &'static str,
    },

    /// The order exists but is not in a status that can be disputed.
    #[error("order {order_id} is {status} and cannot be disputed")]
    OrderNotDisputable {
        /// The order identifier.
        order_id: OrderId,
        /// The order's current status.
        status: OrderStatus,
    },

    /// The acting user is not permitted to perform the action.
    #[error("user {user_id} is not permitted to {action}")]
    UnauthorizedParty {
        /// The rejected user.
        user_id: UserId,
        /// The attempted action.
        action: &'static str,
    },

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The order already has a dispute.
    #[error("order {order_id} already has dispute {existing}")]
    DuplicateDispute {
        /// The order identifier.
        order_id: OrderId,
        /// The dispute already filed against it.
        existing: DisputeId,
    },

    /// The juror has already cast a vote on this dispute.
    #[error("juror {juror_id} has already voted on dispute {dispute_id}")]
    AlreadyVoted {
        /// The dispute identifier.
        dispute_id: DisputeId,
        /// The juror who attempted a second vote.
        juror_id: UserId,
    },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The order directory could not be reached.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl DisputeError {
    /// Whether this error means the referenced dispute or order is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DisputeNotFound(_) | Self::OrderNotFound(_))
    }
}

/// Failure reported by an [`OrderDirectory`](crate::directory::OrderDirectory)
/// implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("order directory unavailable: {0}")]
pub struct DirectoryError(pub String);
