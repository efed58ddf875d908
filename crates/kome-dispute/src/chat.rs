//! # Chat Sub-log
//!
//! The buyer/seller negotiation log. Messages are immutable once composed and
//! are only ever appended to [`Dispute::chat_messages`](crate::Dispute), so
//! insertion order is conversation order.
//!
//! The first message of every dispute is the filer's opening statement; its
//! timestamp starts the escalation clock.

use kome_core::{require_text, DisputeId, MessageId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

use crate::dispute::MAX_STATEMENT_CHARS;

/// Maximum length of a chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A single message in a dispute's negotiation chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// The dispute this message belongs to.
    pub dispute_id: DisputeId,
    /// The buyer or seller who sent it.
    pub sender_id: UserId,
    /// Display name of the sender at the time of sending.
    pub sender_name: String,
    /// Message text, trimmed.
    pub message: String,
    /// When the message was appended.
    pub created_at: Timestamp,
}

impl ChatMessage {
    /// Compose a new message, validating the text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the text is blank or longer than
    /// [`MAX_MESSAGE_CHARS`].
    pub fn compose(
        dispute_id: DisputeId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        text: &str,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let message = require_text("message", text, MAX_MESSAGE_CHARS)?;
        Ok(Self::build(dispute_id, sender_id, sender_name.into(), message, now))
    }

    /// The first message of a dispute, carrying the filer's opening
    /// statement.
    ///
    /// Bounded by [`MAX_STATEMENT_CHARS`] instead of [`MAX_MESSAGE_CHARS`].
    pub fn opening(
        dispute_id: DisputeId,
        filer_id: UserId,
        filer_name: impl Into<String>,
        statement: &str,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let message = require_text("statement", statement, MAX_STATEMENT_CHARS)?;
        Ok(Self::build(dispute_id, filer_id, filer_name.into(), message, now))
    }

    fn build(
        dispute_id: DisputeId,
        sender_id: UserId,
        sender_name: String,
        message: String,
        now: Timestamp,
    ) -> Self {
        let sender_name = if sender_name.trim().is_empty() {
            sender_id.to_string()
        } else {
            sender_name
        };
        Self {
            id: MessageId::new(),
            dispute_id,
            sender_id,
            sender_name,
            message,
            created_at: now,
        }
    }
}
