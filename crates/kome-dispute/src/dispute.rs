//! # Dispute Lifecycle State Machine
//!
//! A dispute is filed against a shipped, delivered, or completed order and
//! moves strictly forward:
//!
//! ```text
//! Pending ──▶ InChat ──▶ InJury ──▶ Resolved
//! ```
//!
//! `Pending` is only used when filings are held for moderator review;
//! otherwise a dispute is born `InChat` with the filer's statement as its
//! first message. `Resolved` is terminal.
//!
//! Every method validates all guards before touching the record, so a
//! rejected operation leaves the dispute exactly as it was. Successful
//! transitions are appended to [`Dispute::transition_log`].

use kome_core::{require_text, DisputeId, OrderId, Timestamp, UserId, ValidationError, VoteId};
use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::error::DisputeError;
use crate::escalation::{Escalation, EscalationCause};
use crate::jury::{CastVote, Jury, JuryVote, Resolution};

/// Maximum length of the dispute reason, in characters.
pub const MAX_REASON_CHARS: usize = 200;

/// Maximum length of a party statement, in characters.
pub const MAX_STATEMENT_CHARS: usize = 5000;

// ── Dispute Status ──────────────────────────────────────────────────

/// The lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// Filed, awaiting moderator acceptance.
    Pending,
    /// Buyer and seller are negotiating.
    InChat,
    /// Escalated; jurors are voting.
    InJury,
    /// Quorum reached and resolution applied. Terminal.
    Resolved,
}

impl DisputeStatus {
    /// Return the canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InChat => "in_chat",
            Self::InJury => "in_jury",
            Self::Resolved => "resolved",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Statuses reachable from this one in a single transition.
    pub fn valid_transitions(&self) -> &'static [DisputeStatus] {
        match self {
            Self::Pending => &[Self::InChat],
            Self::InChat => &[Self::InJury],
            Self::InJury => &[Self::Resolved],
            Self::Resolved => &[],
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DisputeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_chat" => Ok(Self::InChat),
            "in_jury" => Ok(Self::InJury),
            "resolved" => Ok(Self::Resolved),
            other => Err(ValidationError::InvalidIdentifier {
                kind: "dispute status",
                value: other.to_string(),
            }),
        }
    }
}

/// Which side of the order a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// The purchasing consumer.
    Buyer,
    /// The rice farmer.
    Seller,
}

// ── Transition Audit ────────────────────────────────────────────────

/// What triggered a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionCause {
    /// Initial filing.
    Filed {
        /// The filing party.
        by: UserId,
    },
    /// Moderator released a pending dispute to chat.
    Accepted {
        /// The accepting moderator.
        by: UserId,
    },
    /// Chat escalated to the jury.
    Escalated {
        /// Manual or timeout.
        cause: EscalationCause,
    },
    /// The deciding vote reached quorum.
    QuorumReached,
}

/// Audit entry for a single status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition, `None` for the filing entry.
    pub from: Option<DisputeStatus>,
    /// Status after the transition.
    pub to: DisputeStatus,
    /// What caused it.
    pub cause: TransitionCause,
    /// When it happened.
    pub at: Timestamp,
}

// ── Dispute ─────────────────────────────────────────────────────────

/// Validated inputs for creating a dispute. The service builds this after
/// checking the order against the directory.
#[derive(Debug, Clone)]
pub struct Filing {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub filed_by: UserId,
    pub filer_name: String,
    pub reason: String,
    pub statement: String,
    pub jury_size: u32,
    pub require_review: bool,
}

/// A dispute over a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    /// Short reason given at filing. Immutable.
    pub reason: String,
    pub buyer_statement: Option<String>,
    pub seller_statement: Option<String>,
    pub status: DisputeStatus,
    /// Set exactly once, on the transition to `Resolved`.
    pub resolution: Option<Resolution>,
    /// Append-only negotiation log.
    pub chat_messages: Vec<ChatMessage>,
    pub jury: Jury,
    pub escalation: Option<Escalation>,
    pub transition_log: Vec<TransitionRecord>,
    /// Incremented on every mutation.
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dispute {
    /// Create a new dispute from a filing.
    ///
    /// The filer's statement is stored as their own statement and seeds the
    /// chat as its first message.
    ///
    /// # Errors
    ///
    /// - [`DisputeError::UnauthorizedParty`] if `filed_by` is neither buyer
    ///   nor seller.
    /// - [`DisputeError::Validation`] for a blank or oversized reason or
    ///   statement, or a zero jury size.
    pub fn file(filing: Filing, now: Timestamp) -> Result<Self, DisputeError> {
        let role = if filing.filed_by == filing.buyer_id {
            PartyRole::Buyer
        } else if filing.filed_by == filing.seller_id {
            PartyRole::Seller
        } else {
            return Err(DisputeError::UnauthorizedParty {
                user_id: filing.filed_by,
                action: "file a dispute on an order they are not party to",
            });
        };
        if filing.buyer_id == filing.seller_id {
            return Err(ValidationError::Mismatch {
                field: "seller_id",
                reason: "buyer and seller must be different users".to_string(),
            }
            .into());
        }
        if filing.jury_size == 0 {
            return Err(ValidationError::OutOfRange {
                field: "jury_size",
                min: 1,
                max: i64::from(u32::MAX),
                actual: 0,
            }
            .into());
        }
        let reason = require_text("reason", &filing.reason, MAX_REASON_CHARS)?;
        let statement = require_text("statement", &filing.statement, MAX_STATEMENT_CHARS)?;

        let id = DisputeId::new();
        let opening = ChatMessage::opening(id, filing.filed_by, filing.filer_name, &statement, now)?;
        let status = if filing.require_review {
            DisputeStatus::Pending
        } else {
            DisputeStatus::InChat
        };
        let (buyer_statement, seller_statement) = match role {
            PartyRole::Buyer => (Some(statement), None),
            PartyRole::Seller => (None, Some(statement)),
        };

        Ok(Self {
            id,
            order_id: filing.order_id,
            buyer_id: filing.buyer_id,
            seller_id: filing.seller_id,
            reason,
            buyer_statement,
            seller_statement,
            status,
            resolution: None,
            chat_messages: vec![opening],
            jury: Jury::new(filing.jury_size),
            escalation: None,
            transition_log: vec![TransitionRecord {
                from: None,
                to: status,
                cause: TransitionCause::Filed { by: filing.filed_by },
                at: now,
            }],
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// The role `user` plays in this dispute, if any.
    pub fn party_role(&self, user: &UserId) -> Option<PartyRole> {
        if user == &self.buyer_id {
            Some(PartyRole::Buyer)
        } else if user == &self.seller_id {
            Some(PartyRole::Seller)
        } else {
            None
        }
    }

    /// Timestamp of the opening chat message; starts the escalation clock.
    pub fn first_message_at(&self) -> Option<&Timestamp> {
        self.chat_messages.first().map(|m| &m.created_at)
    }

    /// Append a chat message from the buyer or seller.
    ///
    /// # Errors
    ///
    /// [`DisputeError::InvalidState`] unless `InChat`;
    /// [`DisputeError::UnauthorizedParty`] for non-parties;
    /// [`DisputeError::Validation`] for blank or oversized text.
    pub fn post_message(
        &mut self,
        sender: UserId,
        sender_name: impl Into<String>,
        text: &str,
        now: Timestamp,
    ) -> Result<&ChatMessage, DisputeError> {
        self.check_can_post(&sender)?;
        let message = ChatMessage::compose(self.id, sender, sender_name, text, now)?;
        self.chat_messages.push(message);
        self.touch(now);
        Ok(&self.chat_messages[self.chat_messages.len() - 1])
    }

    /// Whether `sender` may post right now: the chat is open and they are
    /// buyer or seller. Does not look at the message text.
    pub fn check_can_post(&self, sender: &UserId) -> Result<(), DisputeError> {
        self.require_status(DisputeStatus::InChat, "post a message to")?;
        if self.party_role(sender).is_none() {
            return Err(DisputeError::UnauthorizedParty {
                user_id: *sender,
                action: "post in a dispute they are not party to",
            });
        }
        Ok(())
    }

    /// Replace the actor's own statement. Allowed in any status before
    /// `Resolved`.
    pub fn set_statement(
        &mut self,
        actor: UserId,
        text: &str,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        if self.status.is_terminal() {
            return Err(self.invalid_state("update a statement on"));
        }
        let role = self.party_role(&actor).ok_or(DisputeError::UnauthorizedParty {
            user_id: actor,
            action: "edit a statement in a dispute they are not party to",
        })?;
        let statement = require_text("statement", text, MAX_STATEMENT_CHARS)?;
        match role {
            PartyRole::Buyer => self.buyer_statement = Some(statement),
            PartyRole::Seller => self.seller_statement = Some(statement),
        }
        self.touch(now);
        Ok(())
    }

    /// Release a pending dispute to the chat phase. The caller is
    /// responsible for checking the moderator's authority.
    pub fn accept(&mut self, moderator: UserId, now: Timestamp) -> Result<(), DisputeError> {
        self.require_status(DisputeStatus::Pending, "accept")?;
        self.transition(
            DisputeStatus::InChat,
            TransitionCause::Accepted { by: moderator },
            now,
        );
        Ok(())
    }

    /// Move the dispute to the jury phase.
    ///
    /// # Errors
    ///
    /// [`DisputeError::InvalidState`] unless `InChat`, which also covers a
    /// dispute that has already been escalated.
    pub fn escalate(&mut self, cause: EscalationCause, now: Timestamp) -> Result<(), DisputeError> {
        self.require_status(DisputeStatus::InChat, "escalate")?;
        if self.escalation.is_some() {
            return Err(self.invalid_state("escalate"));
        }
        self.escalation = Some(Escalation { cause, at: now });
        self.transition(DisputeStatus::InJury, TransitionCause::Escalated { cause }, now);
        Ok(())
    }

    /// Record a juror's vote, resolving the dispute if it reaches quorum.
    ///
    /// Returns the resolution when this vote was the deciding one.
    ///
    /// # Errors
    ///
    /// - [`DisputeError::InvalidState`] unless `InJury`.
    /// - [`DisputeError::UnauthorizedParty`] if the juror is the buyer or seller.
    /// - [`DisputeError::AlreadyVoted`] on a second vote by the same juror.
    /// - [`DisputeError::Validation`] for out-of-range confidence or an
    ///   oversized comment.
    pub fn cast_vote(
        &mut self,
        vote: CastVote,
        now: Timestamp,
    ) -> Result<Option<&Resolution>, DisputeError> {
        self.require_status(DisputeStatus::InJury, "vote on")?;
        if self.party_role(&vote.juror_id).is_some() {
            return Err(DisputeError::UnauthorizedParty {
                user_id: vote.juror_id,
                action: "vote on their own dispute",
            });
        }
        if self.jury.has_voted(&vote.juror_id) {
            return Err(DisputeError::AlreadyVoted {
                dispute_id: self.id,
                juror_id: vote.juror_id,
            });
        }
        let vote = vote.validated()?;

        self.jury.record(JuryVote {
            id: VoteId::new(),
            dispute_id: self.id,
            juror_id: vote.juror_id,
            vote: vote.vote,
            confidence: vote.confidence,
            comment: vote.comment,
            created_at: now,
        });

        if self.jury.quorum_reached() {
            self.resolution = Some(Resolution::from_tally(&self.jury.tally));
            self.transition(DisputeStatus::Resolved, TransitionCause::QuorumReached, now);
        } else {
            self.touch(now);
        }
        Ok(self.resolution.as_ref())
    }

    fn require_status(
        &self,
        expected: DisputeStatus,
        operation: &'static str,
    ) -> Result<(), DisputeError> {
        if self.status != expected {
            return Err(self.invalid_state(operation));
        }
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> DisputeError {
        DisputeError::InvalidState {
            dispute_id: self.id,
            status: self.status,
            operation,
        }
    }

    fn transition(&mut self, to: DisputeStatus, cause: TransitionCause, now: Timestamp) {
        debug_assert!(self.status.valid_transitions().contains(&to));
        self.transition_log.push(TransitionRecord {
            from: Some(self.status),
            to,
            cause,
            at: now,
        });
        self.status = to;
        self.touch(now);
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
        self.version += 1;
    }
}
