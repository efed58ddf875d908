//! # kome-dispute: Marketplace Dispute Resolution
//!
//! Manages the post-purchase dispute lifecycle between a buyer and a rice
//! farmer:
//!
//! ```text
//! pending ──accept()──▶ in_chat ──escalate() / sweep()──▶ in_jury ──quorum──▶ resolved
//! ```
//!
//! - **Error** ([`error`]): Structured error hierarchy for dispute operations.
//!
//! - **Dispute** ([`dispute`]): The dispute record and its state machine.
//!
//! - **Chat** ([`chat`]): Append-only buyer/seller negotiation log.
//!
//! - **Jury** ([`jury`]): Vote tally, quorum detection, and the resolution
//!   calculator.
//!
//! - **Escalation** ([`escalation`]): Manual and timed escalation from chat to
//!   jury, including the idempotent sweep report.
//!
//! - **Repository** ([`repository`]): Storage port with per-record atomic
//!   updates, plus the in-memory implementation.
//!
//! - **Directory** ([`directory`]): Order and user lookup port.
//!
//! - **Notify** ([`notify`]): Fire-and-forget lifecycle events.
//!
//! - **Service** ([`service`]): [`DisputeService`], the entry point that
//!   composes all of the above.

pub mod chat;
pub mod config;
pub mod directory;
pub mod dispute;
pub mod error;
pub mod escalation;
pub mod jury;
pub mod notify;
pub mod repository;
pub mod service;

// Error types
pub use error::{DirectoryError, DisputeError};

// Dispute lifecycle
pub use dispute::{Dispute, DisputeStatus, Filing, PartyRole, TransitionCause, TransitionRecord};

// Chat
pub use chat::ChatMessage;

// Jury
pub use jury::{CastVote, Jury, JuryVote, Outcome, Resolution, Tally, VoteSide};

// Escalation
pub use escalation::{Escalation, EscalationCause, EscalationPolicy, SweepReport};

// Ports and adapters
pub use directory::{InMemoryOrderDirectory, OrderDirectory, OrderSnapshot, OrderStatus};
pub use notify::{DisputeEvent, FanoutNotifier, Notifier, TracingNotifier};
pub use repository::{DisputeFilter, DisputeRepository, InMemoryDisputeRepository, Mutation};

// Service
pub use config::DisputeConfig;
pub use service::{Clock, DisputeService, FileDispute, SystemClock};
