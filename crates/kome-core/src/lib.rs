//! # kome-core: Foundational Types for Kome Disputes
//!
//! Leaf crate of the workspace. Defines the identifier newtypes, the UTC
//! timestamp type, and the validation error shared by every other crate.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `DisputeId`, `OrderId`, `UserId`,
//!    `MessageId`, `VoteId` are distinct types. A buyer id cannot be passed
//!    where a dispute id is expected.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] is always UTC, seconds
//!    precision, and serializes with a `Z` suffix.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `kome-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::{require_text, ValidationError};
pub use identity::{DisputeId, MessageId, OrderId, UserId, VoteId};
pub use temporal::Timestamp;
