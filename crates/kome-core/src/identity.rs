//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier the dispute service handles.
//! These prevent accidental identifier confusion: you cannot pass an
//! `OrderId` where a `DisputeId` is expected, or a juror's `UserId` where a
//! message id belongs.
//!
//! All identifiers serialize as a bare UUID string (`#[serde(transparent)]`)
//! so the wire format stays compatible with the marketplace's order and user
//! services. `Display` adds a namespace prefix for log readability.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            /// Parse a bare UUID, or a UUID carrying this type's display prefix.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidIdentifier {
                        kind: $label,
                        value: s.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_newtype!(
    /// Unique identifier for a dispute record.
    DisputeId,
    "dispute",
    "dispute id"
);

uuid_newtype!(
    /// Identifier of a marketplace order, owned by the order service.
    OrderId,
    "order",
    "order id"
);

uuid_newtype!(
    /// Identifier of a marketplace user: buyer, seller, juror or moderator.
    UserId,
    "user",
    "user id"
);

uuid_newtype!(
    /// Identifier of a single chat message within a dispute.
    MessageId,
    "message",
    "message id"
);

uuid_newtype!(
    /// Identifier of a single jury vote.
    VoteId,
    "vote",
    "vote id"
);
