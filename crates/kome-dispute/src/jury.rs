//! # Jury Voting Aggregator and Resolution Calculator
//!
//! Third-party jurors vote for the buyer's or the seller's side. The tally is
//! a plain majority count: `confidence` and `comment` are recorded for the
//! parties to read but never weight the outcome.
//!
//! ## Invariants
//!
//! - [`Tally`] only increments one side together with the total, so
//!   `total == buyer + seller` holds by construction.
//! - Each juror appears at most once in [`Jury::votes`].
//! - The resolution is computed exactly once, by the vote that brings the
//!   tally to [`Jury::size`].
//!
//! ## Compensation Policy
//!
//! | Outcome | Summary | Compensation |
//! |---|---|---|
//! | buyer majority | "buyer's claim upheld" | 25% of order value refunded |
//! | seller majority or tie | "seller's claim upheld" | 10% goodwill payment |

use kome_core::{require_text, DisputeId, Timestamp, UserId, ValidationError, VoteId};
use serde::{Deserialize, Serialize};

/// Compensation percentage awarded when the buyer's claim is upheld.
pub const BUYER_WIN_COMPENSATION: u8 = 25;

/// Compensation percentage awarded when the seller's claim is upheld.
pub const SELLER_WIN_COMPENSATION: u8 = 10;

/// Default number of votes required to resolve a dispute.
pub const DEFAULT_JURY_SIZE: u32 = 5;

/// Maximum length of a juror's comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 1000;

/// The side a juror votes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSide {
    /// The buyer's claim.
    Buyer,
    /// The seller's position.
    Seller,
}

impl VoteSide {
    /// The canonical string name of this side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

impl std::fmt::Display for VoteSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vote as submitted by a juror, before it is attached to a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    /// The voting juror.
    pub juror_id: UserId,
    /// The side voted for.
    pub vote: VoteSide,
    /// Self-reported confidence, 0–100. Advisory only.
    pub confidence: u8,
    /// Optional free-text reasoning.
    #[serde(default)]
    pub comment: Option<String>,
}

impl CastVote {
    /// Validate the vote and normalize its comment.
    ///
    /// Blank comments become `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `confidence` exceeds 100 or the comment
    /// exceeds [`MAX_COMMENT_CHARS`].
    pub fn validated(self) -> Result<Self, ValidationError> {
        if self.confidence > 100 {
            return Err(ValidationError::OutOfRange {
                field: "confidence",
                min: 0,
                max: 100,
                actual: i64::from(self.confidence),
            });
        }
        let comment = match self.comment.as_deref() {
            Some(c) if !c.trim().is_empty() => Some(require_text("comment", c, MAX_COMMENT_CHARS)?),
            _ => None,
        };
        Ok(Self { comment, ..self })
    }
}

/// A recorded jury vote. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JuryVote {
    /// Unique vote identifier.
    pub id: VoteId,
    /// The dispute voted on.
    pub dispute_id: DisputeId,
    /// The voting juror.
    pub juror_id: UserId,
    /// The side voted for.
    pub vote: VoteSide,
    /// Self-reported confidence, 0–100.
    pub confidence: u8,
    /// Optional free-text reasoning.
    pub comment: Option<String>,
    /// When the vote was recorded.
    pub created_at: Timestamp,
}

/// Running vote counts per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    buyer: u32,
    seller: u32,
}

impl Tally {
    /// Votes for the buyer.
    pub fn buyer(&self) -> u32 {
        self.buyer
    }

    /// Votes for the seller.
    pub fn seller(&self) -> u32 {
        self.seller
    }

    /// Total votes received.
    pub fn total(&self) -> u32 {
        self.buyer + self.seller
    }

    /// Count one vote for `side`.
    pub fn record(&mut self, side: VoteSide) {
        match side {
            VoteSide::Buyer => self.buyer += 1,
            VoteSide::Seller => self.seller += 1,
        }
    }
}

/// Which party prevailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The buyer's claim was upheld.
    Buyer,
    /// The seller's position was upheld.
    Seller,
}

impl Outcome {
    /// The canonical string name of this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The final outcome of a dispute, set once at quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Which party prevailed.
    pub outcome: Outcome,
    /// Human-readable summary.
    pub summary: String,
    /// Percentage of order value credited, 0–100.
    pub compensation: u8,
}

impl Resolution {
    /// Derive the resolution from a final tally.
    ///
    /// Ties go to the seller: only a strict buyer majority upholds the claim.
    pub fn from_tally(tally: &Tally) -> Self {
        if tally.buyer() > tally.seller() {
            Self {
                outcome: Outcome::Buyer,
                summary: "buyer's claim upheld".to_string(),
                compensation: BUYER_WIN_COMPENSATION,
            }
        } else {
            Self {
                outcome: Outcome::Seller,
                summary: "seller's claim upheld".to_string(),
                compensation: SELLER_WIN_COMPENSATION,
            }
        }
    }
}

/// The jury panel attached to a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jury {
    /// Number of votes required to resolve. Fixed at filing.
    pub size: u32,
    /// Running counts.
    pub tally: Tally,
    /// Every vote received, in arrival order.
    pub votes: Vec<JuryVote>,
}

impl Jury {
    /// Create an empty panel requiring `size` votes.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            tally: Tally::default(),
            votes: Vec::new(),
        }
    }

    /// Whether `juror` already has a vote on record.
    pub fn has_voted(&self, juror: &UserId) -> bool {
        self.votes.iter().any(|v| &v.juror_id == juror)
    }

    /// Whether the tally has reached the required number of votes.
    pub fn quorum_reached(&self) -> bool {
        self.tally.total() >= self.size
    }

    /// Append a vote and count it.
    pub(crate) fn record(&mut self, vote: JuryVote) {
        self.tally.record(vote.vote);
        self.votes.push(vote);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tally(buyer: u32, seller: u32) -> Tally {
        let mut t = Tally::default();
        for _ in 0..buyer {
            t.record(VoteSide::Buyer);
        }
        for _ in 0..seller {
            t.record(VoteSide::Seller);
        }
        t
    }

    #[test]
    fn buyer_majority_upholds_claim() {
        let r = Resolution::from_tally(&tally(3, 2));
        assert_eq!(r.outcome, Outcome::Buyer);
        assert_eq!(r.summary, "buyer's claim upheld");
        assert_eq!(r.compensation, 25);
    }

    #[test]
    fn seller_majority_pays_goodwill() {
        let r = Resolution::from_tally(&tally(2, 3));
        assert_eq!(r.outcome, Outcome::Seller);
        assert_eq!(r.summary, "seller's claim upheld");
        assert_eq!(r.compensation, 10);
    }

    #[test]
    fn tie_goes_to_seller() {
        let r = Resolution::from_tally(&tally(2, 2));
        assert_eq!(r.outcome, Outcome::Seller);
        assert_eq!(r.compensation, 10);
    }

    #[test]
    fn confidence_above_hundred_rejected() {
        let vote = CastVote {
            juror_id: UserId::new(),
            vote: VoteSide::Buyer,
            confidence: 101,
            comment: None,
        };
        assert!(matches!(
            vote.validated(),
            Err(ValidationError::OutOfRange { field: "confidence", .. })
        ));
    }

    #[test]
    fn blank_comment_normalized_to_none() {
        let vote = CastVote {
            juror_id: UserId::new(),
            vote: VoteSide::Seller,
            confidence: 80,
            comment: Some("   ".to_string()),
        }
        .validated()
        .unwrap();
        assert_eq!(vote.comment, None);
    }

    #[test]
    fn quorum_and_has_voted() {
        let juror = UserId::new();
        let mut jury = Jury::new(1);
        assert!(!jury.quorum_reached());
        jury.record(JuryVote {
            id: VoteId::new(),
            dispute_id: DisputeId::new(),
            juror_id: juror,
            vote: VoteSide::Buyer,
            confidence: 50,
            comment: None,
            created_at: Timestamp::now(),
        });
        assert!(jury.has_voted(&juror));
        assert!(!jury.has_voted(&UserId::new()));
        assert!(jury.quorum_reached());
    }

    proptest! {
        #[test]
        fn tally_total_is_sum_of_sides(sides in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut t = Tally::default();
            for buyer in &sides {
                t.record(if *buyer { VoteSide::Buyer } else { VoteSide::Seller });
                prop_assert_eq!(t.total(), t.buyer() + t.seller());
            }
            prop_assert_eq!(t.total() as usize, sides.len());
        }

        #[test]
        fn resolution_is_deterministic(buyer in 0u32..20, seller in 0u32..20) {
            let r = Resolution::from_tally(&tally(buyer, seller));
            if buyer > seller {
                prop_assert_eq!(r.compensation, BUYER_WIN_COMPENSATION);
            } else {
                prop_assert_eq!(r.compensation, SELLER_WIN_COMPENSATION);
            }
        }
    }
}
