//! # Dispute Service
//!
//! [`DisputeService`] is the single entry point for dispute operations. It
//! checks orders against the [`OrderDirectory`], delegates every state change
//! to [`DisputeRepository::modify`] so guards and writes are atomic, and
//! emits a [`DisputeEvent`] once a change is stored.
//!
//! Directory lookups (order status, display names) happen before the atomic
//! update, never inside it.

use std::sync::Arc;

use kome_core::{require_text, DisputeId, OrderId, Timestamp, UserId, ValidationError};

use crate::config::DisputeConfig;
use crate::directory::OrderDirectory;
use crate::dispute::{Dispute, DisputeStatus, Filing, MAX_REASON_CHARS, MAX_STATEMENT_CHARS};
use crate::error::DisputeError;
use crate::escalation::{EscalationCause, SweepReport};
use crate::jury::CastVote;
use crate::notify::{DisputeEvent, Notifier, TracingNotifier};
use crate::repository::{DisputeFilter, DisputeRepository};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Request to open a dispute against an order.
#[derive(Debug, Clone)]
pub struct FileDispute {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    /// The party filing; must be the buyer or the seller.
    pub filed_by: UserId,
    pub reason: String,
    /// Opening statement, posted as the first chat message.
    pub statement: String,
}

/// Orchestrates dispute operations over the storage, directory, and
/// notification ports.
#[derive(Clone)]
pub struct DisputeService {
    repo: Arc<dyn DisputeRepository>,
    directory: Arc<dyn OrderDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: Arc<DisputeConfig>,
}

impl DisputeService {
    /// Create a service that logs events and reads the system clock.
    pub fn new(
        repo: Arc<dyn DisputeRepository>,
        directory: Arc<dyn OrderDirectory>,
        config: DisputeConfig,
    ) -> Self {
        Self {
            repo,
            directory,
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            config: Arc::new(config),
        }
    }

    /// Replace the event sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DisputeConfig {
        &self.config
    }

    /// Current time according to the configured clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Open a dispute against an order.
    ///
    /// # Errors
    ///
    /// - [`DisputeError::Validation`] for malformed text or buyer/seller ids
    ///   that do not match the order.
    /// - [`DisputeError::OrderNotFound`] if the directory has no such order.
    /// - [`DisputeError::OrderNotDisputable`] unless the order is shipped,
    ///   delivered, or completed.
    /// - [`DisputeError::UnauthorizedParty`] if the filer is not on the order.
    /// - [`DisputeError::DuplicateDispute`] if the order already has one.
    pub async fn file_dispute(&self, req: FileDispute) -> Result<Dispute, DisputeError> {
        require_text("reason", &req.reason, MAX_REASON_CHARS)?;
        require_text("statement", &req.statement, MAX_STATEMENT_CHARS)?;

        let order = self
            .directory
            .order(&req.order_id)
            .await?
            .ok_or(DisputeError::OrderNotFound(req.order_id))?;
        if !order.status.is_disputable() {
            return Err(DisputeError::OrderNotDisputable {
                order_id: order.order_id,
                status: order.status,
            });
        }
        if req.filed_by != order.buyer_id && req.filed_by != order.seller_id {
            return Err(DisputeError::UnauthorizedParty {
                user_id: req.filed_by,
                action: "file a dispute on an order they are not party to",
            });
        }
        if req.buyer_id != order.buyer_id {
            return Err(ValidationError::Mismatch {
                field: "buyer_id",
                reason: format!("order {} was placed by {}", order.order_id, order.buyer_id),
            }
            .into());
        }
        if req.seller_id != order.seller_id {
            return Err(ValidationError::Mismatch {
                field: "seller_id",
                reason: format!("order {} was sold by {}", order.order_id, order.seller_id),
            }
            .into());
        }
        if let Some(existing) = self.repo.find_by_order(&order.order_id).await? {
            return Err(DisputeError::DuplicateDispute {
                order_id: order.order_id,
                existing: existing.id,
            });
        }

        let filer_name = self.display_name(&req.filed_by).await;
        let dispute = Dispute::file(
            Filing {
                order_id: order.order_id,
                buyer_id: order.buyer_id,
                seller_id: order.seller_id,
                filed_by: req.filed_by,
                filer_name,
                reason: req.reason,
                statement: req.statement,
                jury_size: self.config.jury_size,
                require_review: self.config.require_review,
            },
            self.clock.now(),
        )?;
        self.repo.insert(dispute.clone()).await?;

        tracing::info!(
            dispute_id = %dispute.id,
            order_id = %dispute.order_id,
            status = %dispute.status,
            "dispute filed"
        );
        self.notifier.notify(&DisputeEvent::Filed {
            dispute_id: dispute.id,
            order_id: dispute.order_id,
            filed_by: req.filed_by,
            status: dispute.status,
        });
        Ok(dispute)
    }

    /// Append a chat message from the buyer or seller.
    pub async fn post_message(
        &self,
        dispute_id: &DisputeId,
        sender_id: UserId,
        message: &str,
    ) -> Result<Dispute, DisputeError> {
        // Reject early so strangers and closed chats never reach the
        // directory; the guard is re-checked inside the atomic update.
        self.get(dispute_id).await?.check_can_post(&sender_id)?;
        let sender_name = self.display_name(&sender_id).await;
        let now = self.clock.now();
        let updated = self
            .repo
            .modify(
                dispute_id,
                Box::new(move |d: &mut Dispute| {
                    d.post_message(sender_id, sender_name, message, now).map(|_| ())
                }),
            )
            .await?;
        self.notifier.notify(&DisputeEvent::MessagePosted {
            dispute_id: updated.id,
            sender_id,
        });
        Ok(updated)
    }

    /// Replace the actor's own statement.
    pub async fn update_statement(
        &self,
        dispute_id: &DisputeId,
        actor_id: UserId,
        statement: &str,
    ) -> Result<Dispute, DisputeError> {
        let now = self.clock.now();
        self.repo
            .modify(
                dispute_id,
                Box::new(move |d: &mut Dispute| d.set_statement(actor_id, statement, now)),
            )
            .await
    }

    /// Release a pending dispute to the chat phase. Moderators only.
    pub async fn accept(
        &self,
        dispute_id: &DisputeId,
        moderator_id: UserId,
    ) -> Result<Dispute, DisputeError> {
        if !self.config.is_moderator(&moderator_id) {
            return Err(DisputeError::UnauthorizedParty {
                user_id: moderator_id,
                action: "accept disputes",
            });
        }
        let now = self.clock.now();
        let updated = self
            .repo
            .modify(
                dispute_id,
                Box::new(move |d: &mut Dispute| d.accept(moderator_id, now)),
            )
            .await?;
        tracing::info!(dispute_id = %updated.id, moderator_id = %moderator_id, "dispute accepted");
        self.notifier.notify(&DisputeEvent::Accepted {
            dispute_id: updated.id,
            moderator_id,
        });
        Ok(updated)
    }

    /// Escalate a chat to the jury on request of a party or moderator.
    ///
    /// # Errors
    ///
    /// [`DisputeError::InvalidState`] if the dispute is not `in_chat`, which
    /// includes one that was already escalated.
    pub async fn escalate(
        &self,
        dispute_id: &DisputeId,
        actor_id: UserId,
    ) -> Result<Dispute, DisputeError> {
        let is_moderator = self.config.is_moderator(&actor_id);
        let now = self.clock.now();
        let cause = EscalationCause::Manual { actor: actor_id };
        let updated = self
            .repo
            .modify(
                dispute_id,
                Box::new(move |d: &mut Dispute| {
                    if d.party_role(&actor_id).is_none() && !is_moderator {
                        return Err(DisputeError::UnauthorizedParty {
                            user_id: actor_id,
                            action: "escalate a dispute they are not party to",
                        });
                    }
                    d.escalate(cause, now)
                }),
            )
            .await?;
        self.notifier.notify(&DisputeEvent::Escalated {
            dispute_id: updated.id,
            cause,
        });
        Ok(updated)
    }

    /// Record a juror's vote; the deciding vote resolves the dispute in the
    /// same atomic update.
    pub async fn submit_vote(
        &self,
        dispute_id: &DisputeId,
        vote: CastVote,
    ) -> Result<Dispute, DisputeError> {
        let juror_id = vote.juror_id;
        let side = vote.vote;
        let now = self.clock.now();
        let updated = self
            .repo
            .modify(
                dispute_id,
                Box::new(move |d: &mut Dispute| d.cast_vote(vote, now).map(|_| ())),
            )
            .await?;

        self.notifier.notify(&DisputeEvent::VoteRecorded {
            dispute_id: updated.id,
            juror_id,
            vote: side,
            votes_cast: updated.jury.tally.total(),
            jury_size: updated.jury.size,
        });
        // The vote was accepted while in_jury, so a resolved record means this
        // vote reached quorum.
        if let Some(resolution) = &updated.resolution {
            self.notifier.notify(&DisputeEvent::Resolved {
                dispute_id: updated.id,
                resolution: resolution.clone(),
            });
        }
        Ok(updated)
    }

    pub async fn get(&self, dispute_id: &DisputeId) -> Result<Dispute, DisputeError> {
        self.repo
            .get(dispute_id)
            .await?
            .ok_or(DisputeError::DisputeNotFound(*dispute_id))
    }

    /// The dispute filed against `order_id`, if any.
    pub async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeError> {
        self.repo.find_by_order(order_id).await
    }

    pub async fn list(&self, filter: &DisputeFilter) -> Result<Vec<Dispute>, DisputeError> {
        self.repo.list(filter).await
    }

    /// Escalate every `in_chat` dispute whose first message is older than
    /// the configured window.
    ///
    /// Safe to run concurrently with itself and with manual escalation: the
    /// condition is re-checked inside each atomic update and a dispute that
    /// has already moved on is skipped. Per-dispute failures are counted and
    /// logged; only a failure to list candidates aborts the sweep.
    pub async fn sweep(&self, now: Timestamp) -> Result<SweepReport, DisputeError> {
        let policy = self.config.escalation_policy();
        let candidates = self
            .repo
            .list(&DisputeFilter::with_status(DisputeStatus::InChat))
            .await?;
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for candidate in candidates.iter().filter(|d| policy.is_due(d, &now)) {
            let mut escalated = false;
            let result = self
                .repo
                .modify(
                    &candidate.id,
                    Box::new(|d: &mut Dispute| {
                        if !policy.is_due(d, &now) {
                            return Ok(());
                        }
                        d.escalate(EscalationCause::Timeout, now)?;
                        escalated = true;
                        Ok(())
                    }),
                )
                .await;
            match result {
                Ok(_) if escalated => {
                    report.escalated += 1;
                    self.notifier.notify(&DisputeEvent::Escalated {
                        dispute_id: candidate.id,
                        cause: EscalationCause::Timeout,
                    });
                }
                Ok(_) => {
                    tracing::debug!(dispute_id = %candidate.id, "dispute already left chat, skipping");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(dispute_id = %candidate.id, error = %e, "escalation sweep failed for dispute");
                }
            }
        }

        if report.escalated > 0 || report.failed > 0 {
            tracing::info!(
                scanned = report.scanned,
                escalated = report.escalated,
                failed = report.failed,
                "escalation sweep finished"
            );
        }
        Ok(report)
    }

    /// Display name from the directory, falling back to the user id when the
    /// user is unknown or the directory is unreachable.
    async fn display_name(&self, user_id: &UserId) -> String {
        match self.directory.display_name(user_id).await {
            Ok(Some(name)) => name,
            Ok(None) => user_id.to_string(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "display name lookup failed");
                user_id.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryOrderDirectory, OrderSnapshot, OrderStatus};
    use crate::repository::InMemoryDisputeRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Directory that counts display-name lookups.
    struct CountingDirectory {
        inner: InMemoryOrderDirectory,
        name_lookups: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl OrderDirectory for CountingDirectory {
        async fn order(
            &self,
            order_id: &OrderId,
        ) -> Result<Option<OrderSnapshot>, crate::error::DirectoryError> {
            self.inner.order(order_id).await
        }

        async fn display_name(
            &self,
            user_id: &UserId,
        ) -> Result<Option<String>, crate::error::DirectoryError> {
            self.name_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.display_name(user_id).await
        }
    }

    fn setup(status: OrderStatus) -> (DisputeService, OrderSnapshot) {
        let directory = InMemoryOrderDirectory::new();
        let order = OrderSnapshot {
            order_id: OrderId::new(),
            buyer_id: UserId::new(),
            seller_id: UserId::new(),
            status,
        };
        directory.insert_order(order);
        directory.insert_user(order.buyer_id, "Kobayashi");
        let service = DisputeService::new(
            Arc::new(InMemoryDisputeRepository::new()),
            Arc::new(directory),
            DisputeConfig::default(),
        );
        (service, order)
    }

    fn request(order: &OrderSnapshot) -> FileDispute {
        FileDispute {
            order_id: order.order_id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            filed_by: order.buyer_id,
            reason: "Short weight".into(),
            statement: "The 5kg bag weighed 4.2kg.".into(),
        }
    }

    #[tokio::test]
    async fn filing_resolves_sender_name() {
        let (service, order) = setup(OrderStatus::Delivered);
        let d = service.file_dispute(request(&order)).await.unwrap();
        assert_eq!(d.chat_messages[0].sender_name, "Kobayashi");
        assert_eq!(d.jury.size, 5);
    }

    #[tokio::test]
    async fn filing_accepts_statement_beyond_chat_limit() {
        let (service, order) = setup(OrderStatus::Delivered);
        let mut req = request(&order);
        req.statement = "s".repeat(3000);
        let d = service.file_dispute(req).await.unwrap();
        assert_eq!(d.buyer_statement.as_deref().map(str::len), Some(3000));
        assert_eq!(d.chat_messages[0].message.len(), 3000);
    }

    #[tokio::test]
    async fn rejected_post_skips_name_lookup() {
        let inner = InMemoryOrderDirectory::new();
        let order = OrderSnapshot {
            order_id: OrderId::new(),
            buyer_id: UserId::new(),
            seller_id: UserId::new(),
            status: OrderStatus::Delivered,
        };
        inner.insert_order(order);
        let directory = Arc::new(CountingDirectory {
            inner,
            name_lookups: AtomicUsize::new(0),
        });
        let service = DisputeService::new(
            Arc::new(InMemoryDisputeRepository::new()),
            directory.clone(),
            DisputeConfig::default(),
        );
        let d = service.file_dispute(request(&order)).await.unwrap();
        let after_filing = directory.name_lookups.load(Ordering::SeqCst);

        let err = service
            .post_message(&d.id, UserId::new(), "let me in")
            .await
            .unwrap_err();
        assert!(matches!(err, DisputeError::UnauthorizedParty { .. }));
        assert_eq!(directory.name_lookups.load(Ordering::SeqCst), after_filing);

        service.post_message(&d.id, order.seller_id, "Checking the lot.").await.unwrap();
        assert_eq!(directory.name_lookups.load(Ordering::SeqCst), after_filing + 1);
    }

    #[tokio::test]
    async fn unknown_order_rejected() {
        let (service, order) = setup(OrderStatus::Delivered);
        let mut req = request(&order);
        req.order_id = OrderId::new();
        let err = service.file_dispute(req).await.unwrap_err();
        assert!(matches!(err, DisputeError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn unshipped_order_not_disputable() {
        let (service, order) = setup(OrderStatus::Paid);
        let err = service.file_dispute(request(&order)).await.unwrap_err();
        assert!(matches!(
            err,
            DisputeError::OrderNotDisputable {
                status: OrderStatus::Paid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn mismatched_seller_rejected() {
        let (service, order) = setup(OrderStatus::Shipped);
        let mut req = request(&order);
        req.seller_id = UserId::new();
        let err = service.file_dispute(req).await.unwrap_err();
        assert!(matches!(
            err,
            DisputeError::Validation(ValidationError::Mismatch { field: "seller_id", .. })
        ));
    }

    #[tokio::test]
    async fn stranger_cannot_file() {
        let (service, order) = setup(OrderStatus::Completed);
        let mut req = request(&order);
        req.filed_by = UserId::new();
        let err = service.file_dispute(req).await.unwrap_err();
        assert!(matches!(err, DisputeError::UnauthorizedParty { .. }));
    }

    #[tokio::test]
    async fn second_filing_is_duplicate() {
        let (service, order) = setup(OrderStatus::Delivered);
        service.file_dispute(request(&order)).await.unwrap();
        let err = service.file_dispute(request(&order)).await.unwrap_err();
        assert!(matches!(err, DisputeError::DuplicateDispute { .. }));
    }

    #[tokio::test]
    async fn accept_requires_moderator() {
        let (service, order) = setup(OrderStatus::Delivered);
        let d = service.file_dispute(request(&order)).await.unwrap();
        let err = service.accept(&d.id, UserId::new()).await.unwrap_err();
        assert!(matches!(err, DisputeError::UnauthorizedParty { .. }));
    }

    #[tokio::test]
    async fn stranger_cannot_escalate() {
        let (service, order) = setup(OrderStatus::Delivered);
        let d = service.file_dispute(request(&order)).await.unwrap();
        let err = service.escalate(&d.id, UserId::new()).await.unwrap_err();
        assert!(matches!(err, DisputeError::UnauthorizedParty { .. }));
        assert_eq!(service.get(&d.id).await.unwrap().status, DisputeStatus::InChat);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (service, _) = setup(OrderStatus::Delivered);
        let err = service.get(&DisputeId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
