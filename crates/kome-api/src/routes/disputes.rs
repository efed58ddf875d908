//! # Dispute API Routes
//!
//! HTTP surface for the dispute lifecycle:
//!
//! ```text
//! pending ──accept──▶ in_chat ──escalate / sweep──▶ in_jury ──votes reach quorum──▶ resolved
//! ```
//!
//! Handlers validate request shape, then delegate to
//! [`kome_dispute::DisputeService`], which enforces the state machine and
//! applies each change atomically. Caller identity travels in the request
//! body; authentication happens upstream of this service.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kome_core::{DisputeId, OrderId, UserId};
use kome_dispute::{
    CastVote, ChatMessage, Dispute, DisputeFilter, DisputeStatus, EscalationCause, FileDispute,
    JuryVote, VoteSide,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, parse_id, Validate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to open a dispute against an order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FileDisputeRequest {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    /// The filing party; must be the order's buyer or seller.
    pub filed_by: Uuid,
    /// Short reason, at most 200 characters.
    pub reason: String,
    /// Opening statement, at most 5000 characters; becomes the first chat message.
    pub statement: String,
}

impl Validate for FileDisputeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        if self.statement.trim().is_empty() {
            return Err("statement must not be empty".to_string());
        }
        Ok(())
    }
}

/// A chat message from the buyer or seller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub sender_id: Uuid,
    /// Message text, at most 2000 characters.
    pub message: String,
}

/// Replacement statement for the acting party.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatementRequest {
    pub actor_id: Uuid,
    pub statement: String,
}

/// Identifies who is performing an accept or escalate action.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ActorRequest {
    pub actor_id: Uuid,
}

/// Side a juror votes for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Buyer,
    Seller,
}

impl From<VoteChoice> for VoteSide {
    fn from(c: VoteChoice) -> Self {
        match c {
            VoteChoice::Buyer => VoteSide::Buyer,
            VoteChoice::Seller => VoteSide::Seller,
        }
    }
}

/// A juror's vote.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitVoteRequest {
    pub juror_id: Uuid,
    pub vote: VoteChoice,
    /// Self-reported confidence, 0–100.
    pub confidence: u8,
    /// Optional reasoning, at most 1000 characters.
    #[serde(default)]
    pub comment: Option<String>,
}

impl Validate for SubmitVoteRequest {
    fn validate(&self) -> Result<(), String> {
        if self.confidence > 100 {
            return Err(format!("confidence must be between 0 and 100, got {}", self.confidence));
        }
        Ok(())
    }
}

/// Filters for listing disputes.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDisputesQuery {
    /// `pending`, `in_chat`, `in_jury` or `resolved`.
    pub status: Option<String>,
    /// Only disputes where this user is buyer or seller.
    pub party: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageResponse {
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub vote_id: Uuid,
    pub juror_id: Uuid,
    pub vote: String,
    pub confidence: u8,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolutionResponse {
    /// `buyer` or `seller`.
    pub outcome: String,
    pub summary: String,
    /// Percentage of the order value credited.
    pub compensation: u8,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EscalationResponse {
    /// `manual` or `timeout`.
    pub cause: String,
    /// Who escalated, for manual escalations.
    pub actor_id: Option<Uuid>,
    pub escalated_at: String,
}

/// Full dispute record in API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeResponse {
    pub dispute_id: Uuid,
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub reason: String,
    pub buyer_statement: Option<String>,
    pub seller_statement: Option<String>,
    pub status: String,
    pub resolution: Option<ResolutionResponse>,
    pub chat_messages: Vec<ChatMessageResponse>,
    pub jury_size: u32,
    pub jury_votes: u32,
    pub buyer_vote_count: u32,
    pub seller_vote_count: u32,
    pub votes: Vec<VoteResponse>,
    pub escalation: Option<EscalationResponse>,
    pub valid_transitions: Vec<String>,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the dispute lifecycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/disputes", post(file_dispute).get(list_disputes))
        .route("/v1/disputes/{id}", get(get_dispute))
        .route("/v1/disputes/{id}/messages", post(post_message))
        .route("/v1/disputes/{id}/statement", put(update_statement))
        .route("/v1/disputes/{id}/accept", post(accept_dispute))
        .route("/v1/disputes/{id}/escalate", post(escalate_dispute))
        .route("/v1/disputes/{id}/votes", post(submit_vote))
        .route("/v1/orders/{order_id}/dispute", get(get_order_dispute))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn message_to_response(m: &ChatMessage) -> ChatMessageResponse {
    ChatMessageResponse {
        message_id: *m.id.as_uuid(),
        sender_id: *m.sender_id.as_uuid(),
        sender_name: m.sender_name.clone(),
        message: m.message.clone(),
        created_at: m.created_at.to_iso8601(),
    }
}

fn vote_to_response(v: &JuryVote) -> VoteResponse {
    VoteResponse {
        vote_id: *v.id.as_uuid(),
        juror_id: *v.juror_id.as_uuid(),
        vote: v.vote.as_str().to_string(),
        confidence: v.confidence,
        comment: v.comment.clone(),
        created_at: v.created_at.to_iso8601(),
    }
}

pub(crate) fn dispute_to_response(d: &Dispute) -> DisputeResponse {
    DisputeResponse {
        dispute_id: *d.id.as_uuid(),
        order_id: *d.order_id.as_uuid(),
        buyer_id: *d.buyer_id.as_uuid(),
        seller_id: *d.seller_id.as_uuid(),
        reason: d.reason.clone(),
        buyer_statement: d.buyer_statement.clone(),
        seller_statement: d.seller_statement.clone(),
        status: d.status.as_str().to_string(),
        resolution: d.resolution.as_ref().map(|r| ResolutionResponse {
            outcome: r.outcome.as_str().to_string(),
            summary: r.summary.clone(),
            compensation: r.compensation,
        }),
        chat_messages: d.chat_messages.iter().map(message_to_response).collect(),
        jury_size: d.jury.size,
        jury_votes: d.jury.tally.total(),
        buyer_vote_count: d.jury.tally.buyer(),
        seller_vote_count: d.jury.tally.seller(),
        votes: d.jury.votes.iter().map(vote_to_response).collect(),
        escalation: d.escalation.map(|e| EscalationResponse {
            cause: e.cause.as_str().to_string(),
            actor_id: match e.cause {
                EscalationCause::Manual { actor } => Some(*actor.as_uuid()),
                EscalationCause::Timeout => None,
            },
            escalated_at: e.at.to_iso8601(),
        }),
        valid_transitions: d
            .status
            .valid_transitions()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        version: d.version,
        created_at: d.created_at.to_iso8601(),
        updated_at: d.updated_at.to_iso8601(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/disputes: File a dispute against an order.
#[utoipa::path(
    post,
    path = "/v1/disputes",
    request_body = FileDisputeRequest,
    responses(
        (status = 201, description = "Dispute filed", body = DisputeResponse),
        (status = 403, description = "Filer is not party to the order", body = crate::error::ErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody),
        (status = 409, description = "Order not disputable or already disputed", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn file_dispute(
    State(state): State<AppState>,
    body: Result<Json<FileDisputeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let dispute = state
        .disputes
        .file_dispute(FileDispute {
            order_id: OrderId::from_uuid(req.order_id),
            buyer_id: UserId::from_uuid(req.buyer_id),
            seller_id: UserId::from_uuid(req.seller_id),
            filed_by: UserId::from_uuid(req.filed_by),
            reason: req.reason,
            statement: req.statement,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(dispute_to_response(&dispute))))
}

/// GET /v1/disputes: List disputes, optionally by status and party.
#[utoipa::path(
    get,
    path = "/v1/disputes",
    params(ListDisputesQuery),
    responses(
        (status = 200, description = "Matching disputes, oldest first", body = Vec<DisputeResponse>),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn list_disputes(
    State(state): State<AppState>,
    Query(query): Query<ListDisputesQuery>,
) -> Result<Json<Vec<DisputeResponse>>, AppError> {
    let filter = DisputeFilter {
        status: query
            .status
            .as_deref()
            .map(str::parse::<DisputeStatus>)
            .transpose()?,
        party: query.party.map(UserId::from_uuid),
    };
    let disputes = state.disputes.list(&filter).await?;
    Ok(Json(disputes.iter().map(dispute_to_response).collect()))
}

/// GET /v1/disputes/{id}: Get a dispute.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}",
    params(("id" = String, Path, description = "Dispute UUID")),
    responses(
        (status = 200, description = "Dispute found", body = DisputeResponse),
        (status = 404, description = "Dispute not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DisputeResponse>, AppError> {
    let id: DisputeId = parse_id(&id)?;
    let dispute = state.disputes.get(&id).await?;
    Ok(Json(dispute_to_response(&dispute)))
}

/// GET /v1/orders/{order_id}/dispute: Get the dispute filed against an order.
#[utoipa::path(
    get,
    path = "/v1/orders/{order_id}/dispute",
    params(("order_id" = String, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Dispute found", body = DisputeResponse),
        (status = 404, description = "No dispute for this order", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn get_order_dispute(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<DisputeResponse>, AppError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let dispute = state
        .disputes
        .find_by_order(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no dispute for {order_id}")))?;
    Ok(Json(dispute_to_response(&dispute)))
}

/// POST /v1/disputes/{id}/messages: Post to the negotiation chat.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/messages",
    params(("id" = String, Path, description = "Dispute UUID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message appended", body = DisputeResponse),
        (status = 403, description = "Sender is not buyer or seller", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute is not in chat", body = crate::error::ErrorBody),
        (status = 422, description = "Empty or oversized message", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeResponse>), AppError> {
    let id: DisputeId = parse_id(&id)?;
    let req = extract_json(body)?;
    let dispute = state
        .disputes
        .post_message(&id, UserId::from_uuid(req.sender_id), &req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(dispute_to_response(&dispute))))
}

/// PUT /v1/disputes/{id}/statement: Replace the actor's own statement.
#[utoipa::path(
    put,
    path = "/v1/disputes/{id}/statement",
    params(("id" = String, Path, description = "Dispute UUID")),
    request_body = UpdateStatementRequest,
    responses(
        (status = 200, description = "Statement updated", body = DisputeResponse),
        (status = 403, description = "Actor is not buyer or seller", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute is resolved", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn update_statement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatementRequest>, JsonRejection>,
) -> Result<Json<DisputeResponse>, AppError> {
    let id: DisputeId = parse_id(&id)?;
    let req = extract_json(body)?;
    let dispute = state
        .disputes
        .update_statement(&id, UserId::from_uuid(req.actor_id), &req.statement)
        .await?;
    Ok(Json(dispute_to_response(&dispute)))
}

/// POST /v1/disputes/{id}/accept: Moderator releases a pending dispute to chat.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/accept",
    params(("id" = String, Path, description = "Dispute UUID")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Dispute accepted", body = DisputeResponse),
        (status = 403, description = "Actor is not a moderator", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute is not pending", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn accept_dispute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<DisputeResponse>, AppError> {
    let id: DisputeId = parse_id(&id)?;
    let req = extract_json(body)?;
    let dispute = state
        .disputes
        .accept(&id, UserId::from_uuid(req.actor_id))
        .await?;
    Ok(Json(dispute_to_response(&dispute)))
}

/// POST /v1/disputes/{id}/escalate: Escalate the chat to the jury.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/escalate",
    params(("id" = String, Path, description = "Dispute UUID")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Dispute escalated", body = DisputeResponse),
        (status = 403, description = "Actor is not a party or moderator", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute is not in chat", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn escalate_dispute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<DisputeResponse>, AppError> {
    let id: DisputeId = parse_id(&id)?;
    let req = extract_json(body)?;
    let dispute = state
        .disputes
        .escalate(&id, UserId::from_uuid(req.actor_id))
        .await?;
    Ok(Json(dispute_to_response(&dispute)))
}

/// POST /v1/disputes/{id}/votes: Cast a jury vote.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/votes",
    params(("id" = String, Path, description = "Dispute UUID")),
    request_body = SubmitVoteRequest,
    responses(
        (status = 201, description = "Vote recorded; dispute resolved if quorum reached", body = DisputeResponse),
        (status = 403, description = "Juror is a party to the dispute", body = crate::error::ErrorBody),
        (status = 409, description = "Dispute is not in jury, or juror already voted", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SubmitVoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeResponse>), AppError> {
    let id: DisputeId = parse_id(&id)?;
    let req = extract_validated_json(body)?;
    let dispute = state
        .disputes
        .submit_vote(
            &id,
            CastVote {
                juror_id: UserId::from_uuid(req.juror_id),
                vote: req.vote.into(),
                confidence: req.confidence,
                comment: req.comment,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dispute_to_response(&dispute))))
}
