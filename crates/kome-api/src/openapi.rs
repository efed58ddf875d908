//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the dispute service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kome Disputes API",
        description = "Dispute resolution for the Kome rice marketplace.\n\nA buyer or seller files a dispute against a shipped, delivered or completed order. The parties negotiate in a chat; if they cannot settle, the dispute is escalated (manually, or automatically after the escalation window) to a community jury whose majority vote decides the outcome and compensation.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Disputes ─────────────────────────────────────────────────────
        crate::routes::disputes::file_dispute,
        crate::routes::disputes::list_disputes,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::get_order_dispute,
        crate::routes::disputes::post_message,
        crate::routes::disputes::update_statement,
        crate::routes::disputes::accept_dispute,
        crate::routes::disputes::escalate_dispute,
        crate::routes::disputes::submit_vote,
        // ── Admin ────────────────────────────────────────────────────────
        crate::routes::admin::run_escalation_sweep,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::disputes::FileDisputeRequest,
            crate::routes::disputes::PostMessageRequest,
            crate::routes::disputes::UpdateStatementRequest,
            crate::routes::disputes::ActorRequest,
            crate::routes::disputes::VoteChoice,
            crate::routes::disputes::SubmitVoteRequest,
            crate::routes::disputes::DisputeResponse,
            crate::routes::disputes::ChatMessageResponse,
            crate::routes::disputes::VoteResponse,
            crate::routes::disputes::ResolutionResponse,
            crate::routes::disputes::EscalationResponse,
            crate::routes::admin::SweepReportResponse,
        ),
    ),
    tags(
        (name = "disputes", description = "Dispute filing, negotiation chat, escalation and jury voting"),
        (name = "admin", description = "Operator actions"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_dispute_path() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/disputes",
            "/v1/disputes/{id}",
            "/v1/disputes/{id}/messages",
            "/v1/disputes/{id}/statement",
            "/v1/disputes/{id}/accept",
            "/v1/disputes/{id}/escalate",
            "/v1/disputes/{id}/votes",
            "/v1/orders/{order_id}/dispute",
            "/v1/admin/escalation-sweep",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
