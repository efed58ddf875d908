//! # Operator Routes
//!
//! On-demand escalation sweep. The same sweep runs on a timer in the
//! background (see [`crate::sweeper`]); this endpoint lets an operator or an
//! external scheduler trigger one immediately.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Outcome of one escalation sweep.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepReportResponse {
    /// `in_chat` disputes examined.
    pub scanned: usize,
    /// Disputes moved to `in_jury` by this sweep.
    pub escalated: usize,
    /// Disputes whose escalation failed; retried on the next sweep.
    pub failed: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/admin/escalation-sweep", post(run_escalation_sweep))
}

/// POST /v1/admin/escalation-sweep: Escalate every overdue chat now.
#[utoipa::path(
    post,
    path = "/v1/admin/escalation-sweep",
    responses(
        (status = 200, description = "Sweep completed", body = SweepReportResponse),
        (status = 500, description = "Candidate listing failed", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn run_escalation_sweep(
    State(state): State<AppState>,
) -> Result<Json<SweepReportResponse>, AppError> {
    let report = state.disputes.sweep(state.disputes.now()).await?;
    Ok(Json(SweepReportResponse {
        scanned: report.scanned,
        escalated: report.escalated,
        failed: report.failed,
    }))
}
