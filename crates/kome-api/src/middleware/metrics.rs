//! # Prometheus Metrics
//!
//! Metrics are recorded through the `metrics` facade and exported by the
//! Prometheus recorder installed at startup (see [`crate::bootstrap`]).
//! With no recorder installed every macro here is a no-op.
//!
//! HTTP-level metrics are recorded by [`metrics_middleware`]. Domain
//! counters are recorded by [`MetricsNotifier`] as lifecycle events fire.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use kome_dispute::{DisputeEvent, Notifier};
use metrics::{counter, histogram};

pub const HTTP_REQUESTS_TOTAL: &str = "kome_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "kome_http_request_duration_seconds";
pub const DISPUTES_FILED_TOTAL: &str = "kome_disputes_filed_total";
pub const CHAT_MESSAGES_TOTAL: &str = "kome_chat_messages_total";
pub const DISPUTES_ACCEPTED_TOTAL: &str = "kome_disputes_accepted_total";
pub const DISPUTES_ESCALATED_TOTAL: &str = "kome_disputes_escalated_total";
pub const JURY_VOTES_TOTAL: &str = "kome_jury_votes_total";
pub const DISPUTES_RESOLVED_TOTAL: &str = "kome_disputes_resolved_total";

/// Records request count and latency, labelled by the matched route
/// template so path parameters do not explode label cardinality.
///
/// Must be installed with `route_layer` so [`MatchedPath`] is present.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Counts dispute lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsNotifier;

impl Notifier for MetricsNotifier {
    fn notify(&self, event: &DisputeEvent) {
        match event {
            DisputeEvent::Filed { status, .. } => {
                counter!(DISPUTES_FILED_TOTAL, "status" => status.as_str()).increment(1)
            }
            DisputeEvent::MessagePosted { .. } => counter!(CHAT_MESSAGES_TOTAL).increment(1),
            DisputeEvent::Accepted { .. } => counter!(DISPUTES_ACCEPTED_TOTAL).increment(1),
            DisputeEvent::Escalated { cause, .. } => {
                counter!(DISPUTES_ESCALATED_TOTAL, "cause" => cause.as_str()).increment(1)
            }
            DisputeEvent::VoteRecorded { vote, .. } => {
                counter!(JURY_VOTES_TOTAL, "vote" => vote.as_str()).increment(1)
            }
            DisputeEvent::Resolved { resolution, .. } => counter!(
                DISPUTES_RESOLVED_TOTAL,
                "outcome" => resolution.outcome.as_str()
            )
            .increment(1),
        }
    }
}
