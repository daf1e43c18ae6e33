use axum::{
    extract::{Path, State},
    middleware,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use busbuddy_core::booking::RefundStatus;

use crate::error::ApiError;
use crate::middleware::auth::{require_auth, require_staff, CurrentUser};
use crate::response::ok;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/bookings/{id}/refund", post(decide_refund))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[derive(Debug, Deserialize)]
struct RefundDecisionRequest {
    decision: String,
}

/// "pending" is a valid stored status but not a decision; only the two
/// terminal states are accepted here.
fn parse_decision(raw: &str) -> Option<RefundStatus> {
    match RefundStatus::parse(raw) {
        Some(RefundStatus::Processed) => Some(RefundStatus::Processed),
        Some(RefundStatus::Rejected) => Some(RefundStatus::Rejected),
        _ => None,
    }
}

/// POST /api/admin/bookings/{id}/refund — settle a pending refund as
/// processed or rejected. No gateway call happens; this records the
/// decision and flips the payment record when processed.
async fn decide_refund(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RefundDecisionRequest>,
) -> Result<Json<Value>, ApiError> {
    let decision = parse_decision(&req.decision).ok_or_else(|| {
        ApiError::validation("decision", "Decision must be processed or rejected")
    })?;

    let booking = state
        .bookings
        .set_refund_decision(id, decision, current.id, Utc::now())
        .await?
        .ok_or_else(|| {
            ApiError::Rejected("Booking has no pending refund".to_string())
        })?;

    tracing::info!(
        "Refund {} for booking {}",
        decision.as_str(),
        booking.booking_ref
    );

    Ok(ok("Refund decision recorded", json!({ "booking": booking })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_decisions_are_accepted() {
        assert_eq!(parse_decision("processed"), Some(RefundStatus::Processed));
        assert_eq!(parse_decision("rejected"), Some(RefundStatus::Rejected));
    }

    #[test]
    fn pending_is_not_a_decision() {
        assert_eq!(parse_decision("pending"), None);
    }

    #[test]
    fn unknown_decisions_are_rejected() {
        assert_eq!(parse_decision("refunded"), None);
        assert_eq!(parse_decision("PROCESSED"), None);
        assert_eq!(parse_decision(""), None);
    }
}
