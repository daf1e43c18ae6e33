use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use busbuddy_core::booking::{
    can_cancel, generate_booking_ref, refund_amount, seat_conflicts, BookingStatus, BookingUpdate,
    CancelBookingRequest, Cancellation, CreateBookingRequest, PaymentMethod, Pricing, RefundStatus,
};
use busbuddy_core::bus::BusStatus;
use busbuddy_core::pagination::{PageInfo, PageQuery};
use busbuddy_core::repository::{BookingFilter, NewBooking};

use crate::error::ApiError;
use crate::middleware::auth::{require_auth, CurrentUser};
use crate::response::{created, ok};
use crate::state::AppState;

const ALLOWED_UPDATE_FIELDS: [&str; 4] = [
    "contactDetails",
    "specialRequests",
    "boardingPoint",
    "droppingPoint",
];

/// A booking edit must be a non-empty object touching only the
/// whitelisted logistics fields.
fn is_allowed_update(body: &Value) -> bool {
    body.as_object().is_some_and(|map| {
        !map.is_empty()
            && map
                .keys()
                .all(|k| ALLOWED_UPDATE_FIELDS.contains(&k.as_str()))
    })
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_all_bookings))
        .route("/bookings/user", get(my_bookings))
        .route("/bookings/{id}", get(get_booking).put(update_booking))
        .route("/bookings/{id}/cancel", delete(cancel_booking))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let now = Utc::now();
    let errors = req.validate(now.date_naive(), &state.booking_rules);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    // Enum membership was checked above.
    let payment_method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| ApiError::validation("paymentMethod", "Invalid payment method"))?;

    let bus = state
        .buses
        .find_by_id(req.bus_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bus not found".to_string()))?;

    if bus.status != BusStatus::Active {
        return Err(ApiError::Rejected(
            "Bus is not available for booking".to_string(),
        ));
    }
    if bus.route_id != req.route_id {
        return Err(ApiError::Rejected(
            "Bus does not operate on the selected route".to_string(),
        ));
    }

    // Early rejections for a friendly error; the store re-checks both
    // conditions inside the transaction, which is what actually holds
    // under concurrency.
    if (bus.available_seats as usize) < req.seat_numbers.len() {
        return Err(ApiError::Rejected("Not enough available seats".to_string()));
    }
    let taken = state
        .bookings
        .taken_seats(req.bus_id, req.travel_date)
        .await?;
    let conflicts = seat_conflicts(&req.seat_numbers, &taken);
    if !conflicts.is_empty() {
        return Err(ApiError::Rejected(format!(
            "Seats already booked: {}",
            conflicts.join(", ")
        )));
    }

    let pricing = Pricing::quote(
        bus.price_per_seat,
        req.seat_numbers.len(),
        &state.booking_rules,
    );

    let booking = state
        .bookings
        .create_booking(NewBooking {
            booking_ref: generate_booking_ref(now),
            user_id: current.id,
            bus_id: req.bus_id,
            route_id: req.route_id,
            travel_date: req.travel_date,
            seat_numbers: req.seat_numbers,
            passenger_details: req.passenger_details,
            contact_details: req.contact_details,
            pricing,
            payment_method,
            special_requests: req.special_requests,
            boarding_point: req.boarding_point,
            dropping_point: req.dropping_point,
        })
        .await?;

    tracing::info!("Booking created: {}", booking.booking_ref);

    Ok(created("Booking created", json!({ "booking": booking })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingListQuery {
    status: Option<String>,
    bus_id: Option<Uuid>,
    user_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl BookingListQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(10),
        }
        .normalized()
    }

    fn checked_status(&self) -> Result<Option<String>, ApiError> {
        if let Some(status) = &self.status {
            if BookingStatus::parse(status).is_none() {
                return Err(ApiError::validation("status", "Invalid booking status"));
            }
        }
        Ok(self.status.clone())
    }
}

/// GET /api/bookings/user
async fn my_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = query.checked_status()?;
    let page = query.page();

    let (bookings, total) = state
        .bookings
        .list_for_user(current.id, status, page)
        .await?;

    Ok(ok(
        "Bookings retrieved",
        json!({
            "bookings": bookings,
            "pagination": PageInfo::new(page, total),
        }),
    ))
}

/// GET /api/bookings (admin)
async fn list_all_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, ApiError> {
    if !current.is_staff() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let status = query.checked_status()?;
    let page = query.page();

    let filter = BookingFilter {
        status,
        bus_id: query.bus_id,
        user_id: query.user_id,
    };
    let (bookings, total) = state.bookings.list_all(filter, page).await?;

    Ok(ok(
        "Bookings retrieved",
        json!({
            "bookings": bookings,
            "pagination": PageInfo::new(page, total),
        }),
    ))
}

/// GET /api/bookings/{id} — owner or staff.
async fn get_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let booking = state
        .bookings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    if booking.user_id != current.id && !current.is_staff() {
        return Err(ApiError::Forbidden(
            "You do not have access to this booking".to_string(),
        ));
    }

    Ok(ok("Booking retrieved", json!({ "booking": booking })))
}

/// PUT /api/bookings/{id} — owner only; logistics fields only.
async fn update_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let booking = state
        .bookings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    if booking.user_id != current.id {
        return Err(ApiError::Forbidden(
            "You do not have access to this booking".to_string(),
        ));
    }

    // Reject any key outside the whitelist rather than silently ignoring
    // it; seats, dates, and pricing never change after creation.
    if !is_allowed_update(&body) {
        return Err(ApiError::Rejected("Invalid updates".to_string()));
    }

    let update: BookingUpdate = serde_json::from_value(body)
        .map_err(|_| ApiError::Rejected("Invalid updates".to_string()))?;

    let booking = state
        .bookings
        .update_details(id, update)
        .await?
        .ok_or_else(|| {
            ApiError::Rejected("Completed bookings cannot be modified".to_string())
        })?;

    Ok(ok("Booking updated", json!({ "booking": booking })))
}

/// DELETE /api/bookings/{id}/cancel — owner only.
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelBookingRequest>>,
) -> Result<Json<Value>, ApiError> {
    let booking = state
        .bookings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    if booking.user_id != current.id {
        return Err(ApiError::Forbidden(
            "You do not have access to this booking".to_string(),
        ));
    }
    if booking.is_cancelled() {
        return Err(ApiError::Rejected("Booking is already cancelled".to_string()));
    }
    if booking.status == BookingStatus::Completed {
        return Err(ApiError::Rejected(
            "Completed bookings cannot be cancelled".to_string(),
        ));
    }

    let now = Utc::now();
    if !can_cancel(booking.travel_date, now, &state.booking_rules) {
        return Err(ApiError::Rejected(format!(
            "Bookings can only be cancelled at least {} hours before departure",
            state.booking_rules.cancellation_cutoff_hours
        )));
    }

    let reason = body
        .and_then(|Json(req)| req.reason)
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Cancelled by user".to_string());

    let refund = refund_amount(booking.pricing.total_amount, &state.booking_rules);

    let booking = state
        .bookings
        .cancel_booking(
            id,
            Cancellation {
                cancelled_at: now,
                cancelled_by: current.id,
                reason,
                refund_amount: refund,
                refund_status: RefundStatus::Pending,
                processed_at: None,
                processed_by: None,
            },
        )
        .await?
        // A concurrent cancel won the status guard.
        .ok_or_else(|| ApiError::Rejected("Booking is already cancelled".to_string()))?;

    tracing::info!("Booking cancelled: {}", booking.booking_ref);

    Ok(ok(
        "Booking cancelled",
        json!({ "booking": booking, "refundAmount": refund }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logistics_edits_are_allowed() {
        assert!(is_allowed_update(&json!({
            "contactDetails": { "phone": "+9779812345678", "email": "a@example.com" },
            "specialRequests": ["Window seat"],
        })));
        assert!(is_allowed_update(&json!({ "boardingPoint": "Kalanki" })));
    }

    #[test]
    fn seat_and_pricing_edits_are_rejected() {
        assert!(!is_allowed_update(&json!({ "seatNumbers": ["1", "2"] })));
        assert!(!is_allowed_update(&json!({
            "droppingPoint": "Lakeside",
            "totalAmount": 1,
        })));
    }

    #[test]
    fn empty_or_non_object_bodies_are_rejected() {
        assert!(!is_allowed_update(&json!({})));
        assert!(!is_allowed_update(&json!("boardingPoint")));
    }
}
