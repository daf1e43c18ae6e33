use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use busbuddy_core::bus::{BusStatus, BusType, BusUpdate, CreateBusRequest};
use busbuddy_core::pagination::{PageInfo, PageQuery};
use busbuddy_core::repository::BusFilter;

use crate::error::ApiError;
use crate::middleware::auth::{require_auth, require_staff, CurrentUser};
use crate::response::{created, ok};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/buses", get(list_buses))
        .route("/buses/search", get(search_buses))
        .route("/buses/route/{route_id}", get(buses_by_route))
        .route("/buses/{id}", get(get_bus));

    let admin = Router::new()
        .route("/buses", post(create_bus))
        .route("/buses/{id}", put(update_bus).delete(delete_bus))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(admin)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusListQuery {
    status: Option<String>,
    bus_type: Option<String>,
    route_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// GET /api/buses
async fn list_buses(
    State(state): State<AppState>,
    Query(query): Query<BusListQuery>,
) -> Result<Json<Value>, ApiError> {
    if let Some(status) = &query.status {
        if BusStatus::parse(status).is_none() {
            return Err(ApiError::validation("status", "Invalid bus status"));
        }
    }
    if let Some(bus_type) = &query.bus_type {
        if BusType::parse(bus_type).is_none() {
            return Err(ApiError::validation("busType", "Invalid bus type"));
        }
    }

    let page = PageQuery {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(10),
    }
    .normalized();

    let filter = BusFilter {
        status: query.status,
        bus_type: query.bus_type,
        route_id: query.route_id,
    };

    let (buses, total) = state.buses.list_buses(filter, page).await?;

    Ok(ok(
        "Buses retrieved",
        json!({
            "buses": buses,
            "pagination": PageInfo::new(page, total),
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    origin: Option<String>,
    destination: Option<String>,
    date: Option<NaiveDate>,
    passengers: Option<i32>,
}

/// GET /api/buses/search?origin=&destination=&date=&passengers=
async fn search_buses(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let origin = query
        .origin
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("origin", "Origin is required"))?;
    let destination = query
        .destination
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("destination", "Destination is required"))?;

    if let Some(date) = query.date {
        if date < Utc::now().date_naive() {
            return Err(ApiError::validation("date", "Travel date cannot be in the past"));
        }
    }

    let passengers = query.passengers.unwrap_or(1).max(1);

    let routes = state
        .routes
        .find_matching_active(origin, destination)
        .await?;
    if routes.is_empty() {
        return Err(ApiError::NotFound(
            "No routes found for the specified origin and destination".to_string(),
        ));
    }

    let route_ids: Vec<Uuid> = routes.iter().map(|r| r.id).collect();
    let buses = state.buses.search_by_routes(&route_ids, passengers).await?;

    Ok(ok(
        "Search results",
        json!({ "routes": routes, "buses": buses }),
    ))
}

/// GET /api/buses/route/{route_id}
async fn buses_by_route(
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let route = state
        .routes
        .find_by_id(route_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Route not found".to_string()))?;

    let buses = state.buses.list_by_route(route_id).await?;

    Ok(ok(
        "Buses retrieved",
        json!({ "route": route, "buses": buses }),
    ))
}

/// GET /api/buses/{id}
async fn get_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let bus = state
        .buses
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bus not found".to_string()))?;

    let occupancy = bus.occupancy_rate();
    Ok(ok(
        "Bus retrieved",
        json!({ "bus": bus, "occupancyRate": occupancy }),
    ))
}

/// POST /api/buses (admin); the caller becomes the operator.
async fn create_bus(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateBusRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let errors = req.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if state.routes.find_by_id(req.route_id).await?.is_none() {
        return Err(ApiError::NotFound("Route not found".to_string()));
    }

    let bus = state.buses.create_bus(req, current.id).await?;
    tracing::info!("Bus created: {}", bus.bus_number);

    Ok(created("Bus created", json!({ "bus": bus })))
}

/// PUT /api/buses/{id} (admin)
async fn update_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<BusUpdate>,
) -> Result<Json<Value>, ApiError> {
    let errors = update.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if let Some(route_id) = update.route_id {
        if state.routes.find_by_id(route_id).await?.is_none() {
            return Err(ApiError::NotFound("Route not found".to_string()));
        }
    }

    let bus = state
        .buses
        .update_bus(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bus not found".to_string()))?;

    Ok(ok("Bus updated", json!({ "bus": bus })))
}

/// DELETE /api/buses/{id} (admin)
async fn delete_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !state.buses.delete_bus(id).await? {
        return Err(ApiError::NotFound("Bus not found".to_string()));
    }

    Ok(ok("Bus deleted", json!(null)))
}
