use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use busbuddy_core::pagination::{PageInfo, PageQuery};
use busbuddy_core::repository::RouteFilter;
use busbuddy_core::route::{CreateRouteRequest, RouteStatus, RouteUpdate};

use crate::error::ApiError;
use crate::middleware::auth::{require_auth, require_staff};
use crate::response::{created, ok};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/routes", get(list_routes))
        .route("/routes/popular", get(popular_routes))
        .route("/routes/{id}", get(get_route));

    let admin = Router::new()
        .route("/routes", post(create_route))
        .route("/routes/{id}", put(update_route).delete(delete_route))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(admin)
}

#[derive(Debug, Deserialize)]
struct RouteListQuery {
    status: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// GET /api/routes
async fn list_routes(
    State(state): State<AppState>,
    Query(query): Query<RouteListQuery>,
) -> Result<Json<Value>, ApiError> {
    if let Some(status) = &query.status {
        if RouteStatus::parse(status).is_none() {
            return Err(ApiError::validation("status", "Invalid route status"));
        }
    }

    let page = PageQuery {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(10),
    }
    .normalized();

    let filter = RouteFilter {
        status: query.status,
        origin: query.origin,
        destination: query.destination,
    };

    let (routes, total) = state.routes.list_routes(filter, page).await?;

    Ok(ok(
        "Routes retrieved",
        json!({
            "routes": routes,
            "pagination": PageInfo::new(page, total),
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct PopularQuery {
    limit: Option<i64>,
}

/// GET /api/routes/popular
async fn popular_routes(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(6).clamp(1, 20);
    let routes = state.routes.popular_routes(limit).await?;

    Ok(ok("Popular routes retrieved", json!({ "routes": routes })))
}

/// GET /api/routes/{id}
async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let route = state
        .routes
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Route not found".to_string()))?;

    Ok(ok("Route retrieved", json!({ "route": route })))
}

/// POST /api/routes (admin)
async fn create_route(
    State(state): State<AppState>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let errors = req.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let route = state.routes.create_route(req).await?;
    tracing::info!("Route created: {}", route.route_name);

    Ok(created("Route created", json!({ "route": route })))
}

/// PUT /api/routes/{id} (admin)
async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<RouteUpdate>,
) -> Result<Json<Value>, ApiError> {
    let errors = update.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let route = state
        .routes
        .update_route(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Route not found".to_string()))?;

    Ok(ok("Route updated", json!({ "route": route })))
}

/// DELETE /api/routes/{id} (admin)
async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !state.routes.delete_route(id).await? {
        return Err(ApiError::NotFound("Route not found".to_string()));
    }

    Ok(ok("Route deleted", json!(null)))
}
