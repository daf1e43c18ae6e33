use axum::{
    http::{Method, StatusCode, Uri},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod buses;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let api = Router::new()
        .route("/", get(api_index))
        .merge(auth::routes(state.clone()))
        .merge(routes::routes(state.clone()))
        .merge(buses::routes(state.clone()))
        .merge(bookings::routes(state.clone()))
        .merge(admin::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "BusBuddy API is running",
        "data": {
            "status": "ok",
            "timestamp": Utc::now(),
        },
    }))
}

/// GET /api — service metadata.
async fn api_index() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "BusBuddy API",
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}

async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} {} not found", method, uri.path()),
        })),
    )
}
