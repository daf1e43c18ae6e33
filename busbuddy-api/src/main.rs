use std::net::SocketAddr;
use std::sync::Arc;

use busbuddy_api::{app, state::AppState};
use busbuddy_store::{
    DbClient, PgBookingRepository, PgBusRepository, PgRouteRepository, PgUserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use busbuddy_api::middleware::rate_limit::RateLimiter;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "busbuddy_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = busbuddy_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting BusBuddy API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let app_state = AppState {
        users: Arc::new(PgUserRepository::new(db.pool.clone())),
        routes: Arc::new(PgRouteRepository::new(db.pool.clone())),
        buses: Arc::new(PgBusRepository::new(db.pool.clone())),
        bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
        auth: config.auth.clone(),
        booking_rules: config.booking_rules.clone(),
        rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
