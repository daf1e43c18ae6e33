use std::sync::Arc;

use busbuddy_core::booking::BookingRules;
use busbuddy_core::repository::{
    BookingRepository, BusRepository, RouteRepository, UserRepository,
};
use busbuddy_store::app_config::AuthConfig;

use crate::middleware::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub buses: Arc<dyn BusRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub auth: AuthConfig,
    pub booking_rules: BookingRules,
    pub rate_limiter: Arc<RateLimiter>,
}
