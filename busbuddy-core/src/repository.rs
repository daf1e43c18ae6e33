use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::{
    Booking, BookingUpdate, Cancellation, ContactDetails, PassengerDetail, PaymentMethod, Pricing,
    RefundStatus,
};
use crate::bus::{Bus, BusUpdate, CreateBusRequest};
use crate::error::RepoError;
use crate::pagination::PageQuery;
use crate::route::{CreateRouteRequest, Route, RouteUpdate};
use crate::user::{Address, Gender, ProfileUpdate, User, UserType};

// ============================================================================
// Write models
// ============================================================================

/// Fully-validated registration ready for insert; the password has already
/// been hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub user_type: UserType,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_ref: String,
    pub user_id: Uuid,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub travel_date: NaiveDate,
    pub seat_numbers: Vec<String>,
    pub passenger_details: Vec<PassengerDetail>,
    pub contact_details: ContactDetails,
    pub pricing: Pricing,
    pub payment_method: PaymentMethod,
    pub special_requests: Vec<String>,
    pub boarding_point: Option<String>,
    pub dropping_point: Option<String>,
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub status: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BusFilter {
    pub status: Option<String>,
    pub bus_type: Option<String>,
    pub route_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<String>,
    pub bus_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

// ============================================================================
// Booking write failures
// ============================================================================

/// Failure modes of the atomic create-booking write. The seat decrement and
/// the insert run in one transaction; `InsufficientSeats` also covers a
/// concurrent booking winning the conditional decrement.
#[derive(Debug, thiserror::Error)]
pub enum BookingCreateError {
    #[error("Bus not found")]
    BusNotFound,

    #[error("Not enough available seats")]
    InsufficientSeats,

    #[error("One or more selected seats are already booked")]
    SeatsTaken(Vec<String>),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

// ============================================================================
// Repository traits
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; duplicate email/phone surfaces as
    /// `RepoError::Conflict` naming the field.
    async fn create_user(&self, new: NewUser) -> Result<User, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, RepoError>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError>;

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn create_route(&self, req: CreateRouteRequest) -> Result<Route, RepoError>;

    async fn list_routes(
        &self,
        filter: RouteFilter,
        page: PageQuery,
    ) -> Result<(Vec<Route>, u64), RepoError>;

    /// Top active routes by popularity score.
    async fn popular_routes(&self, limit: i64) -> Result<Vec<Route>, RepoError>;

    /// Active routes whose endpoints contain the given origin/destination,
    /// case-insensitively.
    async fn find_matching_active(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<Route>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Route>, RepoError>;

    async fn update_route(
        &self,
        id: Uuid,
        update: RouteUpdate,
    ) -> Result<Option<Route>, RepoError>;

    async fn delete_route(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait BusRepository: Send + Sync {
    /// Insert a bus owned by `operator_id`; duplicate bus numbers surface
    /// as `RepoError::Conflict`.
    async fn create_bus(&self, req: CreateBusRequest, operator_id: Uuid)
        -> Result<Bus, RepoError>;

    async fn list_buses(
        &self,
        filter: BusFilter,
        page: PageQuery,
    ) -> Result<(Vec<Bus>, u64), RepoError>;

    /// Active buses on any of the given routes with at least `min_available`
    /// seats, cheapest first.
    async fn search_by_routes(
        &self,
        route_ids: &[Uuid],
        min_available: i32,
    ) -> Result<Vec<Bus>, RepoError>;

    /// Active buses serving a route, cheapest first.
    async fn list_by_route(&self, route_id: Uuid) -> Result<Vec<Bus>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Bus>, RepoError>;

    async fn update_bus(&self, id: Uuid, update: BusUpdate) -> Result<Option<Bus>, RepoError>;

    async fn delete_bus(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Seats held by live (non-cancelled) bookings for a bus on a date.
    async fn taken_seats(
        &self,
        bus_id: Uuid,
        travel_date: NaiveDate,
    ) -> Result<Vec<String>, RepoError>;

    /// Atomically insert the booking and decrement the bus seat count.
    /// The decrement is conditional on sufficient availability, so two
    /// concurrent requests cannot both take the last seats.
    async fn create_booking(&self, new: NewBooking) -> Result<Booking, BookingCreateError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepoError>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<String>,
        page: PageQuery,
    ) -> Result<(Vec<Booking>, u64), RepoError>;

    async fn list_all(
        &self,
        filter: BookingFilter,
        page: PageQuery,
    ) -> Result<(Vec<Booking>, u64), RepoError>;

    async fn update_details(
        &self,
        id: Uuid,
        update: BookingUpdate,
    ) -> Result<Option<Booking>, RepoError>;

    /// Mark the booking cancelled and restore the bus seats in one
    /// transaction. Returns `None` when the booking was already cancelled
    /// (or missing) by the time the write ran.
    async fn cancel_booking(
        &self,
        id: Uuid,
        cancellation: Cancellation,
    ) -> Result<Option<Booking>, RepoError>;

    /// Record the admin refund decision on a cancelled booking whose
    /// refund is still pending. Returns `None` when no such booking.
    async fn set_refund_decision(
        &self,
        id: Uuid,
        decision: RefundStatus,
        processed_by: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepoError>;
}
