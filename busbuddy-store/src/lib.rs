pub mod app_config;
pub mod booking_repo;
pub mod bus_repo;
pub mod database;
pub mod route_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use bus_repo::PgBusRepository;
pub use database::DbClient;
pub use route_repo::PgRouteRepository;
pub use user_repo::PgUserRepository;
