pub mod booking;
pub mod bus;
pub mod error;
pub mod pagination;
pub mod repository;
pub mod route;
pub mod user;
pub mod validate;

pub use error::{FieldError, RepoError};
