use serde::Serialize;

/// A single failed field check, reported back to the client inside the
/// `errors` array of the response envelope.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the persistence layer. The store crate maps
/// driver-level failures into this shape so the api crate never sees
/// sqlx types directly.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate value for {field}")]
    Conflict { field: String },

    #[error("database error: {0}")]
    Database(String),
}
