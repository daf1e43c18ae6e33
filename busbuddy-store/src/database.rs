use busbuddy_core::error::RepoError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Translate driver failures into the store error shape. Unique-constraint
/// violations become conflicts naming the offending field, which the api
/// layer renders as 409.
pub(crate) fn map_db_err(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let field = db_err
                .constraint()
                .map(constraint_field)
                .unwrap_or_else(|| "value".to_string());
            return RepoError::Conflict { field };
        }
    }
    RepoError::Database(err.to_string())
}

/// "users_email_key" -> "email", "buses_bus_number_key" -> "bus number".
fn constraint_field(constraint: &str) -> String {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    let field = trimmed
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    field.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(constraint_field("users_email_key"), "email");
        assert_eq!(constraint_field("users_phone_key"), "phone");
        assert_eq!(constraint_field("buses_bus_number_key"), "bus number");
        assert_eq!(constraint_field("oddity"), "oddity");
    }
}
