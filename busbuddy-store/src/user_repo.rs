use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use busbuddy_core::error::RepoError;
use busbuddy_core::repository::{NewUser, UserRepository};
use busbuddy_core::user::{Address, Gender, ProfileUpdate, User, UserType};

use crate::database::map_db_err;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    password_hash: String,
    date_of_birth: NaiveDate,
    gender: String,
    user_type: String,
    is_active: bool,
    is_verified: bool,
    address_street: String,
    address_city: String,
    address_state: String,
    address_zip: String,
    address_country: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepoError> {
        let gender = Gender::parse(&self.gender)
            .ok_or_else(|| RepoError::Database(format!("invalid gender value: {}", self.gender)))?;
        let user_type = UserType::parse(&self.user_type).ok_or_else(|| {
            RepoError::Database(format!("invalid user type value: {}", self.user_type))
        })?;

        Ok(User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            date_of_birth: self.date_of_birth,
            gender,
            user_type,
            is_active: self.is_active,
            is_verified: self.is_verified,
            address: Address {
                street: self.address_street,
                city: self.address_city,
                state: self.address_state,
                zip_code: self.address_zip,
                country: self.address_country,
            },
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, \
     date_of_birth, gender, user_type, is_active, is_verified, \
     address_street, address_city, address_state, address_zip, address_country, \
     last_login_at, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            "INSERT INTO users (id, first_name, last_name, email, phone, password_hash, \
             date_of_birth, gender, user_type, \
             address_street, address_city, address_state, address_zip, address_country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {USER_COLUMNS}"
        );

        let row: UserRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.password_hash)
            .bind(new.date_of_birth)
            .bind(new.gender.as_str())
            .bind(new.user_type.as_str())
            .bind(&new.address.street)
            .bind(&new.address.city)
            .bind(&new.address.state)
            .bind(&new.address.zip_code)
            .bind(&new.address.country)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.into_user()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET last_login_at = $1, updated_at = NOW() WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        let gender = update.gender.as_deref().and_then(Gender::parse);
        let address = update.address.as_ref();

        let sql = format!(
            "UPDATE users SET \
             first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), \
             phone = COALESCE($4, phone), \
             date_of_birth = COALESCE($5, date_of_birth), \
             gender = COALESCE($6, gender), \
             address_street = COALESCE($7, address_street), \
             address_city = COALESCE($8, address_city), \
             address_state = COALESCE($9, address_state), \
             address_zip = COALESCE($10, address_zip), \
             address_country = COALESCE($11, address_country), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.first_name.as_deref().map(str::trim))
            .bind(update.last_name.as_deref().map(str::trim))
            .bind(update.phone.as_deref().map(str::trim))
            .bind(update.date_of_birth)
            .bind(gender.map(|g| g.as_str()))
            .bind(address.map(|a| a.street.clone()))
            .bind(address.map(|a| a.city.clone()))
            .bind(address.map(|a| a.state.clone()))
            .bind(address.map(|a| a.zip_code.clone()))
            .bind(address.map(|a| a.country.clone()))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(UserRow::into_user).transpose()
    }
}
