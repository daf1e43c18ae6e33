use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use busbuddy_core::user::{User, UserType};
use busbuddy_store::app_config::AuthConfig;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// JWT claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub user_type: String,
    pub exp: usize,
}

/// The authenticated caller, injected into request extensions by
/// `require_auth` and read by handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.user_type.is_staff()
    }
}

pub fn issue_token(user: &User, auth: &AuthConfig, lifetime: Duration) -> Result<String, ApiError> {
    let exp = (Utc::now() + lifetime).timestamp() as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        user_type: user.user_type.as_str().to_string(),
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

// ============================================================================
// Authentication middleware
// ============================================================================

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Authentication("Authentication required".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Authentication("Authentication required".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Authentication("Invalid or expired token".to_string()))?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| ApiError::Authentication("Invalid or expired token".to_string()))?;

    // Re-load the user so revoked or deactivated accounts are cut off even
    // while their token is still unexpired.
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Authentication("Account no longer exists".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Authentication(
            "Account has been deactivated".to_string(),
        ));
    }

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
        user_type: user.user_type,
    });

    Ok(next.run(req).await)
}

/// Layers on top of `require_auth`; rejects non-staff callers.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Authentication("Authentication required".to_string()))?;

    if !user.is_staff() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use busbuddy_core::user::{Address, Gender};
    use chrono::NaiveDate;

    fn test_user(user_type: UserType) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Sita".to_string(),
            last_name: "Sharma".to_string(),
            email: "sita@example.com".to_string(),
            phone: "+9779812345678".to_string(),
            password_hash: String::new(),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 6, 15).unwrap(),
            gender: Gender::Female,
            user_type,
            is_active: true,
            is_verified: false,
            address: Address::default(),
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_days: 7,
            remember_me_days: 30,
            admin_token_hours: 12,
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let user = test_user(UserType::Passenger);
        let auth = auth_config();
        let token = issue_token(&user, &auth, Duration::days(7)).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user.id.to_string());
        assert_eq!(decoded.claims.email, "sita@example.com");
        assert_eq!(decoded.claims.user_type, "passenger");
    }

    #[test]
    fn token_fails_with_wrong_secret() {
        let user = test_user(UserType::Admin);
        let token = issue_token(&user, &auth_config(), Duration::hours(12)).unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn staff_covers_admin_and_operator() {
        assert!(UserType::Admin.is_staff());
        assert!(UserType::Operator.is_staff());
        assert!(!UserType::Passenger.is_staff());
    }
}
