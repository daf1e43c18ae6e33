use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use busbuddy_core::repository::NewUser;
use busbuddy_core::user::{Gender, LoginRequest, ProfileUpdate, RegisterRequest, UserType};

use crate::error::ApiError;
use crate::middleware::auth::{issue_token, require_auth, CurrentUser};
use crate::response::{created, ok};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/check-email/{email}", get(check_email))
        .route("/auth/check-phone/{phone}", get(check_phone));

    let protected = Router::new()
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let today = Utc::now().date_naive();
    let errors = req.validate(today);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let email = req.normalized_email();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }
    if state.users.find_by_phone(req.phone.trim()).await?.is_some() {
        return Err(ApiError::Conflict(
            "An account with this phone number already exists".to_string(),
        ));
    }

    let gender = Gender::parse(&req.gender)
        .ok_or_else(|| ApiError::validation("gender", "Gender must be Male, Female, or Other"))?;

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;

    let mut address = req.address.clone().unwrap_or_default();
    if address.country.trim().is_empty() {
        address.country = "Nepal".to_string();
    }

    let user = state
        .users
        .create_user(NewUser {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            phone: req.phone.trim().to_string(),
            password_hash,
            date_of_birth: req.date_of_birth,
            gender,
            user_type: UserType::Passenger,
            address,
        })
        .await?;

    let token = issue_token(&user, &state.auth, Duration::days(state.auth.token_days))?;

    tracing::info!("New user registered: {}", user.email);

    Ok(created(
        "Registration successful",
        json!({ "user": user, "token": token }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.trim().to_lowercase();

    // Unknown email and bad password produce the same message, so the
    // endpoint cannot be used to probe for accounts.
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Authentication("Invalid credentials".to_string()))?;

    if !bcrypt::verify(&req.password, &user.password_hash)? {
        return Err(ApiError::Authentication("Invalid credentials".to_string()));
    }
    if !user.is_active {
        return Err(ApiError::Authentication(
            "Account has been deactivated".to_string(),
        ));
    }

    state.users.record_login(user.id, Utc::now()).await?;

    let days = if req.remember_me {
        state.auth.remember_me_days
    } else {
        state.auth.token_days
    };
    let token = issue_token(&user, &state.auth, Duration::days(days))?;

    Ok(ok(
        "Login successful",
        json!({ "user": user, "token": token }),
    ))
}

/// POST /api/auth/admin/login — staff only, short-lived token.
async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Authentication("Invalid credentials".to_string()))?;

    if !bcrypt::verify(&req.password, &user.password_hash)? {
        return Err(ApiError::Authentication("Invalid credentials".to_string()));
    }
    if !user.user_type.is_staff() {
        return Err(ApiError::Forbidden(
            "Access denied. Admin privileges required".to_string(),
        ));
    }
    if !user.is_active {
        return Err(ApiError::Authentication(
            "Account has been deactivated".to_string(),
        ));
    }

    state.users.record_login(user.id, Utc::now()).await?;

    let token = issue_token(
        &user,
        &state.auth,
        Duration::hours(state.auth.admin_token_hours),
    )?;

    Ok(ok(
        "Login successful",
        json!({ "user": user, "token": token }),
    ))
}

/// GET /api/auth/profile
async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ok("Profile retrieved", json!({ "user": user })))
}

/// PUT /api/auth/profile
async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, ApiError> {
    let errors = update.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = state
        .users
        .update_profile(current.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ok("Profile updated", json!({ "user": user })))
}

/// GET /api/auth/check-email/{email}
async fn check_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let taken = state
        .users
        .find_by_email(&email.trim().to_lowercase())
        .await?
        .is_some();

    Ok(ok("Email availability", json!({ "available": !taken })))
}

/// GET /api/auth/check-phone/{phone}
async fn check_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let taken = state.users.find_by_phone(phone.trim()).await?.is_some();

    Ok(ok("Phone availability", json!({ "available": !taken })))
}
