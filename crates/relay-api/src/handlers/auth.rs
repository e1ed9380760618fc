//! Authentication handlers
//!
//! Account signup and password login against the user store.

use axum::{extract::State, Json};
use relay_common::{validate_password_policy, validate_username, AppError};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extractors::ValidatedJson;
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Signup request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 3, message = "Username must have at least 3 characters."))]
    pub username: String,

    #[validate(length(min = 8, max = 20, message = "Password must be 8-20 characters long."))]
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Created account
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
}

/// Login result
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
}

/// Register a new account
///
/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> ApiResult<Created<Json<UserResponse>>> {
    validate_username(&request.username)?;
    validate_password_policy(&request.password)?;

    let users = state.users()?;
    let password_hash = state.passwords().hash(&request.password)?;
    let user = users.create(&request.username, &password_hash).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User signed up");

    Ok(Created(Json(UserResponse {
        id: user.id,
        username: user.username,
    })))
}

/// Check a username and password
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let users = state.users()?;

    let user = users
        .find_by_username(&request.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    state
        .passwords()
        .verify_or_error(&request.password, &user.password_hash)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
    }))
}
