use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::AuthContext;
use crate::models::{CreateUser, Role, User};
use crate::password::{hash_password, verify_password};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

fn validate_registration(input: &RegisterRequest) -> Result<()> {
    if !input.email.contains('@') {
        return Err(AppError::BadRequest("Please enter a valid email address".into()));
    }
    if input.username.trim().chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    validate_registration(&input)?;

    let email = queries::normalize_email(&input.email);
    let conn = state.db.get()?;
    if queries::get_user_by_email(&conn, &email)?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".into(),
        ));
    }

    let role = if state.bootstrap_admin_email.as_deref() == Some(email.as_str()) {
        Role::Admin
    } else {
        Role::User
    };

    let user = queries::create_user(
        &conn,
        &CreateUser {
            email,
            username: input.username.trim().to_string(),
            password_hash: hash_password(&input.password)?,
            role,
        },
    )
    .map_err(|e| {
        if e.is_constraint_violation() {
            AppError::Conflict("An account with this email already exists".into())
        } else {
            e
        }
    })?;

    tracing::info!(user_id = %user.id, role = user.role.as_ref(), "User registered");

    let token = state.tokens.issue(&user)?;
    Ok(Json(AuthResponse { user, token }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let conn = state.db.get()?;
    let user = queries::get_user_by_email(&conn, &input.email)?.ok_or_else(invalid)?;
    if !verify_password(&input.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let token = state.tokens.issue(&user)?;
    Ok(Json(AuthResponse { user, token }))
}

pub async fn profile(Extension(ctx): Extension<AuthContext>) -> Json<User> {
    Json(ctx.user)
}
