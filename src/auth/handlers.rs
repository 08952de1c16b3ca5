use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use rusqlite::Connection;

use crate::auth::password;
use crate::db::models::User;
use crate::db::{self, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppForm, AppJson, CurrentUser};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-grant form; `username` carries the email.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// A concurrent registration can claim the email between the lookup and
/// the insert; the UNIQUE index then decides.
fn insert_user(conn: &Connection, email: &str, hashed_password: &str) -> AppResult<User> {
    users::insert(conn, email, hashed_password).map_err(|err| {
        if db::is_constraint_violation(&err) {
            AppError::BadRequest("REGISTER_USER_ALREADY_EXISTS".into())
        } else {
            err.into()
        }
    })
}

// -- Registration & login --

/// POST /auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    if !looks_like_email(&req.email) {
        return Err(AppError::Validation("value is not a valid email address".into()));
    }
    if let Err(reason) = password::validate_password(&req.password, &req.email) {
        tracing::debug!(%reason, "Rejected registration password");
        return Err(AppError::BadRequest("REGISTER_INVALID_PASSWORD".into()));
    }

    let conn = state.db.get()?;
    if users::get_by_email(&conn, &req.email)?.is_some() {
        return Err(AppError::BadRequest("REGISTER_USER_ALREADY_EXISTS".into()));
    }

    let hashed = password::hash_password(&req.password, state.config.auth.password_hash_cost)?;
    let user = insert_user(&conn, &req.email, &hashed)?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/jwt/login
#[tracing::instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let user = {
        let conn = state.db.get()?;
        users::get_by_email(&conn, &form.username)?
    };

    let user = match user {
        Some(u) if u.is_active && password::verify_password(&form.password, &u.hashed_password) => u,
        _ => return Err(AppError::BadRequest("LOGIN_BAD_CREDENTIALS".into())),
    };

    if state.config.auth.require_verification && !user.is_verified {
        return Err(AppError::BadRequest("LOGIN_USER_NOT_VERIFIED".into()));
    }

    let access_token = state.identity.issue_access_token(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /auth/jwt/logout
///
/// Bearer tokens are stateless; this only confirms the caller was
/// authenticated. Clients drop the token.
pub async fn logout(CurrentUser(user): CurrentUser) -> StatusCode {
    tracing::info!(user_id = %user.id, "User logged out");
    StatusCode::NO_CONTENT
}

// -- Password reset --

/// POST /auth/forgot-password
///
/// Always 202 so the response does not reveal which emails are registered.
#[tracing::instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<EmailRequest>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if let Some(user) = users::get_by_email(&conn, &req.email)?.filter(|u| u.is_active) {
        let token = state.account_tokens.reset_token(&user)?;
        // No mail transport; the token is handed to the operator log.
        tracing::info!(user_id = %user.id, %token, "Password reset requested");
    }
    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/reset-password
#[tracing::instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    let bad_token = || AppError::BadRequest("RESET_PASSWORD_BAD_TOKEN".into());

    let (user_id, fgpt) = state
        .account_tokens
        .decode_reset_token(&req.token)
        .map_err(|_| bad_token())?;

    let conn = state.db.get()?;
    let mut user = users::get_by_id(&conn, user_id)?
        .filter(|u| u.is_active)
        .ok_or_else(bad_token)?;

    if !password::fingerprint_matches(&user.hashed_password, &fgpt) {
        return Err(bad_token());
    }

    if password::validate_password(&req.password, &user.email).is_err() {
        return Err(AppError::BadRequest(
            "RESET_PASSWORD_INVALID_PASSWORD".into(),
        ));
    }

    user.hashed_password =
        password::hash_password(&req.password, state.config.auth.password_hash_cost)?;
    users::update(&conn, &user)?;
    tracing::info!(user_id = %user.id, "Password reset");

    Ok(StatusCode::OK)
}

// -- Email verification --

/// POST /auth/request-verify-token
#[tracing::instrument(skip(state, req))]
pub async fn request_verify_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<EmailRequest>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if let Some(user) = users::get_by_email(&conn, &req.email)?
        .filter(|u| u.is_active && !u.is_verified)
    {
        let token = state.account_tokens.verify_token(&user)?;
        tracing::info!(user_id = %user.id, %token, "Verification requested");
    }
    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/verify
#[tracing::instrument(skip(state, req))]
pub async fn verify(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyRequest>,
) -> AppResult<Json<User>> {
    let bad_token = || AppError::BadRequest("VERIFY_USER_BAD_TOKEN".into());

    let (user_id, email) = state
        .account_tokens
        .decode_verify_token(&req.token)
        .map_err(|_| bad_token())?;

    let conn = state.db.get()?;
    let mut user = users::get_by_id(&conn, user_id)?.ok_or_else(bad_token)?;

    // The address may have changed since the token was issued
    if user.email != users::normalize_email(&email) {
        return Err(bad_token());
    }
    if user.is_verified {
        return Err(AppError::BadRequest("VERIFY_USER_ALREADY_VERIFIED".into()));
    }

    user.is_verified = true;
    users::update(&conn, &user)?;
    tracing::info!(user_id = %user.id, "User verified");

    Ok(Json(user))
}
