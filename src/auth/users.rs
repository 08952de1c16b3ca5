use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use rusqlite::Connection;

use crate::auth::password;
use crate::db::models::User;
use crate::db::{self, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, AppPath, CurrentUser, SuperUser};
use crate::state::AppState;

/// Fields any user may change on their own account.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Superuser edits additionally reach the account flags.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUserUpdate {
    #[serde(flatten)]
    pub profile: UserUpdate,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_verified: Option<bool>,
}

fn apply_update(state: &AppState, user: &mut User, update: UserUpdate) -> AppResult<()> {
    let conn = state.db.get()?;

    if let Some(email) = update.email {
        let email = users::normalize_email(&email);
        if email != user.email {
            if users::get_by_email(&conn, &email)?.is_some() {
                return Err(AppError::BadRequest(
                    "UPDATE_USER_EMAIL_ALREADY_EXISTS".into(),
                ));
            }
            user.email = email;
            user.is_verified = false;
        }
    }

    if let Some(new_password) = update.password {
        if password::validate_password(&new_password, &user.email).is_err() {
            return Err(AppError::BadRequest("UPDATE_USER_INVALID_PASSWORD".into()));
        }
        user.hashed_password =
            password::hash_password(&new_password, state.config.auth.password_hash_cost)?;
    }

    Ok(())
}

/// Persist `user`. An email claimed concurrently since [`apply_update`]
/// checked it trips the UNIQUE index.
fn save_user(conn: &Connection, user: &User) -> AppResult<()> {
    users::update(conn, user).map_err(|err| {
        if db::is_constraint_violation(&err) {
            AppError::BadRequest("UPDATE_USER_EMAIL_ALREADY_EXISTS".into())
        } else {
            err.into()
        }
    })
}

fn load_user(state: &AppState, id: Uuid) -> AppResult<User> {
    let conn = state.db.get()?;
    users::get_by_id(&conn, id)?.ok_or_else(|| AppError::NotFound("Not found".into()))
}

/// GET /users/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PATCH /users/me
#[tracing::instrument(skip(state, user, update))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    AppJson(update): AppJson<UserUpdate>,
) -> AppResult<Json<User>> {
    apply_update(&state, &mut user, update)?;

    let conn = state.db.get()?;
    save_user(&conn, &user)?;
    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _admin: SuperUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<User>> {
    Ok(Json(load_user(&state, id)?))
}

/// PATCH /users/{id}
#[tracing::instrument(skip(state, admin, update), fields(admin_id = %admin.0.id))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: SuperUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(update): AppJson<AdminUserUpdate>,
) -> AppResult<Json<User>> {
    let mut user = load_user(&state, id)?;
    apply_update(&state, &mut user, update.profile)?;

    if let Some(active) = update.is_active {
        user.is_active = active;
    }
    if let Some(superuser) = update.is_superuser {
        user.is_superuser = superuser;
    }
    if let Some(verified) = update.is_verified {
        user.is_verified = verified;
    }

    let conn = state.db.get()?;
    save_user(&conn, &user)?;
    tracing::info!(user_id = %user.id, "User updated by superuser");
    Ok(Json(user))
}

/// DELETE /users/{id}
#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: SuperUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if !users::delete(&conn, id)? {
        return Err(AppError::NotFound("Not found".into()));
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
