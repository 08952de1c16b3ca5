use axum::routing::{get, post};
use axum::Router;

use crate::auth::{handlers, users};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/jwt/login", post(handlers::login))
        .route("/auth/jwt/logout", post(handlers::logout))
        .route("/auth/forgot-password", post(handlers::forgot_password))
        .route("/auth/reset-password", post(handlers::reset_password))
        .route(
            "/auth/request-verify-token",
            post(handlers::request_verify_token),
        )
        .route("/auth/verify", post(handlers::verify))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}
