//! Identity: who is calling, and the account lifecycle around that.
//!
//! Application routes only see [`IdentityProvider`] through the
//! `CurrentUser` extractor. Registration, login, password reset, email
//! verification and profile management live in `handlers` and `users`.

pub mod handlers;
pub mod password;
pub mod tokens;
pub mod users;

use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::User;

pub use tokens::{AccountTokens, JwtIdentityProvider};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Turns credentials into user ids and back.
pub trait IdentityProvider: Send + Sync {
    /// Mint a bearer token for `user`.
    fn issue_access_token(&self, user: &User) -> Result<String, AuthError>;

    /// Validate a bearer token and return the id of the user it was issued to.
    fn authenticate(&self, token: &str) -> Result<Uuid, AuthError>;
}

pub type DynIdentityProvider = Arc<dyn IdentityProvider>;
