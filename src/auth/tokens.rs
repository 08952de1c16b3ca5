use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{password, AuthError, IdentityProvider};
use crate::config::AuthConfig;
use crate::db::models::User;

pub const ACCESS_AUDIENCE: &str = "snapfeed:auth";
pub const RESET_AUDIENCE: &str = "snapfeed:reset";
pub const VERIFY_AUDIENCE: &str = "snapfeed:verify";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_fgpt: Option<String>,
}

impl Claims {
    fn new(user: &User, audience: &str, lifetime_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            aud: audience.to_string(),
            iat: now,
            exp: now + lifetime_secs,
            email: None,
            password_fgpt: None,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// HS256 signing shared by access, reset and verify tokens. Audiences keep
/// one kind of token from being replayed as another.
#[derive(Clone)]
struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtCodec {
    fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }

    fn decode(&self, token: &str, audience: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Resolve the signing secret. Without one configured, tokens are signed
/// with a per-process random secret and do not survive a restart.
pub fn resolve_secret(config: &AuthConfig) -> String {
    match config.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => secret.to_string(),
        _ => {
            tracing::warn!("auth.jwt_secret is not set; issued tokens will not survive a restart");
            generate_secret()
        }
    }
}

fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Bearer tokens for the API.
pub struct JwtIdentityProvider {
    codec: JwtCodec,
    lifetime_secs: i64,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        Self {
            codec: JwtCodec::new(secret),
            lifetime_secs,
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn issue_access_token(&self, user: &User) -> Result<String, AuthError> {
        self.codec
            .encode(&Claims::new(user, ACCESS_AUDIENCE, self.lifetime_secs))
    }

    fn authenticate(&self, token: &str) -> Result<Uuid, AuthError> {
        self.codec.decode(token, ACCESS_AUDIENCE)?.user_id()
    }
}

/// One-shot tokens for password reset and email verification.
pub struct AccountTokens {
    codec: JwtCodec,
    reset_lifetime_secs: i64,
    verify_lifetime_secs: i64,
}

impl AccountTokens {
    pub fn new(secret: &str, config: &AuthConfig) -> Self {
        Self {
            codec: JwtCodec::new(secret),
            reset_lifetime_secs: config.reset_token_lifetime_secs,
            verify_lifetime_secs: config.verify_token_lifetime_secs,
        }
    }

    pub fn reset_token(&self, user: &User) -> Result<String, AuthError> {
        let mut claims = Claims::new(user, RESET_AUDIENCE, self.reset_lifetime_secs);
        claims.password_fgpt = Some(password::fingerprint(&user.hashed_password)?);
        self.codec.encode(&claims)
    }

    /// Returns the user id and the password fingerprint the token was bound to.
    pub fn decode_reset_token(&self, token: &str) -> Result<(Uuid, String), AuthError> {
        let claims = self.codec.decode(token, RESET_AUDIENCE)?;
        let user_id = claims.user_id()?;
        let fgpt = claims.password_fgpt.ok_or(AuthError::InvalidToken)?;
        Ok((user_id, fgpt))
    }

    pub fn verify_token(&self, user: &User) -> Result<String, AuthError> {
        let mut claims = Claims::new(user, VERIFY_AUDIENCE, self.verify_lifetime_secs);
        claims.email = Some(user.email.clone());
        self.codec.encode(&claims)
    }

    /// Returns the user id and the email address the token was issued for.
    pub fn decode_verify_token(&self, token: &str) -> Result<(Uuid, String), AuthError> {
        let claims = self.codec.decode(token, VERIFY_AUDIENCE)?;
        let user_id = claims.user_id()?;
        let email = claims.email.ok_or(AuthError::InvalidToken)?;
        Ok((user_id, email))
    }
}
