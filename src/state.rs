use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::tokens::resolve_secret;
use crate::auth::{AccountTokens, DynIdentityProvider, JwtIdentityProvider};
use crate::config::Config;
use crate::media::DynMediaStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub identity: DynIdentityProvider,
    pub account_tokens: Arc<AccountTokens>,
    pub media: DynMediaStore,
}

impl AppState {
    /// Wire the token services from `config.auth`; both share one secret.
    pub fn new(db: DbPool, config: Config, media: DynMediaStore) -> Self {
        let secret = resolve_secret(&config.auth);
        let identity = Arc::new(JwtIdentityProvider::new(
            &secret,
            config.auth.token_lifetime_secs,
        ));
        let account_tokens = Arc::new(AccountTokens::new(&secret, &config.auth));

        Self {
            db,
            config,
            identity,
            account_tokens,
            media,
        }
    }
}
