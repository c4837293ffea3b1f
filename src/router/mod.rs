//! HTTP API reached by the chat adapter.
pub mod admins;
pub mod credentials;
pub mod equipment;
pub mod faq;
pub mod recipients;
pub mod status;
pub mod tickets;
pub mod users;
pub mod workplaces;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::ServerError;

/// JSON body checked with [`validator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub fn state(pool: sqlx::SqlitePool) -> crate::AppState {
    use std::sync::Arc;

    use crate::crypto::{Crypto, SymmetricKey};

    let key = SymmetricKey::from_bytes([0x2a; 32]).expect("32 bytes key");

    crate::AppState {
        config: Arc::new(crate::config::Configuration {
            api_token: Some(crate::TEST_TOKEN.into()),
            super_admins: vec![2001],
            ..Default::default()
        }),
        db: crate::database::Database { sqlite: pool },
        crypto: Arc::new(Crypto::from_key(key)),
        metrics: None,
    }
}
