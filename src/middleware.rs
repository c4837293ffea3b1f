//! Middlewares for routes.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::ServerError;
use crate::error::Result;
use crate::user::{Role, UserRepository};

const BEARER: &str = "Bearer ";
/// Header carrying the chat identity acting through the adapter.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Identity behind a request, resolved from the directory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Allow `owner` itself and administrators.
    pub fn check_owner_or_admin(&self, owner: i64) -> Result<()> {
        if self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::Forbidden)
        }
    }
}

/// Middleware checking the adapter token and resolving the actor.
///
/// Requests without an actor header pass through; handlers that need an
/// [`Actor`] reject them.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    if let Some(expected) = state.config.api_token.as_deref() {
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix(BEARER));

        if token != Some(expected) {
            return Err(ServerError::Unauthorized);
        }
    }

    let actor_id = match req.headers().get(ACTOR_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .ok()
                .and_then(|id| id.trim().parse::<i64>().ok())
                .ok_or(ServerError::Unauthorized)?,
        ),
        None => None,
    };

    if let Some(id) = actor_id {
        match UserRepository::new(state.db.sqlite.clone()).role(id).await? {
            Some(role) => {
                req.extensions_mut().insert(Actor { id, role });
            },
            None => tracing::debug!(actor = id, "unknown actor"),
        }
    }

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .ok_or(ServerError::Unauthorized)
    }
}

/// [`Actor`] holding the `admin` role.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Admin(pub Actor);

impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let actor = Actor::from_request_parts(parts, state).await?;

        if actor.is_admin() {
            Ok(Admin(actor))
        } else {
            tracing::warn!(actor = actor.id, "administrator route refused");
            Err(ServerError::Forbidden)
        }
    }
}
