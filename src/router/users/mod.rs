//! Users-related HTTP API.
mod delete;
mod get;
mod role;
mod update;

use axum::Router;
use axum::routing::{get, put};

use crate::AppState;
use crate::router::credentials;

pub fn router() -> Router<AppState> {
    Router::new()
        // `GET /users/@me/credentials` goes to `credentials::list`.
        .route(
            "/@me/credentials",
            get(credentials::list).post(credentials::add),
        )
        .route(
            "/@me/credentials/{credential_id}",
            axum::routing::delete(credentials::delete),
        )
        // `PUT /users/{id}` goes to `update`. Adapter token only.
        .route(
            "/{user_id}",
            get(get::handler)
                .put(update::handler)
                .delete(delete::handler),
        )
        .route("/{user_id}/role", put(role::handler))
        .route("/{user_id}/tickets", get(get::tickets))
        .route("/{user_id}/equipment", get(get::equipment))
}
