//! itdesk is a helpdesk ticket lifecycle and IT asset ledger service.

#[forbid(unsafe_code)]
#[deny(unused_mut)]
pub mod config;
pub mod credential;
pub mod crypto;
pub mod database;
pub mod equipment;
pub mod error;
pub mod faq;
pub mod middleware;
pub mod rating;
mod router;
pub mod telemetry;
pub mod ticket;
pub mod user;
pub mod workplace;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
pub use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// Adapter token of [`router::state`].
#[cfg(test)]
pub const TEST_TOKEN: &str = "test-token";

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    actor: Option<i64>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    dbg!(&actor, &method, path, &body);

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {TEST_TOKEN}"));
    if let Some(actor) = actor {
        request = request.header(middleware::ACTOR_HEADER, actor.to_string());
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::Crypto>,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION, HeaderName::from_static(middleware::ACTOR_HEADER)]),
        );

    let protected = Router::new()
        .nest("/users", router::users::router())
        .nest("/recipients", router::recipients::router())
        .nest("/admins", router::admins::router())
        .nest("/tickets", router::tickets::router())
        .nest("/equipment", router::equipment::router())
        .nest("/workplaces", router::workplaces::router())
        .nest("/faq", router::faq::router())
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /metrics` goes to `metrics`.
        .route("/metrics", get(router::status::metrics))
        .merge(protected)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let db = database::Database::new(&config.database.path, config.database.pool_size).await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    // fill the workplace directory of a fresh store.
    workplace::WorkplaceRepository::new(db.sqlite.clone())
        .with_seed(config.workplaces.clone())
        .seed_if_empty()
        .await?;

    let key = std::env::var("CREDENTIALS_KEY")
        .map_err(|_| "missing `CREDENTIALS_KEY` environnement variable")?;
    let salt = std::env::var("CREDENTIALS_SALT")
        .map_err(|_| "missing `CREDENTIALS_SALT` environnement variable")?;
    let crypto = Arc::new(crypto::Crypto::new(key, salt)?);

    let metrics = if config.telemetry.as_ref().is_some_and(|t| t.prometheus) {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    Ok(AppState {
        config,
        db,
        crypto,
        metrics,
    })
}
