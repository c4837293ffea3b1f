use std::path::PathBuf;

use itdesk::{app, config, initialize_state, telemetry};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const CONFIG_ENV: &str = "ITDESK_CONFIG";

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let path = std::env::var(CONFIG_ENV).map(PathBuf::from).unwrap_or_default();
    let config = config::Configuration::default().path(path).read();

    let endpoint = config
        .telemetry
        .as_ref()
        .and_then(|telemetry| telemetry.otlp_endpoint.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let otel_logs = match &endpoint {
        Some(endpoint) => Some(telemetry::setup_logging(endpoint)?),
        None => None,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter))
        .with(otel_logs)
        .init();

    let tracer = match &endpoint {
        Some(endpoint) => {
            let provider = telemetry::setup_tracer(endpoint)?;
            opentelemetry::global::set_tracer_provider(provider.clone());
            Some(provider)
        },
        None => None,
    };

    let state = initialize_state(config.clone()).await?;

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    tracing::info!(address = %config.address, version = env!("CARGO_PKG_VERSION"), "server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = tracer {
        if let Err(err) = provider.shutdown() {
            tracing::warn!(error = %err, "tracer did not flush");
        }
    }

    Ok(())
}
