//! Grafka API Gateway
//!
//! The HTTP entry point for questions and ingestion.
//! Handles:
//! - Tenant resolution
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use grafka_common::{config::AppConfig, metrics, Services};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Services,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        service = %config.observability.service_name,
        "Starting Grafka API Gateway v{}",
        grafka_common::VERSION
    );

    // Initialize metrics
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    let exporter = PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .set_buckets(metrics::LATENCY_BUCKETS)
        .and_then(|builder| builder.install());
    match exporter {
        Ok(()) => info!(%metrics_addr, "Prometheus exporter listening"),
        Err(e) => warn!(error = %e, "Prometheus exporter unavailable"),
    }
    metrics::register_metrics();

    // Build every client once
    let services = Services::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize services");
        e
    })?;

    let state = AppState {
        config: services.config.clone(),
        services,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_timeout = TimeoutLayer::new(state.config.request_timeout());

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        .route("/query", post(handlers::query::query))
        .route("/extract", post(handlers::extract::extract));

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        match create_rate_limiter(rate_limit.requests_per_second, rate_limit.burst) {
            Some(limiter) => {
                api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
                    limiter,
                    rate_limit_middleware,
                ));
            }
            None => warn!("Rate limit quota must be non-zero, rate limiting disabled"),
        }
    }

    // Health endpoints are never rate limited
    let api_routes = api_routes
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(request_timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
