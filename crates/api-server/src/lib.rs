//! HTTP surface for the portfolio metrics service.

pub mod config;
mod health_routes;
mod stock_routes;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use portfolio_core::SymbolUniverse;
use portfolio_orchestrator::{JitteredBackoff, PortfolioOrchestrator};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use yahoo_client::YahooClient;

use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PortfolioOrchestrator>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let provider =
            YahooClient::new(config.yahoo.clone()).context("Failed to build Yahoo HTTP client")?;
        let backoff = JitteredBackoff::new(
            config.courtesy_delay_min,
            config.courtesy_delay_max,
            config.rate_limit_cooldown,
        );

        Ok(Self {
            orchestrator: Arc::new(PortfolioOrchestrator::new(
                Arc::new(provider),
                Arc::new(backoff),
                SymbolUniverse::default(),
                config.cache_duration,
                config.batch_timeout,
            )),
        })
    }
}

/// Success envelope: `success: true` plus the flattened payload fields.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> ApiResponse<T> {
    pub fn success(payload: T) -> Self {
        Self {
            success: true,
            payload,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Handler error rendered as `{success: false, error}`.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.error);
        let body = ErrorBody {
            success: false,
            error: self.error.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(stock_routes::stock_routes())
        .merge(health_routes::health_routes())
        .with_state(state)
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let allow_origin = match origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                        None
                    }
                })
                .collect();
            tracing::info!("CORS configured with {} allowed origins", origins.len());
            AllowOrigin::list(origins)
        }
        None => {
            tracing::warn!("CORS allows any origin");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting portfolio metrics server");
    tracing::info!("  Cache duration: {}s", config.cache_duration.as_secs());
    tracing::info!("  Batch timeout: {}s", config.batch_timeout.as_secs());
    tracing::info!("  Yahoo rate limit: {}/min", config.yahoo.rate_limit_per_minute);

    let state = AppState::from_config(&config)?;
    tracing::info!(
        "Tracking {} symbols across {} sectors",
        state.orchestrator.universe().len(),
        state.orchestrator.universe().sectors().len()
    );

    if config.warm_cache_on_startup {
        let orchestrator = Arc::clone(&state.orchestrator);
        tokio::spawn(async move {
            tracing::info!("Warming snapshot cache");
            if let Err(e) = orchestrator.stock_details().await {
                tracing::error!("Cache warm-up failed: {}", e);
            }
        });
    }

    let router = app(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(config.cors_allowed_origins.as_deref())),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use portfolio_orchestrator::testing::ScriptedProvider;
    use portfolio_orchestrator::NoBackoff;
    use std::time::Duration;
    use tower::ServiceExt;

    pub fn state_with(provider: Arc<ScriptedProvider>) -> AppState {
        AppState {
            orchestrator: Arc::new(PortfolioOrchestrator::new(
                provider,
                Arc::new(NoBackoff),
                SymbolUniverse::default(),
                Duration::from_secs(1800),
                Duration::from_secs(300),
            )),
        }
    }

    pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_envelope() {
        let response = AppError::from(anyhow::anyhow!("upstream exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_app_error_body() {
        let response = AppError::with_status(
            StatusCode::SERVICE_UNAVAILABLE,
            anyhow::anyhow!("try later"),
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "try later");
    }

    #[test]
    fn test_success_envelope_flattens_payload() {
        #[derive(Serialize)]
        struct Payload {
            total: usize,
        }
        let value = serde_json::to_value(ApiResponse::success(Payload { total: 3 })).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "total": 3}));
    }
}
