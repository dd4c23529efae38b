use crate::config::{ExteriorConfig, StorageBackend};
use crate::handlers;
use crate::services::providers::gradio::GradioFloorPlanProvider;
use crate::services::providers::replicate::ReplicateProvider;
use crate::services::providers::{FloorPlanProvider, ImageToImageProvider};
use crate::services::{LocalStorage, ObjectStore, S3Storage};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Largest accepted request body (multipart photo uploads).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Long-lived clients shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn ObjectStore>,
    pub image_model: Arc<dyn ImageToImageProvider>,
    pub floor_plan: Arc<dyn FloorPlanProvider>,
}

impl AppState {
    /// Builds the production clients described by `config`.
    pub async fn from_config(config: &ExteriorConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn ObjectStore> = match config.storage.backend {
            StorageBackend::S3 => {
                tracing::info!(
                    bucket = %config.storage.s3_bucket,
                    region = %config.storage.s3_region,
                    "Using S3 storage"
                );
                Arc::new(S3Storage::from_config(&config.storage).await)
            }
            StorageBackend::Local => {
                let storage = LocalStorage::new(
                    &config.storage.local_path,
                    &config.storage.public_base_url,
                )
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?;
                tracing::info!(path = %config.storage.local_path, "Using local storage");
                Arc::new(storage)
            }
        };

        let image_model = ReplicateProvider::new(&config.replicate).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Replicate provider: {}", e))
        })?;
        tracing::info!(model = %config.replicate.model, "Initialized Replicate provider");

        let floor_plan = GradioFloorPlanProvider::new(&config.floor_plan);
        tracing::info!(space = %config.floor_plan.space, "Initialized floor plan provider");

        Ok(Self {
            storage,
            image_model: Arc::new(image_model),
            floor_plan: Arc::new(floor_plan),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/upload-exterior", post(handlers::upload_exterior))
        .route("/get-plan", post(handlers::get_plan))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    /// Production server: clients from `config`, stops on SIGINT/SIGTERM.
    pub async fn build(config: ExteriorConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).await?;
        Self::serve(config.common.port, state, shutdown_signal()).await
    }

    /// Server with caller-supplied clients that runs until dropped.
    pub async fn build_with_state(config: ExteriorConfig, state: AppState) -> Result<Self, AppError> {
        Self::serve(config.common.port, state, std::future::pending()).await
    }

    /// Binds the listener and prepares a server that stops when `shutdown`
    /// resolves.
    pub async fn serve<F>(port: u16, state: AppState, shutdown: F) -> Result<Self, AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Server runs at http://localhost:{}", port);

        let server = axum::serve(listener, router(state)).with_graceful_shutdown(shutdown);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
