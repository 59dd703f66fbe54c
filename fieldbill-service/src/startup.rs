use crate::config::{AppConfig, StorageBackend};
use crate::handlers;
use crate::middleware::track_metrics;
use crate::services::{Database, LocalStorage, S3Storage, Storage};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use service_core::error::AppError;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

// Base64-encoded photo payloads run ~4/3 over the 10MB raw limit.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub storage: Arc<dyn Storage>,
}

pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: AppConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

        let storage: Arc<dyn Storage> = match config.storage.backend {
            StorageBackend::Local => Arc::new(
                LocalStorage::new(
                    &config.storage.local_path,
                    config.storage.public_base_url.clone(),
                )
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?,
            ),
            StorageBackend::S3 => {
                let bucket = config.storage.s3_bucket.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "STORAGE_S3_BUCKET is required for the s3 backend"
                    ))
                })?;
                let region = config.storage.s3_region.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "STORAGE_S3_REGION is required for the s3 backend"
                    ))
                })?;
                let sdk_config =
                    aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
                Arc::new(S3Storage::new(
                    aws_sdk_s3::Client::new(&sdk_config),
                    bucket,
                    region,
                ))
            }
        };

        let state = AppState {
            config: config.clone(),
            db,
            storage,
        };

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/customers",
            post(handlers::create_customer).get(handlers::list_customers),
        )
        .route(
            "/customers/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route(
            "/estimates",
            post(handlers::create_estimate).get(handlers::list_estimates),
        )
        .route(
            "/estimates/:id",
            get(handlers::get_estimate)
                .put(handlers::update_estimate)
                .delete(handlers::delete_estimate),
        )
        .route("/estimates/:id/approve", post(handlers::approve_estimate))
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route(
            "/invoices/:id",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route("/invoices/:id/payment", post(handlers::record_payment))
        .route("/photos/upload", post(handlers::upload_photo))
        .route("/photos", get(handlers::list_photos))
        .route("/photos/:id", delete(handlers::delete_photo))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
