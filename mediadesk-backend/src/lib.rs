pub mod blob;
pub mod category;
pub mod cli;
pub mod content;
pub mod entity;
pub mod image_info;
pub mod logging;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod repository;
pub mod storage;
pub mod workflow;
#[cfg(test)]
mod tests;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{header, Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use category::{get_categories, post_category};
use content::{
    delete_content, download_content, get_content, get_thumbnail, post_content, update_content,
};
use mediadesk_shared::error::ContentError;
use sea_orm::DatabaseConnection;
use std::{borrow::Cow, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tower::{BoxError, ServiceBuilder};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

use crate::{
    blob::LocalBlobStore, cli::AppConfig, logging::logging_layer, openapi::api_route,
    repository::{ContentRepository, SeaOrmRepository},
    workflow::ContentEditWorkflow,
};

pub type SharedState = Arc<RwLock<AppState>>;

/// Largest upload we'll accept
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub struct AppState {
    pub conn: DatabaseConnection,
    pub repository: Arc<dyn ContentRepository>,
    pub workflow: ContentEditWorkflow,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self, ContentError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = storage::new(&config.db_path).await?;
        Ok(Self::with_connection(
            conn,
            LocalBlobStore::new(&config.blob_path, &config.cache_path),
        ))
    }

    pub fn with_connection(conn: DatabaseConnection, blobs: LocalBlobStore) -> Self {
        let repository: Arc<dyn ContentRepository> = Arc::new(SeaOrmRepository::new(conn.clone()));
        let workflow = ContentEditWorkflow::new(repository.clone(), Arc::new(blobs));
        Self {
            conn,
            repository,
            workflow,
        }
    }

    #[cfg(test)]
    pub async fn test(scratch: &std::path::Path) -> Self {
        let db = storage::start_db(None)
            .await
            .expect("Failed to start test DB");
        Self::with_connection(
            db,
            LocalBlobStore::new(scratch.join("content"), scratch.join("cache")),
        )
    }
}

pub fn build_app<T>(shared_state: &SharedState) -> Router<T> {
    // Build our application by composing routes
    let router = Router::new()
        .route(
            "/api/v1/content",
            post(post_content).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/content/{id}",
            get(get_content)
                .put(update_content)
                .delete(delete_content)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/content/{id}/file", get(download_content))
        .route(
            "/api/v1/content/{id}/thumbnail/{width}",
            get(get_thumbnail),
        )
        .route("/api/v1/categories", get(get_categories))
        .route("/api/v1/category", post(post_category))
        .merge(api_route());

    router
        // Add middleware to all routes
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(middleware::corslayer())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    |response: &Response<Body>| {
                        if response.status() == StatusCode::OK {
                            "private, no-transform max-age=0".parse().ok()
                        } else {
                            None
                        }
                    },
                ))
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(logging_layer()),
        )
        .with_state(shared_state.clone())
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        let msg = "service is overloaded, try again later";
        error!("{}", msg);
        return (StatusCode::SERVICE_UNAVAILABLE, Cow::from(msg));
    }

    let msg = format!("Unhandled internal error: {error}");
    error!("{}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, Cow::from(msg))
}

#[tokio::test]
async fn test_handle_error() {
    let err = tower::timeout::error::Elapsed::new();
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);

    let err = tower::load_shed::error::Overloaded::new();
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = handle_error("boom".into()).await.into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
