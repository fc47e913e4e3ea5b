pub mod assets;
pub mod health;
pub mod library;
pub mod reader;

pub use assets::*;
pub use health::*;
pub use library::*;
pub use reader::*;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::AppResult;
use crate::middleware::logging::logging_middleware;
use crate::services::{EpubProcessor, PackageStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PackageStore>,
    pub processor: EpubProcessor,
    pub recursive_listing: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn PackageStore>, recursive_listing: bool) -> Self {
        Self {
            store,
            processor: EpubProcessor::new(),
            recursive_listing,
        }
    }

    pub fn with_processor(mut self, processor: EpubProcessor) -> Self {
        self.processor = processor;
        self
    }
}

/// Runs filesystem and parsing work off the async executor.
pub(crate) async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the application router
pub fn create_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/list-epubs", get(list_epubs_handler))
        .route("/api/list-books", get(list_books_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/read-epub", post(read_epub_handler))
        .route("/api/read-book", post(read_book_handler))
        .route("/api/read-epub-chapter", post(read_epub_chapter_handler))
        .route("/api/book-assets/*path", get(book_asset_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.allowed_origins))
                .layer(DefaultBodyLimit::max(config.max_upload_size_bytes()))
                .layer(axum::middleware::from_fn(logging_middleware)),
        )
        .with_state(state)
}
