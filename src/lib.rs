//! Bookshelf EPUB Service
//!
//! Stores uploaded EPUB packages on disk, lists them, and extracts the plain
//! text of their chapters for reader clients.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use handlers::{create_router, AppState};
