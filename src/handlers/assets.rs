use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::{AppError, AppResult};

use super::{run_blocking, AppState};

/// Serves one stored file below the storage root, e.g. an image from an unpacked book.
pub async fn book_asset_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let store = state.store.clone();
    let name = path.clone();
    let content = run_blocking(move || {
        if !store.is_file(&name)? {
            return Err(AppError::not_found(name));
        }
        store.read(&name)
    })
    .await?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.essence_str())
        .map_err(|_| AppError::internal("Invalid content type"))?;

    debug!(path = %path, content_type = %mime, bytes = content.len(), "Serving book asset");

    Ok(([(header::CONTENT_TYPE, content_type)], content).into_response())
}
