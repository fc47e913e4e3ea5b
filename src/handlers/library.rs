use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Json,
};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{UploadResponse, UploadedFile};
use crate::services::relative_segments;

use super::{run_blocking, AppState};

/// Lists every stored package as a `/`-separated path relative to the storage root.
pub async fn list_epubs_handler(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let store = state.store.clone();
    let recursive = state.recursive_listing;
    let packages = run_blocking(move || store.list_packages(recursive)).await?;

    info!(count = packages.len(), recursive = recursive, "Listed packages");
    Ok(Json(packages))
}

/// Lists the book directories directly under the storage root.
pub async fn list_books_handler(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let store = state.store.clone();
    let books = run_blocking(move || store.list_books()).await?;

    info!(count = books.len(), "Listed books");
    Ok(Json(books))
}

pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Upload request is not a multipart form");
        AppError::NoFilePart
    })?;

    let file = extract_file_from_multipart(&mut multipart).await?;

    if file.name.is_empty() {
        return Err(AppError::NoSelectedFile);
    }
    if !file.is_epub() {
        return Err(AppError::InvalidFileType);
    }

    let stored_path = file.storage_path();
    relative_segments(&stored_path)?;

    info!(
        file_name = %file.name,
        stored_path = %stored_path,
        file_size = file.size,
        "Storing uploaded package"
    );

    let store = state.store.clone();
    let path = stored_path.clone();
    let content = file.content;
    if let Err(e) = run_blocking(move || store.write(&path, &content)).await {
        error!(stored_path = %stored_path, error = %e, "Failed to store uploaded package");
        return Err(e);
    }

    Ok(Json(UploadResponse::new(stored_path)))
}

/// Reads the whole form; the `file` part may come before or after `book`.
async fn extract_file_from_multipart(multipart: &mut Multipart) -> AppResult<UploadedFile> {
    let mut file = None;
    let mut book = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?;
                debug!("Extracted file: {} ({} bytes)", file_name, data.len());
                file = Some(UploadedFile::new(file_name, data));
            }
            "book" => {
                let value = field.text().await?;
                book = Some(value);
            }
            other => debug!(field = other, "Ignoring unexpected multipart field"),
        }
    }

    file.map(|f| f.with_book(book)).ok_or(AppError::NoFilePart)
}
