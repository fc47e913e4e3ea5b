use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::{require_field, ChapterResponse, ReadBookRequest, ReadChapterRequest, ReadEpubRequest};
use crate::services::select_chapter;

use super::{run_blocking, AppState};

pub async fn read_epub_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReadEpubRequest>, JsonRejection>,
) -> AppResult<Json<Vec<String>>> {
    let Json(request) = payload?;
    let filename = require_field(request.filename, "filename")?;

    let chapters = load_chapters(&state, filename).await?;
    Ok(Json(chapters))
}

/// `bookname` may be a package path or a book directory; a directory resolves to its
/// first package in sorted order.
pub async fn read_book_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReadBookRequest>, JsonRejection>,
) -> AppResult<Json<Vec<String>>> {
    let Json(request) = payload?;
    let bookname = require_field(request.bookname, "bookname")?;

    let store = state.store.clone();
    let package = run_blocking(move || {
        if store.is_dir(&bookname)? {
            store
                .first_package_in(&bookname)?
                .ok_or_else(|| AppError::not_found(bookname))
        } else {
            Ok(bookname)
        }
    })
    .await?;

    let chapters = load_chapters(&state, package).await?;
    Ok(Json(chapters))
}

pub async fn read_epub_chapter_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReadChapterRequest>, JsonRejection>,
) -> AppResult<Json<ChapterResponse>> {
    let Json(request) = payload?;
    let filename = require_field(request.filename, "filename")?;
    let chapter_index = request.chapter_index.unwrap_or(0);

    let chapters = load_chapters(&state, filename.clone()).await?;
    let response = select_chapter(chapters, chapter_index)?;

    info!(
        filename = %filename,
        chapter_index = response.chapter_index,
        total_chapters = response.total_chapters,
        "Chapter served"
    );

    Ok(Json(response))
}

/// Locates the package and extracts all of its chapters.
async fn load_chapters(state: &AppState, filename: String) -> AppResult<Vec<String>> {
    let start = Instant::now();
    let store = state.store.clone();
    let processor = state.processor.clone();
    let name = filename.clone();

    let result = run_blocking(move || {
        if !store.is_file(&name)? {
            return Err(AppError::not_found(name));
        }
        let package = store.read(&name)?;
        processor.extract_chapters(&name, package)
    })
    .await;

    match result {
        Ok(chapters) => {
            info!(
                filename = %filename,
                chapters = chapters.len(),
                total_time_ms = start.elapsed().as_millis() as u64,
                "Package read successfully"
            );
            Ok(chapters)
        }
        Err(e) => {
            if let AppError::ProcessingError { .. } = e {
                error!(filename = %filename, error = %e, "Failed to read package");
            }
            Err(e)
        }
    }
}
