use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReadEpubRequest {
    pub filename: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReadBookRequest {
    pub bookname: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadChapterRequest {
    pub filename: Option<String>,
    pub chapter_index: Option<i64>,
}

/// A file pulled out of an upload form, before it is written to storage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: usize,
    pub content: bytes::Bytes,
    pub book: Option<String>,
}

impl UploadedFile {
    pub fn new(name: String, content: bytes::Bytes) -> Self {
        let size = content.len();
        Self {
            name,
            size,
            content,
            book: None,
        }
    }

    pub fn with_book(mut self, book: Option<String>) -> Self {
        self.book = book.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn is_epub(&self) -> bool {
        is_epub_name(&self.name)
    }

    /// Relative storage path: `<book>/<name>` when grouped, `<name>` otherwise.
    pub fn storage_path(&self) -> String {
        match &self.book {
            Some(book) => format!("{}/{}", book.trim().trim_matches('/'), self.name),
            None => self.name.clone(),
        }
    }
}

pub fn is_epub_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".epub")
}

/// Returns a required text field, or `MissingField` when it is absent or empty.
pub fn require_field(value: Option<String>, field: &'static str) -> AppResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::MissingField { field }),
    }
}
