use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use epub::doc::EpubDoc;
use scraper::{ElementRef, Html};

use crate::error::{AppError, AppResult};
use crate::models::ChapterResponse;

/// A renderable markup item from inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentItem {
    pub path: String,
    pub media_type: String,
    pub content: String,
}

/// Opens package bytes and yields their document items in reading order.
pub trait PackageReader: Send + Sync {
    fn document_items(&self, package: Vec<u8>) -> AppResult<Vec<DocumentItem>>;
}

/// `PackageReader` backed by the `epub` crate. Items follow the spine.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubReader;

impl PackageReader for EpubReader {
    fn document_items(&self, package: Vec<u8>) -> AppResult<Vec<DocumentItem>> {
        let mut doc = EpubDoc::from_reader(Cursor::new(package))
            .map_err(|e| AppError::processing(e.to_string()))?;

        let num_chapters = doc.get_num_chapters();
        let mut items = Vec::with_capacity(num_chapters);

        for index in 0..num_chapters {
            if !doc.set_current_chapter(index) {
                return Err(AppError::processing(format!(
                    "Spine item {} could not be opened",
                    index
                )));
            }

            let path = doc
                .get_current_path()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_else(|| format!("spine-{}", index));

            let media_type = doc.get_current_mime().ok_or_else(|| {
                AppError::processing(format!("Missing spine item: {}", path))
            })?;

            // Images and other binary items in the spine are not chapters.
            if !is_document_media_type(&media_type) {
                tracing::debug!(path = %path, media_type = %media_type, "Skipping non-document spine item");
                continue;
            }

            let (content, _) = doc.get_current_str().ok_or_else(|| {
                AppError::processing(format!("Unreadable document item: {}", path))
            })?;

            items.push(DocumentItem {
                path,
                media_type,
                content,
            });
        }

        Ok(items)
    }
}

fn is_document_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case("application/xhtml+xml") || essence.eq_ignore_ascii_case("text/html")
}

/// Elements whose text is code or inert markup rather than readable content.
const NON_TEXT_ELEMENTS: &[&str] = &["style", "script", "template"];

/// Concatenates the readable text nodes of the markup, in document order.
pub fn html_to_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|element| NON_TEXT_ELEMENTS.contains(&element.value().name()));
        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}

/// Turns packages into chapter text.
#[derive(Clone)]
pub struct EpubProcessor {
    reader: Arc<dyn PackageReader>,
}

impl EpubProcessor {
    pub fn new() -> Self {
        Self::with_reader(Arc::new(EpubReader))
    }

    pub fn with_reader(reader: Arc<dyn PackageReader>) -> Self {
        Self { reader }
    }

    /// Extracts every chapter. Any failure aborts the whole extraction.
    pub fn extract_chapters(&self, name: &str, package: Vec<u8>) -> AppResult<Vec<String>> {
        let start = Instant::now();
        let size = package.len();

        tracing::info!("Starting chapter extraction for package: {} ({} bytes)", name, size);

        let items = self.reader.document_items(package)?;
        let chapters: Vec<String> = items.iter().map(|item| html_to_text(&item.content)).collect();

        tracing::info!(
            package = name,
            chapters = chapters.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Chapter extraction completed"
        );

        Ok(chapters)
    }

    pub fn is_available(&self) -> bool {
        true
    }
}

impl Default for EpubProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks one chapter out of a fully extracted package.
pub fn select_chapter(mut chapters: Vec<String>, index: i64) -> AppResult<ChapterResponse> {
    let total_chapters = chapters.len();
    let chapter_index = usize::try_from(index)
        .ok()
        .filter(|i| *i < total_chapters)
        .ok_or(AppError::InvalidChapterIndex)?;

    Ok(ChapterResponse {
        chapter: chapters.swap_remove(chapter_index),
        total_chapters,
        chapter_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedReader(Vec<DocumentItem>);

    impl PackageReader for FixedReader {
        fn document_items(&self, _package: Vec<u8>) -> AppResult<Vec<DocumentItem>> {
            Ok(self.0.clone())
        }
    }

    struct FailingReader;

    impl PackageReader for FailingReader {
        fn document_items(&self, _package: Vec<u8>) -> AppResult<Vec<DocumentItem>> {
            Err(AppError::processing("Bad Zip file"))
        }
    }

    fn item(path: &str, content: &str) -> DocumentItem {
        DocumentItem {
            path: path.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_html_to_text_strips_markup() {
        let text = html_to_text("<html><body><h1>Title</h1><p>Hello <b>bold</b> world</p></body></html>");
        assert_eq!(text, "TitleHello bold world");
    }

    #[test]
    fn test_html_to_text_handles_xhtml_prolog() {
        let markup = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"><body><p>One</p></body></html>"#;
        assert!(html_to_text(markup).contains("One"));
        assert!(!html_to_text(markup).contains("xml version"));
    }

    #[test]
    fn test_html_to_text_skips_style_and_script() {
        let text = html_to_text(
            "<html><head><title>T</title><style>p { color: red; }</style>\
             <script>var x = 1;</script></head><body><p>Body</p>\
             <template><p>Hidden</p></template></body></html>",
        );
        assert_eq!(text, "TBody");
    }

    #[test]
    fn test_document_media_types() {
        assert!(is_document_media_type("application/xhtml+xml"));
        assert!(is_document_media_type("text/html; charset=utf-8"));
        assert!(!is_document_media_type("image/png"));
        assert!(!is_document_media_type("text/css"));
    }

    #[test]
    fn test_extract_chapters_preserves_reader_order() {
        let processor = EpubProcessor::with_reader(Arc::new(FixedReader(vec![
            item("b.xhtml", "<p>second file first</p>"),
            item("a.xhtml", "<p>first file second</p>"),
        ])));
        let chapters = processor.extract_chapters("x.epub", vec![]).unwrap();
        assert_eq!(chapters, vec!["second file first", "first file second"]);
    }

    #[test]
    fn test_extract_chapters_propagates_message_verbatim() {
        let processor = EpubProcessor::with_reader(Arc::new(FailingReader));
        let err = processor.extract_chapters("x.epub", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "Bad Zip file");
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_epub_reader_rejects_garbage() {
        let err = EpubReader.document_items(b"not a zip archive".to_vec()).unwrap_err();
        assert!(matches!(err, AppError::ProcessingError { .. }));
    }

    #[test]
    fn test_select_chapter_bounds() {
        let chapters = vec!["one".to_string(), "two".to_string()];
        let selected = select_chapter(chapters.clone(), 1).unwrap();
        assert_eq!(selected.chapter, "two");
        assert_eq!(selected.total_chapters, 2);
        assert_eq!(selected.chapter_index, 1);

        assert!(matches!(select_chapter(chapters.clone(), 2), Err(AppError::InvalidChapterIndex)));
        assert!(matches!(select_chapter(chapters.clone(), 5), Err(AppError::InvalidChapterIndex)));
        assert!(matches!(select_chapter(chapters, -1), Err(AppError::InvalidChapterIndex)));
        assert!(matches!(select_chapter(vec![], 0), Err(AppError::InvalidChapterIndex)));
    }
}
