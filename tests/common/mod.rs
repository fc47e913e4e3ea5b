//! Shared fixtures for the HTTP-level tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bookshelf::{
    create_router,
    services::{MemoryStore, PackageStore},
    AppResult, AppState, Config,
};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";

pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 5000,
        upload_dir: PathBuf::from("unused"),
        allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
        recursive_listing: true,
        max_upload_size_mb: 5,
    }
}

/// Starts the service on an ephemeral port and returns its base URL.
pub async fn spawn_app(store: Arc<dyn PackageStore>) -> String {
    let config = test_config();
    let app = create_router(AppState::new(store, config.recursive_listing), &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Builds a minimal EPUB 2 package with one spine document per `(title, body)` pair.
pub fn build_epub(chapters: &[(&str, &str)]) -> Vec<u8> {
    build_package(chapters, false)
}

/// Like `build_epub`, but the spine opens with a binary PNG item ahead of the chapters.
pub fn build_epub_with_spine_image(chapters: &[(&str, &str)]) -> Vec<u8> {
    build_package(chapters, true)
}

fn build_package(chapters: &[(&str, &str)], spine_image: bool) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", stored).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )
    .unwrap();

    let mut manifest = String::from(
        r#"    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
"#,
    );
    let mut spine = String::new();
    if spine_image {
        manifest.push_str(
            "    <item id=\"plate\" href=\"plate.png\" media-type=\"image/png\"/>\n",
        );
        spine.push_str("    <itemref idref=\"plate\"/>\n");
    }
    let mut nav_points = String::new();
    for (i, (title, _)) in chapters.iter().enumerate() {
        let n = i + 1;
        manifest.push_str(&format!(
            "    <item id=\"chapter{n}\" href=\"chapter{n}.xhtml\" media-type=\"application/xhtml+xml\"/>\n"
        ));
        spine.push_str(&format!("    <itemref idref=\"chapter{n}\"/>\n"));
        nav_points.push_str(&format!(
            "    <navPoint id=\"nav{n}\" playOrder=\"{n}\"><navLabel><text>{title}</text></navLabel><content src=\"chapter{n}.xhtml\"/></navPoint>\n"
        ));
    }

    zip.start_file("OEBPS/content.opf", stored).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Sample</dc:title>
    <dc:identifier id="bookid">urn:uuid:0b7c2a4e-sample</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>"#
        )
        .as_bytes(),
    )
    .unwrap();

    zip.start_file("OEBPS/toc.ncx", stored).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:0b7c2a4e-sample"/></head>
  <docTitle><text>Sample</text></docTitle>
  <navMap>
{nav_points}  </navMap>
</ncx>"#
        )
        .as_bytes(),
    )
    .unwrap();

    zip.start_file("OEBPS/style.css", stored).unwrap();
    zip.write_all(b"p { margin: 0; }").unwrap();

    if spine_image {
        zip.start_file("OEBPS/plate.png", stored).unwrap();
        zip.write_all(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0xfe, 0x00, 0xc3])
            .unwrap();
    }

    for (i, (title, body)) in chapters.iter().enumerate() {
        zip.start_file(format!("OEBPS/chapter{}.xhtml", i + 1), stored).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title></title></head><body><h1>{title}</h1><p>{body}</p></body></html>"#
            )
            .as_bytes(),
        )
        .unwrap();
    }

    zip.finish().unwrap().into_inner()
}

pub fn sample_epub() -> Vec<u8> {
    build_epub(&[
        ("Chapter One", "It was a bright cold day in April."),
        ("Chapter Two", "The clocks were striking thirteen."),
    ])
}

/// In-memory store that counts every storage call it receives.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl PackageStore for CountingStore {
    fn root_display(&self) -> String {
        self.inner.root_display()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn list_packages(&self, recursive: bool) -> AppResult<Vec<String>> {
        self.touch();
        self.inner.list_packages(recursive)
    }

    fn list_books(&self) -> AppResult<Vec<String>> {
        self.touch();
        self.inner.list_books()
    }

    fn is_file(&self, path: &str) -> AppResult<bool> {
        self.touch();
        self.inner.is_file(path)
    }

    fn is_dir(&self, path: &str) -> AppResult<bool> {
        self.touch();
        self.inner.is_dir(path)
    }

    fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        self.touch();
        self.inner.read(path)
    }

    fn write(&self, path: &str, content: &[u8]) -> AppResult<()> {
        self.touch();
        self.inner.write(path, content)
    }
}
