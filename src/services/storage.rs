use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{AppError, AppResult};
use crate::models::is_epub_name;

/// Access to the directory of uploaded packages.
///
/// Every path handed to a store is relative to its root and uses `/` separators.
/// Implementations reject absolute paths and `..` segments with `AppError::InvalidPath`.
pub trait PackageStore: Send + Sync {
    /// Human-readable location of the root, for logs and health output.
    fn root_display(&self) -> String;

    fn is_available(&self) -> bool;

    /// Relative paths of every `.epub` file, sorted.
    fn list_packages(&self, recursive: bool) -> AppResult<Vec<String>>;

    /// Names of the directories directly under the root, sorted.
    fn list_books(&self) -> AppResult<Vec<String>>;

    fn is_file(&self, path: &str) -> AppResult<bool>;

    fn is_dir(&self, path: &str) -> AppResult<bool>;

    fn read(&self, path: &str) -> AppResult<Vec<u8>>;

    /// Writes `content` at `path`, creating parent directories and replacing any existing file.
    fn write(&self, path: &str, content: &[u8]) -> AppResult<()>;

    /// First package (in sorted order) stored below the directory `book`.
    fn first_package_in(&self, book: &str) -> AppResult<Option<String>> {
        let prefix = format!("{}/", relative_segments(book)?.join("/"));
        Ok(self
            .list_packages(true)?
            .into_iter()
            .find(|p| p.starts_with(&prefix)))
    }
}

/// Splits a client-supplied relative path into its normal segments.
pub fn relative_segments(path: &str) -> AppResult<Vec<String>> {
    let mut segments = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => segments.push(part.to_string()),
                None => return Err(AppError::invalid_path(path)),
            },
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::invalid_path(path));
            }
        }
    }
    if segments.is_empty() {
        return Err(AppError::invalid_path(path));
    }
    Ok(segments)
}

/// Package store backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if it does not exist yet.
    pub fn open(root: impl Into<PathBuf>) -> AppResult<Self> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).map_err(|e| {
            AppError::storage(format!(
                "Failed to create storage root {}: {}",
                store.root.display(),
                e
            ))
        })?;
        info!(root = %store.root.display(), "Storage root ready");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let mut full = self.root.clone();
        for segment in relative_segments(path)? {
            full.push(segment);
        }
        Ok(full)
    }

    fn relative_to_root(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        parts.map(|parts| parts.join("/"))
    }
}

impl PackageStore for DiskStore {
    fn root_display(&self) -> String {
        self.root.display().to_string()
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn list_packages(&self, recursive: bool) -> AppResult<Vec<String>> {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut packages = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(max_depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry during package listing");
                    continue;
                }
            };
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !is_epub_name(&name) {
                continue;
            }
            match self.relative_to_root(entry.path()) {
                Some(relative) => packages.push(relative),
                None => warn!(path = %entry.path().display(), "Skipping package with non UTF-8 path"),
            }
        }

        packages.sort();
        debug!(count = packages.len(), recursive = recursive, "Listed packages");
        Ok(packages)
    }

    fn list_books(&self) -> AppResult<Vec<String>> {
        let mut books = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                books.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        books.sort();
        Ok(books)
    }

    fn is_file(&self, path: &str) -> AppResult<bool> {
        Ok(self.resolve(path)?.is_file())
    }

    fn is_dir(&self, path: &str) -> AppResult<bool> {
        Ok(self.resolve(path)?.is_dir())
    }

    fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::not_found(path),
            _ => AppError::storage(format!("Failed to read {}: {}", path, e)),
        })
    }

    fn write(&self, path: &str, content: &[u8]) -> AppResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)
            .map_err(|e| AppError::storage(format!("Failed to write {}: {}", path, e)))?;
        debug!(path = path, bytes = content.len(), "Package written");
        Ok(())
    }
}

/// Package store held entirely in memory. Directories exist implicitly through file paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &str) -> AppResult<String> {
        Ok(relative_segments(path)?.join("/"))
    }

    fn poisoned() -> AppError {
        AppError::internal("Memory store lock poisoned")
    }
}

impl PackageStore for MemoryStore {
    fn root_display(&self) -> String {
        "memory".to_string()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn list_packages(&self, recursive: bool) -> AppResult<Vec<String>> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        Ok(files
            .keys()
            .filter(|k| recursive || !k.contains('/'))
            .filter(|k| is_epub_name(k))
            .cloned()
            .collect())
    }

    fn list_books(&self) -> AppResult<Vec<String>> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        let mut books: Vec<String> = files
            .keys()
            .filter_map(|k| k.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        books.sort();
        books.dedup();
        Ok(books)
    }

    fn is_file(&self, path: &str) -> AppResult<bool> {
        let key = Self::key(path)?;
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        Ok(files.contains_key(&key))
    }

    fn is_dir(&self, path: &str) -> AppResult<bool> {
        let prefix = format!("{}/", Self::key(path)?);
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        Ok(files.keys().any(|k| k.starts_with(&prefix)))
    }

    fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        let key = Self::key(path)?;
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        files
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::not_found(path))
    }

    fn write(&self, path: &str, content: &[u8]) -> AppResult<()> {
        let key = Self::key(path)?;
        let mut files = self.files.write().map_err(|_| Self::poisoned())?;
        files.insert(key, content.to_vec());
        Ok(())
    }
}
