pub mod frontmatter;
pub mod ledger;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::app::{CaptureError, Result};

pub use ledger::DedupLedger;

/// Durable storage for documents and their assets.
pub trait Store {
    /// Source URLs declared by every stored document with a readable header.
    fn source_urls(&self) -> Result<Vec<String>>;

    /// Source URL of the stored document `filename`, or `None` if there is
    /// no such document. A document without a readable `url:` reports `""`.
    fn document_source(&self, filename: &str) -> Result<Option<String>>;

    /// Write a document in full or not at all.
    fn write_document(&self, filename: &str, content: &str) -> Result<PathBuf>;

    fn write_asset(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Flat directories on the local filesystem.
pub struct FsStore {
    posts_dir: PathBuf,
    assets_dir: PathBuf,
}

impl FsStore {
    pub fn new(posts_dir: impl Into<PathBuf>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }
}

impl Store for FsStore {
    fn source_urls(&self) -> Result<Vec<String>> {
        let dir = match fs::read_dir(&self.posts_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut urls = Vec::new();
        for dirent in dir {
            let path = dirent?.path();
            if !path.is_file() || is_temp_file(&path) {
                continue;
            }

            match fs::read_to_string(&path) {
                Ok(content) => match frontmatter::source_url(&content) {
                    Some(url) => urls.push(url),
                    None => tracing::debug!(path = %path.display(), "No url in front-matter"),
                },
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Unreadable document"),
            }
        }

        Ok(urls)
    }

    fn document_source(&self, filename: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.posts_dir.join(filename)) {
            Ok(content) => Ok(Some(frontmatter::source_url(&content).unwrap_or_default())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, filename: &str, content: &str) -> Result<PathBuf> {
        write_atomic(&self.posts_dir, filename, content.as_bytes())
    }

    fn write_asset(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        write_atomic(&self.assets_dir, filename, bytes)
    }
}

const TEMP_SUFFIX: &str = ".partial";

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(TEMP_SUFFIX))
}

/// Write to a hidden sibling, then rename over the target.
fn write_atomic(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{}{}", filename, TEMP_SUFFIX));
    let write_err = |path: &Path, source| CaptureError::Write {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(|e| write_err(dir, e))?;

    if let Err(e) = fs::write(&temp, bytes) {
        let _ = fs::remove_file(&temp);
        return Err(write_err(&temp, e));
    }

    if let Err(e) = fs::rename(&temp, &target) {
        let _ = fs::remove_file(&temp);
        return Err(write_err(&target, e));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_document_creates_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("_posts"), dir.path().join("assets"));

        let path = store.write_document("2025-01-01-abcdef12.md", "---\nurl: u\n---\n").unwrap();

        assert_eq!(path, dir.path().join("_posts/2025-01-01-abcdef12.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "---\nurl: u\n---\n");
    }

    #[test]
    fn test_document_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("_posts"), dir.path().join("assets"));
        store
            .write_document("2025-01-01-abcdef12.md", "---\nurl: https://ex.com/1\n---\n")
            .unwrap();
        store.write_document("2025-01-01-00000000.md", "no header").unwrap();

        assert_eq!(
            store.document_source("2025-01-01-abcdef12.md").unwrap().as_deref(),
            Some("https://ex.com/1")
        );
        assert_eq!(store.document_source("2025-01-01-00000000.md").unwrap().as_deref(), Some(""));
        assert_eq!(store.document_source("2025-01-02-abcdef12.md").unwrap(), None);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("_posts"), dir.path().join("assets"));
        store.write_asset("abcdef12_a.png", b"png").unwrap();

        let names: Vec<_> = fs::read_dir(store.assets_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["abcdef12_a.png"]);
    }

    #[test]
    fn test_failed_write_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("_posts");
        let store = FsStore::new(&posts, dir.path().join("assets"));
        store.write_document("a.md", "old").unwrap();

        // A directory squatting on the temp name makes the write fail.
        fs::create_dir_all(posts.join(".a.md.partial")).unwrap();
        let result = store.write_document("a.md", "new");

        assert!(matches!(result, Err(CaptureError::Write { .. })));
        assert_eq!(fs::read_to_string(posts.join("a.md")).unwrap(), "old");
    }

    #[test]
    fn test_source_urls_ignores_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join(".x.md.partial"), "---\nurl: https://example.com/tmp\n---\n").unwrap();

        let store = FsStore::new(&posts, dir.path().join("assets"));
        assert!(store.source_urls().unwrap().is_empty());
    }
}
