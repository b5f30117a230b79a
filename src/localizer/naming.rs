use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use url::Url;

use crate::domain::short_hash;

/// Longest sanitized basename kept in an asset filename.
const MAX_BASENAME_LEN: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Stylesheet,
    Font,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Stylesheet => "css",
            AssetKind::Font => "font",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Replace everything but ASCII alphanumerics, `.` and `-` with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Filename for `url` without the owner prefix.
///
/// Uses the sanitized last path segment; falls back to
/// `{kind}_{hash}.{kind}` when the path has no usable basename.
pub fn base_filename(url: &Url, kind: AssetKind) -> String {
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(sanitize)
        .unwrap_or_default();

    // Names made only of dots would resolve to the directory itself.
    if basename.chars().all(|c| c == '.' || c == '_') {
        return format!("{}_{}.{}", kind.label(), short_hash(url.as_str()), kind.label());
    }

    if basename.len() > MAX_BASENAME_LEN {
        // Keep the tail so the extension survives; sanitized names are ASCII.
        return basename[basename.len() - MAX_BASENAME_LEN..].to_string();
    }
    basename
}

#[derive(Debug, Default)]
struct RecordInner {
    /// resolved URL -> filename
    names: HashMap<String, String>,
    /// filename -> resolved URL
    owners: HashMap<String, String>,
    /// resolved URL -> site path, for assets already written
    localized: HashMap<String, String>,
}

/// Asset names handed out while processing a single document.
///
/// Every name is prefixed with the document's owner hash. Two different URLs
/// that sanitize to the same basename get a URL hash inserted so neither
/// overwrites the other.
#[derive(Debug)]
pub struct AssetRecord {
    owner_hash: String,
    inner: Mutex<RecordInner>,
}

impl AssetRecord {
    pub fn new(owner_hash: impl Into<String>) -> Self {
        Self {
            owner_hash: owner_hash.into(),
            inner: Mutex::new(RecordInner::default()),
        }
    }

    pub fn owner_hash(&self) -> &str {
        &self.owner_hash
    }

    pub fn filename_for(&self, url: &Url, kind: AssetKind) -> String {
        let mut inner = self.lock();
        if let Some(name) = inner.names.get(url.as_str()) {
            return name.clone();
        }

        let base = base_filename(url, kind);
        let mut name = format!("{}_{}", self.owner_hash, base);
        if inner.owners.contains_key(&name) {
            name = format!("{}_{}_{}", self.owner_hash, short_hash(url.as_str()), base);
        }

        inner.names.insert(url.to_string(), name.clone());
        inner.owners.insert(name.clone(), url.to_string());
        name
    }

    pub fn localized(&self, url: &Url) -> Option<String> {
        self.lock().localized.get(url.as_str()).cloned()
    }

    pub fn mark_localized(&self, url: &Url, site_path: &str) {
        self.lock()
            .localized
            .insert(url.to_string(), site_path.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordInner> {
        // Never held across an await, so a poisoned lock still holds consistent maps.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
