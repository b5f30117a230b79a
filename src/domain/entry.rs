use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Length of the hex digests used for owner hashes and synthetic asset names.
pub const SHORT_HASH_LEN: usize = 8;

/// One item yielded by a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at: None,
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Publication date, or `now` when the feed gave none (or an unparsable one).
    ///
    /// The fallback means an undated entry always passes the start-date filter.
    pub fn effective_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.published_at.unwrap_or(now)
    }

    /// Namespace for this entry's document filename and assets.
    pub fn owner_hash(&self) -> String {
        short_hash(&self.title)
    }
}

/// First eight hex characters of the SHA-256 of `input`.
pub fn short_hash(input: &str) -> String {
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest[..SHORT_HASH_LEN].to_string()
}
