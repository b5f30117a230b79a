use chrono::{DateTime, Utc};

use crate::domain::short_hash;

/// Timestamp layout written to the `date:` front-matter field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// A captured article, ready to be written to the document store.
#[derive(Debug, Clone)]
pub struct CapturedDocument {
    pub title: String,
    pub source_url: String,
    pub published_at: DateTime<Utc>,
    pub body_html: String,
}

/// `{date}-{titleHash}.md`, with the date taken as a UTC calendar day.
pub fn document_filename(title: &str, published_at: DateTime<Utc>) -> String {
    format!("{}-{}.md", published_at.format("%Y-%m-%d"), short_hash(title))
}

impl CapturedDocument {
    pub fn filename(&self) -> String {
        document_filename(&self.title, self.published_at)
    }

    /// Front-matter block followed by the body markup.
    ///
    /// Every header field stays on a single line so the ledger can re-read
    /// `url:` on later runs.
    pub fn render(&self, layout: &str) -> String {
        format!(
            "---\nlayout: {}\ntitle: {}\nurl: {}\ndate: {}\n---\n{}\n",
            single_line(layout),
            single_line(&self.title),
            single_line(&self.source_url),
            self.published_at.format(DATE_FORMAT),
            self.body_html
        )
    }
}

fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
