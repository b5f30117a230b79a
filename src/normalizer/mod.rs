use chrono::Utc;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{CaptureError, Result};
use crate::domain::FeedEntry;

/// Turns raw RSS/Atom/JSON Feed bytes into [`FeedEntry`] values.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Entries come back in feed order. Entries without a link are dropped.
    pub fn normalize(&self, feed_url: &str, body: &[u8]) -> Result<Vec<FeedEntry>> {
        let feed = parser::parse(body).map_err(|e| CaptureError::FeedUnavailable {
            url: feed_url.to_string(),
            reason: e.to_string(),
        })?;

        let entries = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let Some(link) = entry.links.first().map(|l| l.href.trim().to_string()) else {
                    tracing::warn!(feed = %feed_url, id = %entry.id, "Entry has no link, skipping");
                    return None;
                };

                Some(FeedEntry {
                    title: entry
                        .title
                        .map(|t| decode_html_entities(t.content.trim()).to_string())
                        .unwrap_or_default(),
                    link,
                    // Left empty when the feed has no parsable date
                    published_at: entry
                        .published
                        .or(entry.updated)
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <description>A test feed</description>
    <item>
      <title>Test &amp; Item 1</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>https://example.com/item2</link>
      <guid>item-2</guid>
      <pubDate>not a date</pubDate>
    </item>
    <item>
      <title>No link</title>
      <guid isPermaLink="false">item-3</guid>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let entries = Normalizer::new()
            .normalize("https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Test & Item 1");
        assert_eq!(entries[0].link, "https://example.com/item1");
        assert_eq!(
            entries[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparsable_date_is_absent() {
        let entries = Normalizer::new()
            .normalize("https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(entries[1].link, "https://example.com/item2");
        assert_eq!(entries[1].published_at, None);
    }

    #[test]
    fn test_parse_atom_uses_updated() {
        let entries = Normalizer::new()
            .normalize("https://example.com/feed.atom", ATOM_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Atom Entry 1");
        assert_eq!(entries[0].link, "https://example.com/atom1");
        assert!(entries[0].published_at.is_some());
    }

    #[test]
    fn test_malformed_feed_is_feed_unavailable() {
        let result = Normalizer::new().normalize("https://example.com/bad", b"<html>nope</html>");
        assert!(matches!(result, Err(CaptureError::FeedUnavailable { .. })));
    }
}
