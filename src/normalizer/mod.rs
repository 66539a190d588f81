use chrono::Utc;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{FeedwatchError, Result};
use crate::domain::FeedItem;

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

    /// Parse a feed document into items, preserving document order.
    ///
    /// Entries without a link carry no identifier and are skipped.
    pub fn normalize(&self, body: &[u8]) -> Result<Vec<FeedItem>> {
        let feed = parser::parse(body).map_err(|e| FeedwatchError::ParseFailed(e.to_string()))?;

        let mut items = Vec::with_capacity(feed.entries.len());

        for entry in feed.entries {
            let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
                tracing::warn!("Skipping entry {:?} without a link", entry.id);
                continue;
            };

            let mut item = FeedItem::new(&link);

            item.title = entry
                .title
                .map(|t| decode_html_entities(&t.content).to_string());
            item.description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body));
            item.published = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));

            items.push(item);
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Marketplace: suitcases</title>
    <link>https://ads.example.com/</link>
    <description>Latest listings</description>
    <item>
      <title>Hard shell suitcase &amp; strap</title>
      <link>https://ads.example.com/listing/1001</link>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
      <description>&lt;p&gt;Barely used&lt;/p&gt;</description>
    </item>
    <item>
      <title>Cabin trolley</title>
      <link>https://ads.example.com/listing/1002?src=rss</link>
      <description>Blue, 55cm</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <id>urn:feed</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/entries/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    const RSS_MISSING_LINK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>No link here</title>
      <guid isPermaLink="false">x-1</guid>
    </item>
    <item>
      <title>Linked</title>
      <link>https://example.com/p/2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss() {
        let items = Normalizer::new().normalize(RSS_SAMPLE.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "1001");
        assert_eq!(items[0].title, Some("Hard shell suitcase & strap".into()));
        assert_eq!(items[0].link, "https://ads.example.com/listing/1001");
        assert_eq!(items[0].description, Some("<p>Barely used</p>".into()));
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(items[1].id, "1002");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn test_parse_atom() {
        let items = Normalizer::new().normalize(ATOM_SAMPLE.as_bytes()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "atom1");
        assert_eq!(items[0].title, Some("Atom Entry 1".into()));
        assert_eq!(items[0].description, Some("This is Atom entry 1".into()));
    }

    #[test]
    fn test_entries_without_link_skipped() {
        let items = Normalizer::new()
            .normalize(RSS_MISSING_LINK.as_bytes())
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "2");
    }

    #[test]
    fn test_malformed_payload_is_parse_failure() {
        let err = Normalizer::new()
            .normalize(b"<html><body>502 Bad Gateway</body></html>")
            .unwrap_err();
        assert!(matches!(err, FeedwatchError::ParseFailed(_)));
    }

    #[test]
    fn test_item_order_matches_document() {
        let items = Normalizer::new().normalize(RSS_SAMPLE.as_bytes()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1001", "1002"]);
    }
}
