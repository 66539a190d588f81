pub mod smtp;

use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::app::Result;
use crate::domain::FeedItem;

pub use smtp::SmtpNotifier;

/// Delivers a rendered notification body.
#[async_trait]
pub trait Notifier {
    async fn send(&self, body: &str) -> Result<()>;
}

/// Render unseen items as an HTML message body, in the order given.
///
/// Titles and links are escaped. Descriptions are already HTML and are
/// embedded as they came from the feed.
pub fn render_body(items: &[FeedItem]) -> String {
    items
        .iter()
        .map(render_item)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn render_item(item: &FeedItem) -> String {
    let published = item
        .published
        .map(|dt| dt.to_rfc2822())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "<h1><a href=\"{}\">{}</a></h1><i>published: {}</i><br>{}",
        encode_double_quoted_attribute(&item.link),
        encode_text(item.display_title()),
        published,
        item.description.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn listing(id: &str, title: &str) -> FeedItem {
        let mut item = FeedItem::new(&format!("https://ads.example.com/listing/{}", id));
        item.title = Some(title.into());
        item.description = Some(format!("<p>{} details</p>", title));
        item.published = Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        item
    }

    #[test]
    fn test_render_single_item() {
        let body = render_body(&[listing("1", "Suitcase")]);
        assert_eq!(
            body,
            "<h1><a href=\"https://ads.example.com/listing/1\">Suitcase</a></h1>\
             <i>published: Mon, 15 Jan 2024 10:00:00 +0000</i><br>\
             <p>Suitcase details</p>"
        );
    }

    #[test]
    fn test_render_joins_in_order() {
        let body = render_body(&[listing("1", "First"), listing("2", "Second")]);

        let first = body.find("First").unwrap();
        let second = body.find("Second").unwrap();
        assert!(first < second);
        assert!(body.contains("</p><br><h1>"));
    }

    #[test]
    fn test_render_escapes_title() {
        let body = render_body(&[listing("1", "Bags <50% off> & more")]);
        assert!(body.contains(">Bags &lt;50% off&gt; &amp; more</a>"));
    }

    #[test]
    fn test_render_missing_fields() {
        let item = FeedItem::new("https://example.com/p/9");
        let body = render_body(&[item]);
        assert!(body.contains("(Untitled)"));
        assert!(body.contains("published: unknown"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_body(&[]), "");
    }
}
