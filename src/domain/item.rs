use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A single entry of the watched feed, as fetched during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub title: Option<String>,
    pub link: String,
    pub description: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl FeedItem {
    pub fn new(link: &str) -> Self {
        Self {
            id: Self::derive_id(link),
            title: None,
            link: link.to_string(),
            description: None,
            published: None,
        }
    }

    /// Derive the ledger identifier from the final segment of the link path.
    ///
    /// Query string and fragment are not part of the path and never leak into
    /// the identifier. A path ending in `/` yields an empty identifier.
    /// Strings that do not parse as absolute URLs fall back to the text after
    /// the last `/`.
    pub fn derive_id(link: &str) -> String {
        let link = link.trim();
        match Url::parse(link) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(String::from)
                .unwrap_or_default(),
            Err(_) => link.rsplit('/').next().unwrap_or_default().to_string(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}
