//! Partitioning of a fetched feed against the ledger.

use std::collections::HashSet;

use crate::domain::{FeedItem, SeenRecord};

/// Outcome of comparing one fetch against the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    /// Items absent from the ledger, in fetch order.
    pub unseen: Vec<FeedItem>,
    /// Identifiers of fetched items already present in the ledger.
    pub seen_ids: HashSet<String>,
}

impl Diff {
    /// Identifiers that become new ledger records. Duplicates collapse here.
    pub fn newly_seen_ids(&self) -> HashSet<String> {
        self.unseen.iter().map(|item| item.id.clone()).collect()
    }
}

/// Split `items` into unseen items and identifiers already recorded.
///
/// Items sharing an identifier are classified independently, so a new
/// identifier appearing twice in one fetch yields two unseen items.
pub fn diff(items: Vec<FeedItem>, ledger: &[SeenRecord]) -> Diff {
    let known: HashSet<&str> = ledger.iter().map(|r| r.id.as_str()).collect();

    let mut result = Diff::default();
    for item in items {
        if known.contains(item.id.as_str()) {
            result.seen_ids.insert(item.id);
        } else {
            result.unseen.push(item);
        }
    }

    result
}
