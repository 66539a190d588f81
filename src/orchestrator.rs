//! One fetch → load → diff → notify → save pass over the watched feed.
//!
//! The orchestrator keeps no state between runs; everything that must survive
//! lives in the ledger's store. Runs against the same store must not overlap,
//! since the store write replaces the whole ledger.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::app::Result;
use crate::domain::SeenRecord;
use crate::fetcher::Fetcher;
use crate::ledger::{diff, Ledger};
use crate::normalizer::Normalizer;
use crate::notifier::{render_body, Notifier};
use crate::store::RecordStore;

/// Per-run settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub feed_url: String,
    pub retention: Duration,
    /// Retain every unexpired record, not only those still listed in the feed.
    pub keep_unlisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing new, notifier not invoked.
    Skipped,
    Sent,
    /// Delivery failed; the ledger was saved regardless.
    Failed(String),
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub unseen: usize,
    pub retained: usize,
    pub recorded: usize,
    pub delivery: Delivery,
}

pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    ledger: Ledger,
    notifier: Arc<dyn Notifier + Send + Sync>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<dyn RecordStore + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        settings: RunSettings,
    ) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
            ledger: Ledger::new(store, settings.retention),
            notifier,
            settings,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Execute one run with `now` as the reference instant for expiry and new records.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        // Fetch
        let body = self.fetcher.fetch(&self.settings.feed_url).await?;
        let items = self.normalizer.normalize(&body)?;
        tracing::info!("Fetched {} items from {}", items.len(), self.settings.feed_url);
        let fetched = items.len();

        // Load ledger
        let records = self.ledger.load(now).await?;
        tracing::info!("Ledger holds {} unexpired records", records.len());

        // Diff
        let result = diff(items, &records);
        tracing::info!(
            "{} unseen, {} previously seen",
            result.unseen.len(),
            result.seen_ids.len()
        );

        // Notify
        let delivery = if result.unseen.is_empty() {
            Delivery::Skipped
        } else {
            for item in &result.unseen {
                tracing::debug!("Unseen: {} ({})", item.display_title(), item.id);
            }
            let body = render_body(&result.unseen);
            match self.notifier.send(&body).await {
                Ok(()) => Delivery::Sent,
                Err(e) => {
                    tracing::error!("Notification failed, saving ledger anyway: {}", e);
                    Delivery::Failed(e.to_string())
                }
            }
        };

        // Save ledger
        let newly_seen = result.newly_seen_ids();
        let retained: Vec<SeenRecord> = if self.settings.keep_unlisted {
            records
        } else {
            records
                .into_iter()
                .filter(|r| result.seen_ids.contains(&r.id))
                .collect()
        };
        let retained_count = retained.len();

        let saved = self.ledger.save(retained, &newly_seen, now).await?;

        let report = RunReport {
            fetched,
            unseen: result.unseen.len(),
            retained: retained_count,
            recorded: saved.len() - retained_count,
            delivery,
        };
        tracing::info!(
            "Run complete: {} new records, {} retained, delivery {:?}",
            report.recorded,
            report.retained,
            report.delivery
        );

        Ok(report)
    }
}
