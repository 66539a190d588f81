use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{FeedwatchError, Result};
use crate::config::{Config, LedgerBackend};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::notifier::{Notifier, SmtpNotifier};
use crate::orchestrator::{Orchestrator, RunSettings};
use crate::store::{JsonFileStore, RecordStore, SqliteRecordStore};

/// Adapters and the orchestrator assembled from one configuration.
pub struct AppContext {
    pub config: Config,
    pub ledger_path: PathBuf,
    pub store: Arc<dyn RecordStore + Send + Sync>,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let ledger_path = config
            .ledger
            .resolved_path()
            .map_err(|e| FeedwatchError::Config(e.to_string()))?;
        if let Some(parent) = ledger_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store: Arc<dyn RecordStore + Send + Sync> = match config.ledger.backend {
            LedgerBackend::Json => Arc::new(JsonFileStore::new(&ledger_path)),
            LedgerBackend::Sqlite => Arc::new(SqliteRecordStore::new(&ledger_path)?),
        };
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(
            config.feed.timeout(),
            config.feed.cache_bust,
        )?);
        let notifier: Arc<dyn Notifier + Send + Sync> = Arc::new(SmtpNotifier::new(&config.mail)?);

        let orchestrator = Orchestrator::new(
            fetcher,
            store.clone(),
            notifier,
            RunSettings {
                feed_url: config.feed.url.clone(),
                retention: config.ledger.retention(),
                keep_unlisted: config.ledger.keep_unlisted,
            },
        );

        tracing::debug!(
            "Using {:?} ledger at {}",
            config.ledger.backend,
            ledger_path.display()
        );

        Ok(Self {
            config,
            ledger_path,
            store,
            orchestrator,
        })
    }
}
