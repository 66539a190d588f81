//! # feedwatch
//!
//! Watches a single feed and emails the entries it has not reported before.
//!
//! ## Architecture
//!
//! Every run is one sequential pass with no memory of earlier runs:
//!
//! ```text
//! Fetcher → Normalizer → Ledger::load → diff → Notifier → Ledger::save
//! ```
//!
//! All continuity lives in the ledger: a set of `(id, first_seen)` records
//! kept in a whole-value store and expired after a retention window.
//!
//! ## Quick Start
//!
//! ```bash
//! # Check the feed once (exit status reports success)
//! feedwatch run
//!
//! # Check every ten minutes
//! feedwatch daemon start --interval 10m
//!
//! # Inspect what has been recorded
//! feedwatch ledger
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) assembles the store, fetcher, notifier and
/// orchestrator from a [`Config`](config::Config).
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration, loaded from `~/.config/feedwatch/config.toml`.
pub mod config;

/// Periodic, non-overlapping execution of runs.
pub mod daemon;

/// Core domain models.
///
/// - [`FeedItem`](domain::FeedItem): an entry of the current fetch
/// - [`SeenRecord`](domain::SeenRecord): a persisted observation
pub mod domain;

/// HTTP retrieval of the feed document.
pub mod fetcher;

/// Seen-item ledger with retention-based expiry, and the diff engine.
pub mod ledger;

/// Feed parsing into [`FeedItem`](domain::FeedItem)s.
///
/// Accepts RSS 0.9x/1.0/2.0, Atom 0.3/1.0 and JSON Feed 1.0.
pub mod normalizer;

/// Message rendering and delivery.
pub mod notifier;

/// The five-stage run.
pub mod orchestrator;

/// Ledger persistence.
///
/// - [`RecordStore`](store::RecordStore): whole-value read/write trait
/// - [`JsonFileStore`](store::JsonFileStore): JSON file
/// - [`SqliteRecordStore`](store::SqliteRecordStore): SQLite database
pub mod store;
