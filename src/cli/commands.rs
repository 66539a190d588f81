use chrono::Utc;

use crate::app::{AppContext, FeedwatchError, Result};
use crate::daemon::Daemon;
use crate::orchestrator::{Delivery, RunReport};

/// Perform a single run. Refuses to overlap with a running daemon.
pub async fn run_once(ctx: &AppContext) -> Result<RunReport> {
    if Daemon::is_running() {
        return Err(FeedwatchError::Other(
            "A feedwatch daemon is running; refusing to start an overlapping run".to_string(),
        ));
    }

    let report = ctx.orchestrator.run().await?;

    match &report.delivery {
        Delivery::Skipped => println!("No new items ({} in feed)", report.fetched),
        Delivery::Sent => println!("Notified about {} new items", report.unseen),
        Delivery::Failed(e) => eprintln!(
            "Found {} new items but the notification failed: {}",
            report.unseen, e
        ),
    }

    Ok(report)
}

/// Print the stored ledger, oldest first.
pub async fn list_ledger(ctx: &AppContext) -> Result<()> {
    let mut records = ctx.store.read_all().await?;

    if records.is_empty() {
        println!("Ledger is empty ({})", ctx.ledger_path.display());
        return Ok(());
    }

    records.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.id.cmp(&b.id)));

    let now = Utc::now();
    let retention = ctx.config.ledger.retention();

    for record in &records {
        let marker = if record.is_expired(now, retention) {
            "expired"
        } else {
            ""
        };
        println!(
            "{}  {}  {}",
            record.first_seen.format("%Y-%m-%d %H:%M:%S"),
            record.id,
            marker
        );
    }
    println!("{} records ({})", records.len(), ctx.ledger_path.display());

    Ok(())
}
