//! Periodic runner.
//!
//! Runs are executed one after another in a single loop, so they never
//! overlap. A PID file keeps a second daemon, or a manual `feedwatch run`,
//! from racing the first one on the same ledger.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::app::{AppContext, FeedwatchError, Result};
use crate::orchestrator::Delivery;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Run interval in seconds (default: 600 = 10 minutes)
    pub interval_secs: u64,
    /// Whether to run immediately on start
    pub run_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            run_on_start: true,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let parsed = if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 3600)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 86400)
                .map_err(|_| format!("Invalid days: {}", days))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '10m', '1h', '1d'", s))
        };

        let secs = parsed?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        Self {
            ctx,
            config,
            running: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get the PID file path
    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("feedwatch").join("daemon.pid"))
    }

    fn read_pid() -> Option<u32> {
        let pid_path = Self::pid_file_path()?;
        fs::read_to_string(pid_path).ok()?.trim().parse::<u32>().ok()
    }

    /// Check if a daemon other than this process is running
    pub fn is_running() -> bool {
        match Self::read_pid() {
            Some(pid) if pid != std::process::id() => Self::process_exists(pid),
            _ => false,
        }
    }

    #[cfg(unix)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid)])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    fn spawn_signal_handler(&self) -> Result<()> {
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
                running.store(false, Ordering::SeqCst);
                shutdown.notify_one();
            });
        }

        #[cfg(windows)]
        {
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                running.store(false, Ordering::SeqCst);
                shutdown.notify_one();
            });
        }

        Ok(())
    }

    /// Run until SIGTERM/SIGINT. A failed run is logged and the loop continues.
    pub async fn run(&self) -> Result<()> {
        if Self::is_running() {
            return Err(FeedwatchError::Other(
                "Another daemon instance is already running".to_string(),
            ));
        }

        self.write_pid_file()
            .map_err(|e| FeedwatchError::Other(format!("Failed to write PID file: {}", e)))?;

        self.spawn_signal_handler()?;

        tracing::info!(
            "feedwatch daemon started (interval: {}, PID: {})",
            DaemonConfig::format_interval(self.config.interval_secs),
            std::process::id()
        );

        if self.config.run_on_start {
            self.run_cycle().await;
        }

        let mut timer = interval(Duration::from_secs(self.config.interval_secs));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // Skip the first immediate tick

        while self.running.load(Ordering::SeqCst) {
            if !wait_for_tick(&mut timer, &self.shutdown).await {
                break;
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.run_cycle().await;
        }

        tracing::info!("Daemon shutting down");
        self.remove_pid_file();

        Ok(())
    }

    async fn run_cycle(&self) {
        let start = Utc::now();

        match self.ctx.orchestrator.run().await {
            Ok(report) => {
                let elapsed = Utc::now().signed_duration_since(start);
                tracing::info!(
                    "Cycle complete: {} fetched, {} new ({:.1}s)",
                    report.fetched,
                    report.unseen,
                    elapsed.num_milliseconds() as f64 / 1000.0
                );
                if let Delivery::Failed(e) = report.delivery {
                    tracing::warn!("Cycle saved the ledger but notification failed: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Cycle failed: {}", e);
            }
        }
    }
}

/// Wait for the next tick. Returns `false` if shutdown was requested first.
async fn wait_for_tick(timer: &mut Interval, shutdown: &Notify) -> bool {
    tokio::select! {
        _ = timer.tick() => true,
        _ = shutdown.notified() => false,
    }
}

/// Stop a running daemon by reading PID file and sending signal
pub fn stop_daemon() -> std::result::Result<(), String> {
    let pid_path =
        Daemon::pid_file_path().ok_or_else(|| "Could not determine PID file path".to_string())?;

    if !pid_path.exists() {
        return Err("No daemon is running (PID file not found)".to_string());
    }

    let pid = Daemon::read_pid().ok_or_else(|| "Invalid PID in PID file".to_string())?;

    #[cfg(unix)]
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .map_err(|e| format!("Failed to send signal: {}", e))?;

    #[cfg(windows)]
    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status()
        .map_err(|e| format!("Failed to stop process: {}", e))?;

    if status.success() {
        let _ = fs::remove_file(&pid_path);
        Ok(())
    } else {
        Err(format!("Failed to stop daemon (PID {})", pid))
    }
}

/// Check daemon status
pub fn daemon_status() -> String {
    match Daemon::read_pid() {
        Some(pid) if Daemon::process_exists(pid) => format!("Daemon is running (PID: {})", pid),
        Some(_) => "Daemon is not running (stale PID file)".to_string(),
        None => "Daemon is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(DaemonConfig::parse_interval("1h").unwrap(), 3600);
        assert_eq!(DaemonConfig::parse_interval("10m").unwrap(), 600);
        assert_eq!(DaemonConfig::parse_interval("1d").unwrap(), 86400);
        assert_eq!(DaemonConfig::parse_interval("90s").unwrap(), 90);
        assert_eq!(DaemonConfig::parse_interval(" 300 ").unwrap(), 300);
        assert!(DaemonConfig::parse_interval("invalid").is_err());
        assert!(DaemonConfig::parse_interval("0m").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(DaemonConfig::format_interval(3600), "1h");
        assert_eq!(DaemonConfig::format_interval(600), "10m");
        assert_eq!(DaemonConfig::format_interval(86400), "1d");
        assert_eq!(DaemonConfig::format_interval(90), "90s");
    }

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.interval_secs, 600);
        assert!(config.run_on_start);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_interval_wait() {
        let mut timer = interval(Duration::from_secs(3600));
        timer.tick().await;
        let shutdown = Notify::new();
        shutdown.notify_one();

        let ticked = tokio::time::timeout(Duration::from_secs(1), wait_for_tick(&mut timer, &shutdown))
            .await
            .expect("shutdown should not wait for the interval");
        assert!(!ticked);
    }

    #[tokio::test]
    async fn test_tick_without_shutdown() {
        let mut timer = interval(Duration::from_millis(10));
        timer.tick().await;
        let shutdown = Notify::new();

        assert!(wait_for_tick(&mut timer, &shutdown).await);
    }
}
