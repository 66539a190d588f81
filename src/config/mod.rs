//! Configuration management for feedwatch.
//!
//! Configuration is read from `~/.config/feedwatch/config.toml` unless a path
//! is given explicitly. If the default file doesn't exist, a commented
//! template is created and loading fails until `feed.url` is filled in.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::http_fetcher::DEFAULT_TIMEOUT_SECS;
use crate::ledger::DEFAULT_RETENTION_DAYS;

/// Environment variable overriding `mail.password`.
pub const SMTP_PASSWORD_ENV: &str = "FEEDWATCH_SMTP_PASSWORD";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub ledger: LedgerConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Append a `_t=<millis>` query parameter to defeat caching proxies.
    pub cache_bust: bool,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cache_bust: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    /// Defaults to a file in the platform data directory.
    pub path: Option<PathBuf>,
    pub retention_days: i64,
    /// Keep unexpired records even when their item has left the feed.
    pub keep_unlisted: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Json,
            path: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            keep_unlisted: false,
        }
    }
}

impl LedgerConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    fn default_file_name(&self) -> &'static str {
        match self.backend {
            LedgerBackend::Json => "seen.json",
            LedgerBackend::Sqlite => "seen.db",
        }
    }

    /// Resolve the ledger location, falling back to `<data dir>/feedwatch/`.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.path {
            Some(p) => Ok(p.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("feedwatch").join(self.default_file_name()))
            }
        }
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTls {
    /// TLS from the first byte (SMTPS, port 465).
    Wrapper,
    /// Plaintext greeting upgraded with STARTTLS (submission, port 587).
    Starttls,
    /// No encryption. Only for local relays.
    None,
}

/// Implicit TLS port.
const SMTPS_PORT: u16 = 465;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    /// Derived from the port when unset: 465 or no port means `wrapper`, anything else `starttls`.
    pub tls: Option<MailTls>,
    pub username: Option<String>,
    pub(crate) password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: None,
            tls: None,
            username: None,
            password: None,
            from: String::new(),
            to: Vec::new(),
            subject: "New feed items".to_string(),
        }
    }
}

impl MailConfig {
    pub fn tls_mode(&self) -> MailTls {
        match (self.tls, self.smtp_port) {
            (Some(tls), _) => tls,
            (None, None) => MailTls::Wrapper,
            (None, Some(SMTPS_PORT)) => MailTls::Wrapper,
            (None, Some(_)) => MailTls::Starttls,
        }
    }

    /// Password from the environment if set, otherwise from the file.
    pub fn password(&self) -> Option<String> {
        std::env::var(SMTP_PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.password.clone())
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing default file is created from the commented template.
    /// Missing fields use default values; the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                    return Err(ConfigError::Created { path: p });
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config = Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check the fields a run cannot do without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.url.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.url is not set".into()));
        }
        url::Url::parse(&self.feed.url)
            .map_err(|e| ConfigError::Invalid(format!("feed.url is not a valid URL: {}", e)))?;
        if self.ledger.retention_days <= 0 {
            return Err(ConfigError::Invalid(
                "ledger.retention_days must be positive".into(),
            ));
        }
        if self.mail.smtp_host.trim().is_empty() {
            return Err(ConfigError::Invalid("mail.smtp_host is not set".into()));
        }
        if self.mail.from.trim().is_empty() {
            return Err(ConfigError::Invalid("mail.from is not set".into()));
        }
        if self.mail.to.is_empty() {
            return Err(ConfigError::Invalid("mail.to has no recipients".into()));
        }
        Ok(())
    }

    /// Get the default config file path: `~/.config/feedwatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedwatch").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# feedwatch configuration

[feed]
# Feed to watch (RSS, Atom or JSON Feed). Required.
url = ""

# Append a "_t=<unix millis>" query parameter to every request
cache_bust = true

# HTTP request timeout in seconds
timeout_secs = 30

[ledger]
# Where seen items are remembered: "json" or "sqlite"
backend = "json"

# Ledger location (default: platform data directory)
# path = "/var/lib/feedwatch/seen.json"

# Records older than this many days are forgotten
retention_days = 7

# Keep records for items that are no longer in the feed until they expire
keep_unlisted = false

[mail]
smtp_host = ""
# smtp_port = 465
# "wrapper" (TLS from the start, port 465), "starttls" (port 587) or "none".
# Derived from smtp_port when omitted.
# tls = "wrapper"
# username = ""
# password = ""    # or set FEEDWATCH_SMTP_PASSWORD
from = ""
to = []
subject = "New feed items"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Created a default config file at {path}; fill in feed.url and [mail] and run again")]
    Created { path: PathBuf },

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r##"
[feed]
url = "https://ads.example.com/rss?q=suitcase"

[ledger]
backend = "sqlite"
path = "/tmp/feedwatch-test.db"
retention_days = 3

[mail]
smtp_host = "smtp.example.com"
smtp_port = 587
from = "feedwatch@example.com"
to = ["me@example.com"]
"##;

    #[test]
    fn test_default_config_deserializes() {
        let config = Config::from_toml(&Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert!(config.feed.cache_bust);
        assert_eq!(config.feed.timeout_secs, 30);
        assert_eq!(config.ledger.backend, LedgerBackend::Json);
        assert_eq!(config.ledger.retention_days, 7);
        assert_eq!(config.mail.subject, "New feed items");
    }

    #[test]
    fn test_default_config_does_not_validate() {
        let config = Config::from_toml(&Config::default_config_content()).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.ledger.backend, LedgerBackend::Sqlite);
        assert_eq!(config.ledger.retention(), chrono::Duration::days(3));
        assert_eq!(
            config.ledger.resolved_path().unwrap(),
            PathBuf::from("/tmp/feedwatch-test.db")
        );
        assert_eq!(config.mail.smtp_port, Some(587));
        assert_eq!(config.mail.tls_mode(), MailTls::Starttls);
        // Default value
        assert!(!config.ledger.keep_unlisted);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_toml("").expect("Empty config should work");
        assert!(config.feed.url.is_empty());
        assert_eq!(config.ledger.retention_days, DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn test_invalid_feed_url() {
        let mut config = Config::from_toml(FULL).unwrap();
        config.feed.url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, FULL).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.feed.url, "https://ads.example.com/rss?q=suitcase");
    }

    #[test]
    fn test_load_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[feed\nurl = ").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_tls_mode_follows_port() {
        let mut mail = MailConfig::default();
        assert_eq!(mail.tls_mode(), MailTls::Wrapper);

        mail.smtp_port = Some(465);
        assert_eq!(mail.tls_mode(), MailTls::Wrapper);

        mail.smtp_port = Some(587);
        assert_eq!(mail.tls_mode(), MailTls::Starttls);

        mail.smtp_port = Some(25);
        assert_eq!(mail.tls_mode(), MailTls::Starttls);
    }

    #[test]
    fn test_explicit_tls_wins() {
        let config = Config::from_toml(
            r#"
[mail]
smtp_port = 2525
tls = "none"
"#,
        )
        .unwrap();
        assert_eq!(config.mail.tls_mode(), MailTls::None);
    }
}
