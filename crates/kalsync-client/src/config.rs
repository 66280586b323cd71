//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/kalsync/config.toml` by default. Files written by older
//! releases are upgraded in memory by [`migrate`] when loaded.
//!
//! The feed password supports secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

mod migrate;

use std::path::{Path, PathBuf};
use std::time::Duration;

use kalsync_feed::FeedConfig;
use kalsync_feed::auth::NoQopMode;
use kalsync_sync::{ReminderPolicy, SyncOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use migrate::{
    CURRENT_VERSION, DEFAULT_SYNC_FROM_MILLIS, DEFAULT_SYNC_INTERVAL_SECS, MigrationError,
    detect_version, migrate,
};

use crate::error::{ClientError, ClientResult};

const MILLIS_PER_DAY: u64 = 86_400_000;

/// Configuration for the kalsync client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Schema version of the file.
    pub version: u32,

    /// Debug mode.
    pub debug: bool,

    /// Feed location and credentials.
    pub feed: FeedSettings,

    /// Sync behaviour and schedule.
    pub sync: SyncSettings,

    /// Reminders attached to imported entries.
    pub reminders: ReminderSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            debug: false,
            feed: FeedSettings::default(),
            sync: SyncSettings::default(),
            reminders: ReminderSettings::default(),
        }
    }
}

/// The `[feed]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Feed URL; a missing scheme is filled in.
    pub url: String,

    /// User name; empty for public feeds.
    pub user: String,

    /// Password (supports `pass::` and `env::` prefixes).
    pub password: String,

    /// Try HTTPS first when the URL has no scheme.
    pub prefer_https: bool,

    /// Response formula for digest challenges without `qop`.
    pub digest_no_qop: NoQopMode,

    /// Connect and read timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            prefer_https: true,
            digest_no_qop: NoQopMode::default(),
            timeout_secs: FeedConfig::DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// The `[sync]` section.
///
/// `sync_from` and `sync_interval_secs` are read by whatever triggers
/// `kalsync sync` periodically (a systemd timer or cron entry); kalsync only
/// validates them. `sync_disabled` turns `kalsync sync --scheduled` into a
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Delete previously synced entries before every import.
    pub replace_existing: bool,

    /// Start of the daily sync window in milliseconds after midnight.
    pub sync_from: u64,

    /// Interval between scheduled runs.
    pub sync_interval_secs: u64,

    /// Whether scheduled runs are switched off.
    pub sync_disabled: bool,

    /// Calendar store file; defaults to the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            replace_existing: true,
            sync_from: DEFAULT_SYNC_FROM_MILLIS as u64,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS as u64,
            sync_disabled: true,
            store_path: None,
        }
    }
}

/// The `[reminders]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub intelligent: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intelligent: true,
        }
    }
}

impl From<ReminderSettings> for ReminderPolicy {
    fn from(settings: ReminderSettings) -> Self {
        Self {
            enabled: settings.enabled,
            intelligent: settings.intelligent,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path, migrating older schemas.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration text, migrating older schemas.
    pub fn from_toml_str(content: &str) -> ClientResult<Self> {
        let raw: toml::Table = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))?;
        let version = detect_version(&raw)?;
        let raw = migrate(raw, version)?;
        if version < CURRENT_VERSION {
            info!(from = version, to = CURRENT_VERSION, "Upgraded settings");
        }

        toml::Value::Table(raw)
            .try_into::<Self>()
            .map_err(|e| ClientError::Config(format!("invalid config: {}", e)))
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml_string(&self) -> ClientResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Rewrites the file at `path` at the current schema version.
    ///
    /// Returns the version the file had before, or `None` if it was current.
    /// The old file is kept next to it as `<name>.v<version>.bak`.
    pub fn migrate_file(path: &Path) -> ClientResult<Option<u32>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {}", e)))?;
        let raw: toml::Table = toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))?;
        let version = detect_version(&raw)?;
        if version == CURRENT_VERSION {
            return Ok(None);
        }

        let config = Self::from_toml_str(&content)?;
        let backup = path.with_extension(format!("toml.v{}.bak", version));
        std::fs::copy(path, &backup)?;
        std::fs::write(path, config.to_toml_string()?)?;
        info!(
            path = %path.display(),
            backup = %backup.display(),
            from = version,
            "Rewrote config file"
        );
        Ok(Some(version))
    }

    /// Builds the feed client configuration, resolving the password.
    pub fn feed_config(&self) -> ClientResult<FeedConfig> {
        let url = self.feed.url.trim();
        if url.is_empty() {
            return Err(ClientError::Config(format!(
                "feed url is not set. Add to {}:\n  [feed]\n  url = \"https://host/path/calendar.ics\"",
                Self::default_path().display()
            )));
        }

        let mut config = FeedConfig::new(url)?
            .with_prefer_https(self.feed.prefer_https)
            .with_no_qop_mode(self.feed.digest_no_qop)
            .with_timeout(Duration::from_secs(self.feed.timeout_secs));

        if !self.feed.user.is_empty() {
            let password = crate::secret::resolve(&self.feed.password)
                .map_err(|e| ClientError::Config(format!("failed to resolve password: {}", e)))?;
            config = config.with_credentials(self.feed.user.as_str(), password);
        }
        Ok(config)
    }

    /// Returns the reconciliation options.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions::default()
            .with_replace_existing(self.sync.replace_existing)
            .with_reminders(self.reminders.into())
    }

    /// Checks the settings without touching the network.
    pub fn validate(&self) -> ClientResult<()> {
        self.feed_config()?;
        if self.feed.timeout_secs == 0 {
            return Err(ClientError::Config(
                "feed timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sync.sync_from >= MILLIS_PER_DAY {
            return Err(ClientError::Config(format!(
                "sync_from must be below {} (milliseconds after midnight)",
                MILLIS_PER_DAY
            )));
        }
        if self.sync.sync_interval_secs == 0 {
            return Err(ClientError::Config(
                "sync_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the calendar store file.
    pub fn store_path(&self) -> PathBuf {
        self.sync
            .store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("calendar.json"))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kalsync")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kalsync")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CURRENT: &str = r#"
version = 4
debug = false

[feed]
url = "https://cal.example.com/feed.ics"
user = "alice"
password = "secret"
prefer_https = true
digest_no_qop = "rfc2617"
timeout_secs = 20

[sync]
replace_existing = false
sync_from = 3600000
sync_interval_secs = 3600
sync_disabled = false

[reminders]
enabled = true
intelligent = false
"#;

    #[test]
    fn parses_current_schema() {
        let config = ClientConfig::from_toml_str(CURRENT).unwrap();

        assert_eq!(config.feed.user, "alice");
        assert_eq!(config.feed.digest_no_qop, NoQopMode::Rfc2617);
        assert_eq!(config.sync.sync_interval_secs, 3600);
        assert!(!config.reminders.intelligent);

        let feed = config.feed_config().unwrap();
        assert_eq!(feed.credentials(), Some(("alice", "secret")));
        assert_eq!(feed.read_timeout, Duration::from_secs(20));

        let options = config.sync_options();
        assert!(!options.replace_existing);
        assert_eq!(options.reminders, ReminderPolicy::plain());
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.version, CURRENT_VERSION);
        assert!(config.sync.replace_existing);
        assert!(config.sync.sync_disabled);
        assert_eq!(config.sync.sync_from, 10_800_000);
        assert_eq!(config.feed.digest_no_qop, NoQopMode::Legacy);
    }

    #[test]
    fn legacy_flat_file_is_migrated() {
        let legacy = r#"
version = 3
url = "cal.example.com/feed.ics"
user = "bob"
zulu = "hunter2"
log = false
set_reminder = true
set_inteligent_reminder = false
replace_existing = false
sync_from = 0
sync_interval_secs = 7200
sync_disabled = true
"#;
        let config = ClientConfig::from_toml_str(legacy).unwrap();

        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(config.feed.url, "cal.example.com/feed.ics");
        assert_eq!(config.feed.password, "hunter2");
        assert!(!config.sync.replace_existing);
        assert_eq!(config.sync.sync_interval_secs, 7200);
        assert!(config.reminders.enabled);
        assert!(!config.reminders.intelligent);
    }

    #[test]
    fn newer_file_is_rejected() {
        let err = ClientConfig::from_toml_str("version = 9").unwrap_err();
        assert!(matches!(err, ClientError::Migration(_)));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = ClientConfig::from_toml_str(CURRENT).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ClientConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn migrate_file_rewrites_and_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "url = \"https://cal.example.com\"\nzulu = \"pw\"\n").unwrap();

        assert_eq!(ClientConfig::migrate_file(&path).unwrap(), Some(1));
        assert!(dir.path().join("config.toml.v1.bak").exists());

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("[feed]"));
        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.feed.password, "pw");

        assert_eq!(ClientConfig::migrate_file(&path).unwrap(), None);
    }

    #[test]
    fn validation() {
        assert!(ClientConfig::default().validate().is_err());

        let mut config = ClientConfig::from_toml_str(CURRENT).unwrap();
        assert!(config.validate().is_ok());

        config.sync.sync_from = MILLIS_PER_DAY;
        assert!(config.validate().is_err());

        config.sync.sync_from = 0;
        config.feed.url = "ftp://cal.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn public_feed_has_no_credentials() {
        let mut config = ClientConfig::default();
        config.feed.url = "https://cal.example.com/public.ics".to_string();
        assert_eq!(config.feed_config().unwrap().credentials(), None);
    }

    #[test]
    fn store_path_override() {
        let mut config = ClientConfig::default();
        assert!(config.store_path().ends_with("kalsync/calendar.json"));

        config.sync.store_path = Some(PathBuf::from("/tmp/cal.json"));
        assert_eq!(config.store_path(), PathBuf::from("/tmp/cal.json"));
    }
}
