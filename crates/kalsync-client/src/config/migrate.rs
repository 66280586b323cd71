//! Settings schema migration.
//!
//! Older settings files are upgraded one version at a time by pure functions
//! over the raw TOML table. [`migrate`] runs every step between the file's
//! version and [`CURRENT_VERSION`] and stamps the result.
//!
//! | Version | Change                                                          |
//! |---------|-----------------------------------------------------------------|
//! | 1       | flat `url`, `user`, `zulu` (password), `log`                    |
//! | 2       | adds `sync_from`, `sync_interval_secs`, `sync_disabled`         |
//! | 3       | adds `set_reminder`, `set_inteligent_reminder`, `replace_existing` |
//! | 4       | nests keys into `[feed]`, `[sync]` and `[reminders]`            |

use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 4;

/// Default start of the daily sync window, in milliseconds after midnight (03:00).
pub const DEFAULT_SYNC_FROM_MILLIS: i64 = 10_800_000;

/// Default sync interval (one day).
pub const DEFAULT_SYNC_INTERVAL_SECS: i64 = 86_400;

/// Errors raised while upgrading a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// The file was written by a newer release.
    #[error("settings version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The `version` key holds something other than a positive integer.
    #[error("invalid settings version: {0}")]
    InvalidVersion(String),

    /// A key that a step needs to move has an unexpected type.
    #[error("`{key}` must be a {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

type Step = fn(Table) -> Result<Table, MigrationError>;

/// `STEPS[n]` upgrades version `n + 1` to `n + 2`.
const STEPS: [Step; (CURRENT_VERSION - 1) as usize] = [v1_to_v2, v2_to_v3, v3_to_v4];

/// Reads the schema version of a raw settings table; a missing key means 1.
pub fn detect_version(raw: &Table) -> Result<u32, MigrationError> {
    match raw.get("version") {
        None => Ok(1),
        Some(Value::Integer(v)) => u32::try_from(*v)
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| MigrationError::InvalidVersion(v.to_string())),
        Some(other) => Err(MigrationError::InvalidVersion(other.to_string())),
    }
}

/// Upgrades `raw` from `from_version` to [`CURRENT_VERSION`].
pub fn migrate(raw: Table, from_version: u32) -> Result<Table, MigrationError> {
    if from_version == 0 {
        return Err(MigrationError::InvalidVersion("0".to_string()));
    }
    if from_version > CURRENT_VERSION {
        return Err(MigrationError::UnsupportedVersion {
            found: from_version,
            supported: CURRENT_VERSION,
        });
    }

    let mut raw = raw;
    for (idx, step) in STEPS.iter().enumerate().skip(from_version as usize - 1) {
        raw = step(raw)?;
        debug!(from = idx + 1, to = idx + 2, "Migrated settings");
    }
    raw.insert("version".to_string(), Value::Integer(i64::from(CURRENT_VERSION)));
    Ok(raw)
}

fn v1_to_v2(mut raw: Table) -> Result<Table, MigrationError> {
    set_default(&mut raw, "sync_from", Value::Integer(DEFAULT_SYNC_FROM_MILLIS));
    set_default(
        &mut raw,
        "sync_interval_secs",
        Value::Integer(DEFAULT_SYNC_INTERVAL_SECS),
    );
    set_default(&mut raw, "sync_disabled", Value::Boolean(true));
    Ok(raw)
}

fn v2_to_v3(mut raw: Table) -> Result<Table, MigrationError> {
    for key in ["set_reminder", "set_inteligent_reminder", "replace_existing"] {
        set_default(&mut raw, key, Value::Boolean(true));
    }
    Ok(raw)
}

fn v3_to_v4(mut raw: Table) -> Result<Table, MigrationError> {
    let mut feed = Table::new();
    move_key(&mut raw, &mut feed, "url", "url");
    move_key(&mut raw, &mut feed, "user", "user");
    move_key(&mut raw, &mut feed, "zulu", "password");

    let mut sync = Table::new();
    for key in [
        "replace_existing",
        "sync_from",
        "sync_interval_secs",
        "sync_disabled",
    ] {
        move_key(&mut raw, &mut sync, key, key);
    }

    let mut reminders = Table::new();
    move_key(&mut raw, &mut reminders, "set_reminder", "enabled");
    move_key(&mut raw, &mut reminders, "set_inteligent_reminder", "intelligent");

    if let Some(log) = raw.remove("log") {
        match log {
            Value::Boolean(_) => {
                raw.insert("debug".to_string(), log);
            }
            _ => {
                return Err(MigrationError::InvalidValue {
                    key: "log".to_string(),
                    expected: "boolean",
                });
            }
        }
    }

    raw.insert("feed".to_string(), Value::Table(feed));
    raw.insert("sync".to_string(), Value::Table(sync));
    raw.insert("reminders".to_string(), Value::Table(reminders));
    Ok(raw)
}

fn set_default(raw: &mut Table, key: &str, value: Value) {
    raw.entry(key.to_string()).or_insert(value);
}

fn move_key(from: &mut Table, to: &mut Table, key: &str, new_key: &str) {
    if let Some(value) = from.remove(key) {
        to.insert(new_key.to_string(), value);
    }
}
