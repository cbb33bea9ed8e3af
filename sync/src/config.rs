// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use jiff::SignedDuration;
use tandem_core::{APP_NAME, Config as CoreConfig, ConfigDuration, get_config_dir};
use tokio::fs;

const CONFIG_ENV: &str = "TANDEM_CONFIG";

/// Default period of the full sync timer.
pub const DEFAULT_FULL_INTERVAL: SignedDuration = SignedDuration::from_mins(15);

/// Default period of the real-time (incremental) sync timer.
pub const DEFAULT_REALTIME_INTERVAL: SignedDuration = SignedDuration::from_secs(30);

/// Local edits younger than this always win a conflict.
pub const DEFAULT_RECENCY_WINDOW: SignedDuration = SignedDuration::from_mins(5);

/// Start times closer than this are considered equal.
pub const DEFAULT_START_TOLERANCE: SignedDuration = SignedDuration::from_secs(60);

/// Sync metadata of events that ended longer ago than this is purged.
pub const DEFAULT_RETENTION: SignedDuration = SignedDuration::from_hours(90 * 24);

/// Configuration of the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(from = "SyncConfigRaw")]
pub struct SyncConfig {
    /// Period of the full sync timer, used while real-time mode is off.
    pub full_interval: SignedDuration,

    /// Period of the incremental sync timer, used while real-time mode is on.
    pub realtime_interval: SignedDuration,

    /// Whether real-time mode starts enabled.
    pub real_time: bool,

    /// Calendars that are always listed during pulls, in addition to the ones
    /// local events are bound to.
    pub calendars: Vec<String>,

    /// Calendar used when a local-only event is pushed explicitly.
    pub default_calendar: Option<String>,

    /// Local edits younger than this are protected from being overwritten.
    pub recency_window: SignedDuration,

    /// Start-time differences up to this are not a conflict.
    pub start_tolerance: SignedDuration,

    /// Sync metadata of events ended longer ago than this is purged.
    pub retention: SignedDuration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfigRaw::default().into()
    }
}

impl SyncConfig {
    /// Checks that every period and threshold is positive.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        let durations = [
            ("full_interval", self.full_interval),
            ("realtime_interval", self.realtime_interval),
            ("recency_window", self.recency_window),
            ("retention", self.retention),
        ];
        for (name, value) in durations {
            if !value.is_positive() {
                return Err(format!("sync.{name} must be positive, got {value:?}").into());
            }
        }

        if self.start_tolerance.is_negative() {
            return Err("sync.start_tolerance must not be negative".into());
        }

        Ok(())
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct SyncConfigRaw {
    #[serde(default)]
    full_interval: Option<ConfigDuration>,

    #[serde(default)]
    realtime_interval: Option<ConfigDuration>,

    #[serde(default)]
    real_time: bool,

    #[serde(default)]
    calendars: Vec<String>,

    #[serde(default)]
    default_calendar: Option<String>,

    #[serde(default)]
    recency_window: Option<ConfigDuration>,

    #[serde(default)]
    start_tolerance: Option<ConfigDuration>,

    #[serde(default)]
    retention: Option<ConfigDuration>,
}

impl From<SyncConfigRaw> for SyncConfig {
    fn from(raw: SyncConfigRaw) -> Self {
        let or = |value: Option<ConfigDuration>, default| value.map_or(default, Into::into);
        Self {
            full_interval: or(raw.full_interval, DEFAULT_FULL_INTERVAL),
            realtime_interval: or(raw.realtime_interval, DEFAULT_REALTIME_INTERVAL),
            real_time: raw.real_time,
            calendars: raw.calendars,
            default_calendar: raw.default_calendar,
            recency_window: or(raw.recency_window, DEFAULT_RECENCY_WINDOW),
            start_tolerance: or(raw.start_tolerance, DEFAULT_START_TOLERANCE),
            retention: or(raw.retention, DEFAULT_RETENTION),
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    #[serde(default)]
    core: CoreConfig,

    #[serde(default)]
    sync: SyncConfig,
}

impl FromStr for ConfigFile {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Loads the `[core]` and `[sync]` tables of the configuration file.
///
/// The file is taken from `path`, then the `TANDEM_CONFIG` environment
/// variable, then `$XDG_CONFIG_HOME/tandem/config.toml`.
#[tracing::instrument]
pub async fn load_config(path: Option<PathBuf>) -> Result<(CoreConfig, SyncConfig), Box<dyn Error>> {
    let path = if let Some(path) = path {
        path
    } else if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        PathBuf::from(env_path)
    } else {
        let config = get_config_dir()?.join(format!("{APP_NAME}/config.toml"));
        if !config.exists() {
            return Err(format!("No config found at: {}", config.display()).into());
        }
        config
    };

    let file = fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read config file at {}: {}", path.display(), e))?
        .parse::<ConfigFile>()?;

    file.sync.validate()?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok((file.core, file.sync))
}
