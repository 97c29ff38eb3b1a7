//! Configuration loading and management
//!
//! Handles parsing of `hearth.toml` configuration files.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration file name looked up in the data root's parent directory
pub const CONFIG_FILENAME: &str = "hearth.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data root directory (relative paths resolve against cwd)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Claim behaviour
    #[serde(default)]
    pub claims: ClaimsConfig,

    /// Notification synthesis
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            claims: ClaimsConfig::default(),
            notifications: NotificationsConfig::default(),
            tasks: TasksConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".hearth")
}

/// Claim-related configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimsConfig {
    /// Optional claim time-to-live (e.g. "48h"). When unset a claim is held
    /// until released; when set, an expired claim may be taken over through
    /// the same conditional-write path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl ClaimsConfig {
    /// Parsed claim TTL, if configured
    pub fn ttl_duration(&self) -> Result<Option<Duration>> {
        match self.ttl.as_deref() {
            Some(raw) => Ok(Some(parse_duration(raw)?)),
            None => Ok(None),
        }
    }
}

/// Notification-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Maximum notifications kept per recipient (oldest dropped first)
    #[serde(default = "default_notification_cap")]
    pub cap: usize,

    /// Rolling window within which the same (kind, task, recipient)
    /// triple notifies at most once
    #[serde(default = "default_dedup_window")]
    pub dedup_window: String,
}

fn default_notification_cap() -> usize {
    10
}

fn default_dedup_window() -> String {
    "24h".to_string()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            cap: default_notification_cap(),
            dedup_window: default_dedup_window(),
        }
    }
}

impl NotificationsConfig {
    /// Parsed dedup window
    pub fn dedup_window_duration(&self) -> Result<Duration> {
        parse_duration(&self.dedup_window)
    }
}

/// Task defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Currency used when a draft carries an amount but no currency
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
        }
    }
}

impl Config {
    /// Load configuration from `hearth.toml` in the given directory, falling
    /// back to defaults when the file is absent.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, swallowing errors into defaults.
    ///
    /// Used on paths where a broken config file should not make read-only
    /// commands unusable.
    pub fn load_or_default(dir: &Path) -> Self {
        Self::load_from_dir(dir).unwrap_or_default()
    }

    /// Validate parsed settings
    pub fn validate(&self) -> Result<()> {
        if self.notifications.cap == 0 {
            return Err(Error::InvalidConfig(
                "notifications.cap must be at least 1".to_string(),
            ));
        }
        self.notifications.dedup_window_duration()?;
        self.claims.ttl_duration()?;
        Ok(())
    }
}

// =============================================================================
// Duration parsing
// =============================================================================

/// Parse a duration string like "2h", "30m", "1d"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return Err(Error::InvalidArgument(
            "Duration cannot be empty".to_string(),
        ));
    }

    let (num_str, unit) = if let Some(pos) = s.find(|c: char| !c.is_ascii_digit()) {
        (&s[..pos], &s[pos..])
    } else {
        // Assume minutes if no unit
        (s, "m")
    };

    let num: i64 = num_str
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("Invalid duration number: {}", num_str)))?;

    let duration = match unit.to_lowercase().as_str() {
        "s" | "sec" | "second" | "seconds" => Duration::seconds(num),
        "m" | "min" | "minute" | "minutes" => Duration::minutes(num),
        "h" | "hr" | "hour" | "hours" => Duration::hours(num),
        "d" | "day" | "days" => Duration::days(num),
        "w" | "week" | "weeks" => Duration::weeks(num),
        _ => {
            return Err(Error::InvalidArgument(format!(
                "Invalid duration unit '{}'. Expected: s, m, h, d, w",
                unit
            )));
        }
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from(".hearth"));
        assert_eq!(config.notifications.cap, 10);
        assert!(config.claims.ttl.is_none());
        assert_eq!(
            config.notifications.dedup_window_duration().unwrap(),
            Duration::hours(24)
        );
    }

    #[test]
    fn duration_parse() {
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("1d").unwrap(), Duration::days(1));
        assert_eq!(parse_duration("60s").unwrap(), Duration::seconds(60));
        assert_eq!(parse_duration("2w").unwrap(), Duration::weeks(2));
        assert!(parse_duration("invalid").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn load_from_dir_reads_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"
data_dir = "state"

[claims]
ttl = "48h"

[notifications]
cap = 5
dedup_window = "6h"
"#,
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("state"));
        assert_eq!(config.notifications.cap, 5);
        assert_eq!(
            config.claims.ttl_duration().unwrap(),
            Some(Duration::hours(48))
        );
    }

    #[test]
    fn zero_cap_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "[notifications]\ncap = 0\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_from_dir(dir.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.notifications.cap, 10);
    }
}
