//! Environment-driven configuration
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//!
//! ## Changelog
//! - 2.0.0: Reminder zone, task file and lateness tolerance
//! - 1.0.0: Initial creation

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

/// Zone used when `REMINDER_TIMEZONE` is not set
pub const DEFAULT_TIMEZONE: &str = "Europe/Kyiv";
/// Backing file used when `TASKS_FILE` is not set
pub const DEFAULT_TASKS_FILE: &str = "tasks.json";
/// Seconds a fire may run late before it is reported as late
pub const DEFAULT_LATENESS_TOLERANCE_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Transport credential. Only the binary reads it.
    pub discord_token: String,
    /// Zone all absolute times ("о 19:30") are resolved in
    pub timezone: Tz,
    /// File exclusively owned by the task store
    pub tasks_path: PathBuf,
    pub lateness_tolerance: Duration,
    pub log_level: String,
}

impl Config {
    /// Build the configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("DISCORD_TOKEN must be set"))?;

        let timezone_name =
            lookup("REMINDER_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = parse_timezone(&timezone_name)?;

        let tasks_path = lookup("TASKS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TASKS_FILE));

        let lateness_tolerance = match lookup("LATENESS_TOLERANCE_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("LATENESS_TOLERANCE_SECS is not a number: {raw}"))?,
            ),
            None => Duration::from_secs(DEFAULT_LATENESS_TOLERANCE_SECS),
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Config {
            discord_token,
            timezone,
            tasks_path,
            lateness_tolerance,
            log_level,
        })
    }
}

/// Parse an IANA zone name such as `Europe/Kyiv`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("REMINDER_TIMEZONE is not a known IANA zone ({name}): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.timezone, chrono_tz::Europe::Kyiv);
        assert_eq!(config.tasks_path, PathBuf::from("tasks.json"));
        assert_eq!(config.lateness_tolerance, Duration::from_secs(60));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", " token "),
            ("REMINDER_TIMEZONE", "America/New_York"),
            ("TASKS_FILE", "/var/lib/bot/tasks.json"),
            ("LATENESS_TOLERANCE_SECS", "5"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.discord_token, "token");
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.tasks_path, PathBuf::from("/var/lib/bot/tasks.json"));
        assert_eq!(config.lateness_tolerance, Duration::from_secs(5));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_token_is_error() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_unknown_zone_is_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("REMINDER_TIMEZONE", "Mars/Olympus_Mons"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_tolerance_is_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("LATENESS_TOLERANCE_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }
}
