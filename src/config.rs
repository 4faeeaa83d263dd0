//! # Configuration Module
//!
//! Process configuration read from the environment (after `.env` is loaded).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_INSTANCE_LOCK_PORT: u16 = 47365;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_NOTIFY_PACING_MS: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Customer-facing bot
    pub bot_token: String,
    /// Bot used only for admin notifications
    pub admin_bot_token: String,
    pub database_url: String,
    /// Healthcheck HTTP port
    pub port: u16,
    pub instance_lock_port: u16,
    /// Admins inserted at startup
    pub admin_ids: Vec<i64>,
    pub db_max_connections: u32,
    pub notify_pacing: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; used by `from_env` and by tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            admin_bot_token: required("ADMIN_BOT_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            instance_lock_port: parse_or(&lookup, "INSTANCE_LOCK_PORT", DEFAULT_INSTANCE_LOCK_PORT)?,
            admin_ids: parse_admin_ids(lookup("ADMIN_IDS").as_deref().unwrap_or(""))?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            notify_pacing: Duration::from_millis(parse_or(
                &lookup,
                "NOTIFY_PACING_MS",
                DEFAULT_NOTIFY_PACING_MS,
            )?),
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Text)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} '{raw}': {e}")),
        _ => Ok(default),
    }
}

/// Parse `ADMIN_IDS`: comma separated Telegram ids, blanks ignored
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id: i64 = part
            .parse()
            .with_context(|| format!("invalid admin id '{part}' in ADMIN_IDS"))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.iter().any(|id| *id <= 0) {
        bail!("admin ids must be positive user ids");
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("BOT_TOKEN", "123:abc"),
        ("ADMIN_BOT_TOKEN", "456:def"),
        ("DATABASE_URL", "postgres://localhost/farm"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.instance_lock_port, DEFAULT_INSTANCE_LOCK_PORT);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.notify_pacing, Duration::from_millis(100));
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.admin_ids.is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "10000"),
            ("ADMIN_IDS", "111, 222,,111"),
            ("NOTIFY_PACING_MS", "0"),
            ("LOG_FORMAT", "JSON"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 10000);
        assert_eq!(config.admin_ids, vec![111, 222]);
        assert!(config.notify_pacing.is_zero());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("BOT_TOKEN", "  ");
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(parse_admin_ids("12,abc").is_err());
        assert!(parse_admin_ids("-5").is_err());
    }
}
