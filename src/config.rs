use std::{str::FromStr, time::Duration};

use anyhow::Context;

/// Who may close a time record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTimerAuth {
    /// Anyone holding the record id may stop it, no credential needed.
    Open,
    /// The caller must authenticate and own the record.
    Owner,
}

impl StopTimerAuth {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::Open),
            "owner" => Ok(Self::Owner),
            other => anyhow::bail!("STOP_TIMER_AUTH must be `none` or `owner`, got `{}`", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerPolicy {
    pub stop_auth: StopTimerAuth,
    pub single_open_timer: bool,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            stop_auth: StopTimerAuth::Open,
            single_open_timer: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub store_timeout_secs: u64,
    pub timers: TimerPolicy,
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got `{}`", key, other),
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{} must be a number, got `{}`", key, raw))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys take their default;
    /// a set but unparseable value is an error.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let timers = TimerPolicy {
            stop_auth: StopTimerAuth::parse(&get("STOP_TIMER_AUTH").unwrap_or_default())?,
            single_open_timer: get("SINGLE_OPEN_TIMER")
                .map(|v| parse_flag("SINGLE_OPEN_TIMER", &v))
                .transpose()?
                .unwrap_or(false),
        };

        // APP_PORT wins; PORT is the fallback name older deployments use.
        let port = match (get("APP_PORT"), get("PORT")) {
            (Some(v), _) => parse_number("APP_PORT", &v)?,
            (None, Some(v)) => parse_number("PORT", &v)?,
            (None, None) => 8080,
        };

        Ok(Self {
            database_url,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            max_connections: get("DB_MAX_CONNECTIONS")
                .map(|v| parse_number("DB_MAX_CONNECTIONS", &v))
                .transpose()?
                .unwrap_or(10),
            store_timeout_secs: get("STORE_TIMEOUT_SECS")
                .map(|v| parse_number("STORE_TIMEOUT_SECS", &v))
                .transpose()?
                .unwrap_or(5),
            timers,
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
