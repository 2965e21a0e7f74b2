use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::enhance::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::export::raster::MIN_SUPERSAMPLE;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means résumés are kept in memory for the life of the process.
    pub database_url: Option<String>,
    pub openrouter_api_key: String,
    pub openrouter_api_url: String,
    pub enhance_model: String,
    pub port: u16,
    /// Quiet period before a requested save is written.
    pub save_quiet_period: Duration,
    pub export_supersample: u32,
    /// Sessions untouched for this long are dropped along with their unsaved edits.
    pub session_idle_timeout: Duration,
    /// When set, every exported PDF is also written here.
    pub export_dir: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let export_supersample = parse_or(&lookup, "EXPORT_SUPERSAMPLE", MIN_SUPERSAMPLE)?;
        if export_supersample < MIN_SUPERSAMPLE {
            bail!("EXPORT_SUPERSAMPLE must be at least {MIN_SUPERSAMPLE}");
        }

        let idle_secs: u64 = parse_or(&lookup, "SESSION_IDLE_TIMEOUT_SECS", 3600)?;
        if idle_secs == 0 {
            bail!("SESSION_IDLE_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            database_url: optional(&lookup, "DATABASE_URL"),
            openrouter_api_key: require(&lookup, "OPENROUTER_API_KEY")?,
            openrouter_api_url: optional(&lookup, "OPENROUTER_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            enhance_model: optional(&lookup, "ENHANCE_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: parse_or(&lookup, "PORT", 3001)?,
            save_quiet_period: Duration::from_millis(parse_or(
                &lookup,
                "SAVE_QUIET_PERIOD_MS",
                1000,
            )?),
            export_supersample,
            session_idle_timeout: Duration::from_secs(idle_secs),
            export_dir: optional(&lookup, "EXPORT_DIR").map(PathBuf::from),
            rust_log: optional(&lookup, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    optional(lookup, key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(lookup, key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.openrouter_api_url, DEFAULT_API_URL);
        assert_eq!(config.enhance_model, DEFAULT_MODEL);
        assert_eq!(config.port, 3001);
        assert_eq!(config.save_quiet_period, Duration::from_millis(1000));
        assert_eq!(config.export_supersample, 2);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.export_dir, None);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_api_key_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://localhost/resumes"),
            ("PORT", "8080"),
            ("SAVE_QUIET_PERIOD_MS", "250"),
            ("EXPORT_SUPERSAMPLE", "3"),
            ("EXPORT_DIR", "/tmp/exports"),
            ("SESSION_IDLE_TIMEOUT_SECS", "900"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/resumes"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.save_quiet_period, Duration::from_millis(250));
        assert_eq!(config.export_supersample, 3);
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/exports")));
        assert_eq!(config.session_idle_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let err = load(&[("OPENROUTER_API_KEY", "sk-test"), ("SESSION_IDLE_TIMEOUT_SECS", "0")])
            .unwrap_err();
        assert!(err.to_string().contains("SESSION_IDLE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_supersample_below_minimum_rejected() {
        let err = load(&[("OPENROUTER_API_KEY", "sk-test"), ("EXPORT_SUPERSAMPLE", "1")])
            .unwrap_err();
        assert!(err.to_string().contains("EXPORT_SUPERSAMPLE"));
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(load(&[("OPENROUTER_API_KEY", "sk-test"), ("PORT", "eighty")]).is_err());
    }
}
