use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use yahoo_client::YahooConfig;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cache_duration: Duration,
    /// Exact origins; `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
    pub rate_limit_cooldown: Duration,
    pub courtesy_delay_min: Duration,
    pub courtesy_delay_max: Duration,
    pub batch_timeout: Duration,
    pub warm_cache_on_startup: bool,
    pub yahoo: YahooConfig,
}

impl ServerConfig {
    /// Load from the process environment (after `.env` has been applied).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let yahoo_defaults = YahooConfig::default();

        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 5001)?,
            cache_duration: Duration::from_secs(parse_or(&lookup, "CACHE_DURATION_SECONDS", 1800)?),
            cors_allowed_origins: parse_origins(
                &lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            rate_limit_cooldown: Duration::from_secs(parse_or(&lookup, "RATE_LIMIT_COOLDOWN_SECS", 5)?),
            courtesy_delay_min: Duration::from_millis(parse_or(&lookup, "COURTESY_DELAY_MIN_MS", 500)?),
            courtesy_delay_max: Duration::from_millis(parse_or(&lookup, "COURTESY_DELAY_MAX_MS", 1500)?),
            batch_timeout: Duration::from_secs(parse_or(&lookup, "BATCH_TIMEOUT_SECS", 300)?),
            warm_cache_on_startup: parse_or(&lookup, "WARM_CACHE_ON_STARTUP", false)?,
            yahoo: YahooConfig {
                base_url: lookup("YAHOO_BASE_URL").unwrap_or(yahoo_defaults.base_url),
                chart_url: lookup("YAHOO_CHART_URL").unwrap_or(yahoo_defaults.chart_url),
                cookie_url: yahoo_defaults.cookie_url,
                rate_limit_per_minute: parse_or(&lookup, "YAHOO_RATE_LIMIT", 60)?,
                timeout: Duration::from_secs(parse_or(&lookup, "YAHOO_TIMEOUT_SECS", 30)?),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_duration.is_zero() {
            bail!("CACHE_DURATION_SECONDS must be greater than zero");
        }
        if self.batch_timeout.is_zero() {
            bail!("BATCH_TIMEOUT_SECS must be greater than zero");
        }
        if self.yahoo.rate_limit_per_minute == 0 {
            bail!("YAHOO_RATE_LIMIT must be greater than zero");
        }
        if self.courtesy_delay_min > self.courtesy_delay_max {
            bail!(
                "COURTESY_DELAY_MIN_MS ({}) exceeds COURTESY_DELAY_MAX_MS ({})",
                self.courtesy_delay_min.as_millis(),
                self.courtesy_delay_max.as_millis()
            );
        }
        Ok(())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.cache_duration, Duration::from_secs(1800));
        assert_eq!(config.batch_timeout, Duration::from_secs(300));
        assert_eq!(config.rate_limit_cooldown, Duration::from_secs(5));
        assert_eq!(
            config.cors_allowed_origins,
            Some(vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string()
            ])
        );
        assert!(!config.warm_cache_on_startup);
        assert_eq!(config.yahoo.rate_limit_per_minute, 60);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("CACHE_DURATION_SECONDS", "60"),
            ("CORS_ALLOWED_ORIGINS", " https://a.example , https://b.example,"),
            ("WARM_CACHE_ON_STARTUP", "true"),
            ("YAHOO_BASE_URL", "http://127.0.0.1:9999"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_duration, Duration::from_secs(60));
        assert_eq!(
            config.cors_allowed_origins,
            Some(vec!["https://a.example".to_string(), "https://b.example".to_string()])
        );
        assert!(config.warm_cache_on_startup);
        assert_eq!(config.yahoo.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_wildcard_origin_allows_any() {
        let config = load(&[("CORS_ALLOWED_ORIGINS", "*")]).unwrap();
        assert!(config.cors_allowed_origins.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = load(&[("PORT", "not-a-port")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_validation_failures() {
        assert!(load(&[("CACHE_DURATION_SECONDS", "0")]).is_err());
        assert!(load(&[("BATCH_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("YAHOO_RATE_LIMIT", "0")]).is_err());
        let err = load(&[("COURTESY_DELAY_MIN_MS", "2000"), ("COURTESY_DELAY_MAX_MS", "100")])
            .unwrap_err();
        assert!(err.to_string().contains("COURTESY_DELAY_MIN_MS"));
    }
}
