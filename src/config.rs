use crate::error::ConfigError;
use dotenv::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub timeout: Duration,
}

impl Config {
    /// Reads `TCG_API_URL` and `TCG_API_TIMEOUT_SECS`, loading `.env` first.
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenv().ok();
        Config::from_vars(
            env::var("TCG_API_URL").ok(),
            env::var("TCG_API_TIMEOUT_SECS").ok(),
        )
    }

    fn from_vars(api_url: Option<String>, timeout: Option<String>) -> Result<Config, ConfigError> {
        let mut raw_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        // Url::join drops the last path segment unless it ends with a slash.
        if !raw_url.ends_with('/') {
            raw_url.push('/');
        }
        let api_url = Url::parse(&raw_url)?;

        let timeout_secs = match timeout {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "TCG_API_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Config {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_vars(None, None).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn appends_trailing_slash() {
        let config = Config::from_vars(Some("http://cards.local/api".to_string()), None).unwrap();
        assert_eq!(
            config.api_url.join("expansions/").unwrap().as_str(),
            "http://cards.local/api/expansions/"
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Config::from_vars(None, Some("soon".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TCG_API_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn rejects_bad_url() {
        assert!(Config::from_vars(Some("not a url".to_string()), None).is_err());
    }
}
