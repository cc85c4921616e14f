//! Application Configuration Module
//!
//! Loads the tutor service settings from environment variables (and a `.env`
//! file when present) into a single struct that is passed to startup code.

use secrecy::SecretString;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use tutor_core::config::{
    DEFAULT_HISTORY_TAIL, DEFAULT_NARRATION_DELAY, DEFAULT_NOTICE_TTL, SessionConfig,
};
use tutor_core::language::{FALLBACK_LOCALE, Locale};

/// Seconds to wait on the answering service before giving up on a turn.
pub const DEFAULT_ANSWERING_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnsweringProvider {
    /// POST turns to `ANSWERING_URL`.
    Http,
    /// Answer locally from the lesson text.
    Offline,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub provider: AnsweringProvider,
    pub answering_url: Option<String>,
    pub answering_api_key: Option<SecretString>,
    pub answering_timeout: Duration,
    pub language: Locale,
    pub history_tail: usize,
    pub notice_ttl: Duration,
    pub narration_delay: Duration,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Unknown answering provider: {0} (expected \"http\" or \"offline\")")]
    UnknownProvider(String),
    #[error("Unsupported language code in TUTOR_LANGUAGE: {0}")]
    UnknownLanguage(String),
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `ANSWERING_PROVIDER`: "http" (default) or "offline".
    // *   `ANSWERING_URL`: Endpoint that receives each turn. Required for "http".
    // *   `ANSWERING_API_KEY`: (Optional) Sent as a bearer token.
    // *   `ANSWERING_TIMEOUT_SECS`: (Optional) Defaults to 30.
    // *   `TUTOR_LANGUAGE`: (Optional) Starting language code. Defaults to "en".
    // *   `HISTORY_TAIL`, `NOTICE_TTL_MS`, `NARRATION_DELAY_MS`: (Optional) Session tunables.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = match lookup("ANSWERING_PROVIDER")
            .unwrap_or_else(|| "http".to_string())
            .to_lowercase()
            .as_str()
        {
            "http" => AnsweringProvider::Http,
            "offline" => AnsweringProvider::Offline,
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        let answering_url = lookup("ANSWERING_URL").filter(|url| !url.trim().is_empty());
        if provider == AnsweringProvider::Http && answering_url.is_none() {
            return Err(ConfigError::MissingVar(
                "ANSWERING_URL must be set for the http provider".to_string(),
            ));
        }
        let answering_api_key = lookup("ANSWERING_API_KEY")
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        let answering_timeout = Duration::from_secs(parse_or(
            &lookup,
            "ANSWERING_TIMEOUT_SECS",
            DEFAULT_ANSWERING_TIMEOUT_SECS,
        )?);

        let language = match lookup("TUTOR_LANGUAGE") {
            Some(code) => {
                Locale::from_code(&code).ok_or_else(|| ConfigError::UnknownLanguage(code))?
            }
            None => FALLBACK_LOCALE,
        };

        let history_tail = parse_or(&lookup, "HISTORY_TAIL", DEFAULT_HISTORY_TAIL)?;
        let notice_ttl = Duration::from_millis(parse_or(
            &lookup,
            "NOTICE_TTL_MS",
            DEFAULT_NOTICE_TTL.as_millis() as u64,
        )?);
        let narration_delay = Duration::from_millis(parse_or(
            &lookup,
            "NARRATION_DELAY_MS",
            DEFAULT_NARRATION_DELAY.as_millis() as u64,
        )?);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            provider,
            answering_url,
            answering_api_key,
            answering_timeout,
            language,
            history_tail,
            notice_ttl,
            narration_delay,
            log_level,
        })
    }

    /// Session tunables, with the command-line overrides applied.
    pub fn session_config(&self, language: Option<Locale>, start_muted: bool) -> SessionConfig {
        SessionConfig {
            history_tail: self.history_tail,
            notice_ttl: self.notice_ttl,
            narration_delay: self.narration_delay,
            language: language.unwrap_or(self.language),
            start_muted,
            ..SessionConfig::default()
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn http_provider_with_defaults() {
        let config =
            Config::from_lookup(lookup(&[("ANSWERING_URL", "http://localhost:8080/turn")]))
                .unwrap();

        assert_eq!(config.provider, AnsweringProvider::Http);
        assert_eq!(
            config.answering_url.as_deref(),
            Some("http://localhost:8080/turn")
        );
        assert!(config.answering_api_key.is_none());
        assert_eq!(config.answering_timeout, Duration::from_secs(30));
        assert_eq!(config.language, Locale::English);
        assert_eq!(config.history_tail, DEFAULT_HISTORY_TAIL);
        assert_eq!(config.notice_ttl, DEFAULT_NOTICE_TTL);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn http_provider_requires_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn offline_provider_needs_no_url() {
        let config = Config::from_lookup(lookup(&[("ANSWERING_PROVIDER", "Offline")])).unwrap();
        assert_eq!(config.provider, AnsweringProvider::Offline);
        assert!(config.answering_url.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ANSWERING_PROVIDER", "offline"),
            ("ANSWERING_API_KEY", "sk-123"),
            ("ANSWERING_TIMEOUT_SECS", "5"),
            ("TUTOR_LANGUAGE", "hi-IN"),
            ("HISTORY_TAIL", "2"),
            ("NOTICE_TTL_MS", "1500"),
            ("NARRATION_DELAY_MS", "0"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(
            config.answering_api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-123")
        );
        assert_eq!(config.answering_timeout, Duration::from_secs(5));
        assert_eq!(config.language, Locale::Hindi);
        assert_eq!(config.history_tail, 2);
        assert_eq!(config.notice_ttl, Duration::from_millis(1500));
        assert_eq!(config.narration_delay, Duration::ZERO);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn rejects_bad_values() {
        let base = [("ANSWERING_PROVIDER", "offline")];

        let err = Config::from_lookup(lookup(&[("ANSWERING_PROVIDER", "carrier-pigeon")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("carrier-pigeon".into()));

        let err = Config::from_lookup(lookup(&[base[0], ("TUTOR_LANGUAGE", "xx")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownLanguage("xx".into()));

        let err = Config::from_lookup(lookup(&[base[0], ("HISTORY_TAIL", "many")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "HISTORY_TAIL".into(),
                value: "many".into(),
            }
        );

        let err = Config::from_lookup(lookup(&[base[0], ("RUST_LOG", "loud")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidLogLevel("loud".into()));
    }

    #[test]
    fn command_line_overrides_win() {
        let config = Config::from_lookup(lookup(&[("ANSWERING_PROVIDER", "offline")])).unwrap();
        let session = config.session_config(Some(Locale::Tamil), true);
        assert_eq!(session.language, Locale::Tamil);
        assert!(session.start_muted);
        assert_eq!(session.speech_rate, 1.0);
    }
}
