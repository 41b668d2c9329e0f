// ABOUTME: Typed configuration loaded from environment variables
// ABOUTME: Applies defaults and validates numeric limits for the agent and sandbox

use crate::constants::*;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid number for {var}: '{value}'")]
    InvalidNumber { var: String, value: String },
    #[error("{var} must be greater than zero")]
    MustBePositive { var: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub completions_url: String,
    pub max_tool_rounds: usize,
    pub sandbox_timeout: Duration,
    pub sandbox_data_dir: PathBuf,
    pub sandbox_memory_mb: u64,
    pub sandbox_cpu_quota: i64,
    pub sandbox_cpu_period: i64,
    pub github_api_url: String,
    pub github_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let max_tool_rounds = parse_or(&get, SANDCRAFT_MAX_TOOL_ROUNDS, DEFAULT_MAX_TOOL_ROUNDS)?;
        if max_tool_rounds == 0 {
            return Err(ConfigError::MustBePositive {
                var: SANDCRAFT_MAX_TOOL_ROUNDS.to_string(),
            });
        }

        let timeout_secs = parse_or(
            &get,
            SANDCRAFT_SANDBOX_TIMEOUT_SECS,
            DEFAULT_SANDBOX_TIMEOUT_SECS,
        )?;

        let config = Config {
            openai_api_key: get(OPENAI_API_KEY),
            model: get(SANDCRAFT_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            completions_url: get(SANDCRAFT_COMPLETIONS_URL)
                .unwrap_or_else(|| DEFAULT_COMPLETIONS_URL.to_string()),
            max_tool_rounds,
            sandbox_timeout: Duration::from_secs(timeout_secs),
            sandbox_data_dir: get(SANDCRAFT_SANDBOX_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SANDBOX_DATA_DIR)),
            sandbox_memory_mb: parse_or(
                &get,
                SANDCRAFT_SANDBOX_MEMORY_MB,
                DEFAULT_SANDBOX_MEMORY_MB,
            )?,
            sandbox_cpu_quota: parse_or(
                &get,
                SANDCRAFT_SANDBOX_CPU_QUOTA,
                DEFAULT_SANDBOX_CPU_QUOTA,
            )?,
            sandbox_cpu_period: parse_or(
                &get,
                SANDCRAFT_SANDBOX_CPU_PERIOD,
                DEFAULT_SANDBOX_CPU_PERIOD,
            )?,
            github_api_url: get(GITHUB_API_URL)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            github_token: get(GITHUB_TOKEN),
        };

        debug!(
            "Loaded config: model={}, max_tool_rounds={}, sandbox_timeout={}s",
            config.model, config.max_tool_rounds, timeout_secs
        );
        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: var.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.completions_url, DEFAULT_COMPLETIONS_URL);
        assert_eq!(config.max_tool_rounds, 10);
        assert_eq!(config.sandbox_timeout, Duration::from_secs(1800));
        assert_eq!(config.sandbox_data_dir, PathBuf::from("sandbox_data"));
        assert_eq!(config.sandbox_memory_mb, 512);
        assert_eq!(config.sandbox_cpu_quota, 50_000);
        assert_eq!(config.sandbox_cpu_period, 100_000);
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert_eq!(config.github_token, None);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (OPENAI_API_KEY, "sk-test"),
            (SANDCRAFT_MODEL, "gpt-4o-mini"),
            (SANDCRAFT_MAX_TOOL_ROUNDS, "3"),
            (SANDCRAFT_SANDBOX_TIMEOUT_SECS, " 60 "),
            (GITHUB_TOKEN, "ghp_x"),
        ])
        .unwrap();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tool_rounds, 3);
        assert_eq!(config.sandbox_timeout, Duration::from_secs(60));
        assert_eq!(config.github_token.as_deref(), Some("ghp_x"));
    }

    #[test]
    fn test_empty_value_is_unset() {
        let config = config_from(&[(OPENAI_API_KEY, ""), (SANDCRAFT_MODEL, "  ")]).unwrap();
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.model, "gpt-4o");
    }

    #[rstest]
    #[case(SANDCRAFT_MAX_TOOL_ROUNDS, "ten")]
    #[case(SANDCRAFT_SANDBOX_TIMEOUT_SECS, "-5")]
    #[case(SANDCRAFT_SANDBOX_MEMORY_MB, "512m")]
    #[case(SANDCRAFT_SANDBOX_CPU_QUOTA, "half")]
    fn test_invalid_numbers(#[case] var: &str, #[case] value: &str) {
        let err = config_from(&[(var, value)]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: var.to_string(),
                value: value.to_string(),
            }
        );
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let err = config_from(&[(SANDCRAFT_MAX_TOOL_ROUNDS, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::MustBePositive { .. }));
    }
}
