use crate::error::ConfigError;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};

const APP_NAME: &str = "trae";
const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_CONTEXT_WINDOW: usize = 50;
const DEFAULT_OUTPUT_LIMIT: usize = 2000;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const MIN_CONTEXT_WINDOW: usize = 1;
pub const MIN_OUTPUT_LIMIT: usize = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Base URL override; each provider has its own default.
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            endpoint: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub window: usize,
    pub history_path: Option<PathBuf>,
    pub output_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_CONTEXT_WINDOW,
            history_path: None,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }
}

impl ContextConfig {
    pub fn history_path(&self) -> PathBuf {
        self.history_path
            .clone()
            .unwrap_or_else(get_default_history_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub command_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl ExecutionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub context: ContextConfig,
    pub execution: ExecutionConfig,
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub context_window: Option<usize>,
}

impl Config {
    /// Layers environment variables over the file values.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("TRAE_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(provider) = lookup("TRAE_PROVIDER").filter(|p| !p.is_empty()) {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("TRAE_MODEL").filter(|m| !m.is_empty()) {
            self.llm.model = model;
        }
        if let Some(window) = lookup("TRAE_CONTEXT_WINDOW").and_then(|v| v.trim().parse().ok()) {
            self.context.window = window;
        }
        if let Some(limit) =
            lookup("TRAE_CONTEXT_OUTPUT_LIMIT").and_then(|v| v.trim().parse().ok())
        {
            self.context.output_limit = limit;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(key) = &overrides.api_key {
            self.llm.api_key = Some(key.clone());
        }
        if let Some(provider) = &overrides.provider {
            self.llm.provider = provider.clone();
        }
        if let Some(model) = &overrides.model {
            self.llm.model = model.clone();
        }
        if let Some(window) = overrides.context_window {
            if window < MIN_CONTEXT_WINDOW {
                return Err(ConfigError::InvalidValue {
                    key: "context-window".to_string(),
                    message: format!("must be at least {}", MIN_CONTEXT_WINDOW),
                });
            }
            self.context.window = window;
        }
        Ok(())
    }

    /// Clamps values that have a hard floor.
    pub fn normalize(&mut self) {
        self.context.window = self.context.window.max(MIN_CONTEXT_WINDOW);
        self.context.output_limit = self.context.output_limit.max(MIN_OUTPUT_LIMIT);
    }

    /// File, then environment, then command line.
    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = load_config();
        config.apply_env();
        config.apply_overrides(overrides)?;
        config.normalize();
        Ok(config)
    }
}

fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn get_default_history_path() -> PathBuf {
    get_data_dir().join("history.jsonl")
}

pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("config.toml")
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Reads the config file, falling back to defaults when it is missing or broken.
pub fn load_config() -> Config {
    let path = get_config_path();
    if !path.exists() {
        return Config::default();
    }
    match fs::read_to_string(&path)
        .map_err(ConfigError::from)
        .and_then(|content| parse_config(&content))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("ignoring config file {}: {}", path.display(), e);
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [llm]
            provider = "anthropic"

            [context]
            window = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.context.window, 5);
        assert_eq!(config.context.output_limit, DEFAULT_OUTPUT_LIMIT);
        assert_eq!(config.execution.command_timeout_secs, 30);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_config("[llm\nprovider=").is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TRAE_API_KEY", "sk-test"),
            ("TRAE_PROVIDER", "qwen"),
            ("TRAE_CONTEXT_WINDOW", "7"),
            ("TRAE_CONTEXT_OUTPUT_LIMIT", "not-a-number"),
        ]);
        let mut config = Config::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.provider, "qwen");
        assert_eq!(config.context.window, 7);
        assert_eq!(config.context.output_limit, DEFAULT_OUTPUT_LIMIT);
    }

    #[test]
    fn cli_overrides_win_and_validate_window() {
        let mut config = Config::default();
        config
            .apply_overrides(&Overrides {
                model: Some("qwen-max".into()),
                context_window: Some(3),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.llm.model, "qwen-max");
        assert_eq!(config.context.window, 3);

        let err = config
            .apply_overrides(&Overrides {
                context_window: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn normalize_clamps_floors() {
        let mut config = Config::default();
        config.context.window = 0;
        config.context.output_limit = 10;
        config.normalize();
        assert_eq!(config.context.window, MIN_CONTEXT_WINDOW);
        assert_eq!(config.context.output_limit, MIN_OUTPUT_LIMIT);
    }
}
