//! Error types for trae.

/// Top-level error type for a single invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("could not produce a plan for this request")]
    NoPlan,

    #[error("unsupported intent: {0}")]
    UnsupportedIntent(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing API key for provider {provider}. Pass --api-key or set TRAE_API_KEY")]
    MissingApiKey { provider: String },

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures turning model output into an action plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Model response is not valid JSON and has no usable command line: {0}")]
    Unparseable(String),

    #[error("Model response JSON is not an object")]
    NotAnObject,

    #[error("Plan intent is run_command but no command was given")]
    MissingCommand,
}

/// Raised by a skill while matching or building; the skill is skipped.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("Skill {skill} failed: {reason}")]
    Failed { skill: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
