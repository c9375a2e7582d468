//! Language model backends.
//!
//! All providers are blocking HTTP clients that turn one prompt into one
//! completion string:
//! - **local / ollama**: Ollama `/api/generate`
//! - **openai**: chat completions
//! - **qwen / dashscope**: DashScope's OpenAI-compatible chat completions
//! - **anthropic**: messages API

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a Linux terminal assistant. Follow the output format requested in the prompt exactly.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 512;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_DASHSCOPE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anything that can complete a prompt.
pub trait LanguageModelProvider {
    fn name(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Builds the backend named by `config.provider`.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LanguageModelProvider>, ConfigError> {
    let provider = config.provider.trim().to_lowercase();
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));

    let require_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                provider: provider.clone(),
            })
    };
    let endpoint = |default: &str| {
        config
            .endpoint
            .clone()
            .unwrap_or_else(|| default.to_string())
    };

    let client: Box<dyn LanguageModelProvider> = match provider.as_str() {
        "local" | "ollama" => Box::new(OllamaClient::new(
            &endpoint(DEFAULT_OLLAMA_URL),
            &config.model,
            timeout,
        )),
        "openai" => Box::new(OpenAiClient::new(
            "openai",
            &endpoint(DEFAULT_OPENAI_URL),
            &config.model,
            require_key()?,
            timeout,
        )),
        "qwen" | "dashscope" => Box::new(OpenAiClient::new(
            "dashscope",
            &endpoint(DEFAULT_DASHSCOPE_URL),
            &config.model,
            require_key()?,
            timeout,
        )),
        "anthropic" => Box::new(AnthropicClient::new(
            &endpoint(DEFAULT_ANTHROPIC_URL),
            &config.model,
            require_key()?,
            timeout,
        )),
        other => return Err(ConfigError::UnsupportedProvider(other.to_string())),
    };
    tracing::debug!("using {} (model: {})", client.name(), config.model);
    Ok(client)
}

fn http_client(timeout: Duration) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

fn check_status(
    provider: &str,
    resp: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(LlmError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: body.chars().take(300).collect(),
    })
}

fn non_empty(provider: &str, text: Option<String>) -> Result<String, LlmError> {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: "response contained no text".to_string(),
        })
}

// Ollama

#[derive(Serialize)]
struct OllamaGenerate<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: Option<String>,
}

pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: http_client(timeout),
        }
    }
}

impl LanguageModelProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerate {
            model: &self.model,
            prompt,
            stream: false,
        };
        let resp = check_status(self.name(), self.client.post(&url).json(&body).send()?)?;
        let resp: OllamaGenerateResponse = resp.json()?;
        non_empty(self.name(), resp.response)
    }
}

// OpenAI-compatible chat completions

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    provider: &'static str,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    pub fn new(
        provider: &'static str,
        base_url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client: http_client(timeout),
        }
    }
}

impl LanguageModelProvider for OpenAiClient {
    fn name(&self) -> &str {
        self.provider
    }

    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;
        let resp: ChatResponse = check_status(self.name(), resp)?.json()?;
        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        non_empty(self.name(), text)
    }
}

// Anthropic messages

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

pub struct AnthropicClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    pub fn new(base_url: &str, model: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client: http_client(timeout),
        }
    }
}

impl LanguageModelProvider for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()?;
        let resp: MessagesResponse = check_status(self.name(), resp)?.json()?;
        let text = resp
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        non_empty(self.name(), Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key: api_key.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn creates_each_backend() {
        assert_eq!(create_provider(&config("local", None)).unwrap().name(), "ollama");
        assert_eq!(create_provider(&config("Ollama", None)).unwrap().name(), "ollama");
        assert_eq!(
            create_provider(&config("openai", Some("k"))).unwrap().name(),
            "openai"
        );
        assert_eq!(
            create_provider(&config("qwen", Some("k"))).unwrap().name(),
            "dashscope"
        );
        assert_eq!(
            create_provider(&config("anthropic", Some("k"))).unwrap().name(),
            "anthropic"
        );
    }

    #[test]
    fn hosted_backends_need_a_key() {
        for provider in ["openai", "dashscope", "anthropic"] {
            let err = create_provider(&config(provider, Some("  "))).err().unwrap();
            assert!(matches!(err, ConfigError::MissingApiKey { .. }));
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider(&config("gemini", Some("k"))).err().unwrap();
        assert!(matches!(err, ConfigError::UnsupportedProvider(p) if p == "gemini"));
    }

    #[test]
    fn chat_response_parses_first_choice() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":" ls -la "}}]}"#,
        )
        .unwrap();
        let text = resp.choices.into_iter().next().and_then(|c| c.message).and_then(|m| m.content);
        assert_eq!(non_empty("openai", text).unwrap(), "ls -la");
    }

    #[test]
    fn empty_text_is_invalid() {
        assert!(matches!(
            non_empty("ollama", Some("  ".into())),
            Err(LlmError::InvalidResponse { .. })
        ));
    }
}
