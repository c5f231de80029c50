use crate::config::{Config, LlmVendor};

use super::AiError;
use super::anthropic::ClaudeClient;
use super::openai::OpenAiClient;

/// The configured large-language-model backend
#[derive(Clone)]
pub enum LlmProvider {
    Anthropic(ClaudeClient),
    OpenAi(OpenAiClient),
}

impl LlmProvider {
    /// Build the provider the configuration selects; `None` when AI is off
    pub fn from_config(config: &Config, http: reqwest::Client) -> Option<Self> {
        let model = config.llm_model.clone();
        let base_url = config.llm_base_url.clone();
        match config.resolved_llm_vendor()? {
            LlmVendor::Anthropic => config.anthropic_api_key.clone().map(|key| {
                LlmProvider::Anthropic(ClaudeClient::new(http, key, model, base_url))
            }),
            LlmVendor::OpenAi => config
                .openai_api_key
                .clone()
                .map(|key| LlmProvider::OpenAi(OpenAiClient::new(http, key, model, base_url))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic(_) => "anthropic",
            LlmProvider::OpenAi(_) => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmProvider::Anthropic(c) => c.model(),
            LlmProvider::OpenAi(c) => c.model(),
        }
    }

    /// One-shot completion: system prompt plus a single user message
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
        tracing::debug!(provider = self.name(), model = self.model(), "LLM completion");
        match self {
            LlmProvider::Anthropic(c) => c.message(Some(system), user).await,
            LlmProvider::OpenAi(c) => c.chat(Some(system), user).await,
        }
    }

    pub async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<String, AiError> {
        match self {
            LlmProvider::Anthropic(_) => Err(AiError::Unsupported(
                "Audio transcription is not supported by the Anthropic provider".to_string(),
            )),
            LlmProvider::OpenAi(c) => c.transcribe(audio, mime).await,
        }
    }
}
