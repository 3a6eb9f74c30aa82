//! Shared LLM client and text-generation seam
//!
//! Provides a common interface for OpenAI API interactions so the
//! recommendation service can be exercised with a fake generator.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;

/// A single text-generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// System preamble
    pub preamble: String,
    /// User prompt
    pub prompt: String,
    /// Ask the provider to constrain output to a valid JSON object
    pub json_output: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion returned no content")]
    Empty,
}

/// Backend able to turn a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

/// Shared LLM client wrapper
#[derive(Clone)]
pub struct LlmClient {
    client: openai::Client,
    model: String,
}

impl LlmClient {
    /// Create a new LLM client with the provided API key
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: openai::Client::new(api_key),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let mut builder = self
            .client
            .agent(&self.model)
            .preamble(&request.preamble)
            .temperature(0.4);

        if request.json_output {
            builder = builder.additional_params(serde_json::json!({
                "response_format": { "type": "json_object" }
            }));
        }

        let agent = builder.build();

        let text = agent
            .prompt(request.prompt.as_str())
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(LlmError::Empty);
        }

        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
