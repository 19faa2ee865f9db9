//! HTTP client for OpenAI-compatible inference servers

use crate::backend::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
    ModelList,
};
use crate::backend::{BackendConfig, GenerationMode, GenerationRequest, Prompt, TextGenerator};
use crate::error::TranslatorError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Client for `/chat/completions`, `/completions` and `/models`
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    mode: GenerationMode,
}

impl OpenAiClient {
    pub fn new(config: &BackendConfig) -> Result<Self, TranslatorError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TranslatorError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            mode: config.mode,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Model ids served by the backend
    pub async fn list_models(&self) -> Result<Vec<String>, TranslatorError> {
        let url = format!("{}/models", self.endpoint);
        let mut request = self.http.get(&url);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|source| TranslatorError::Request {
            endpoint: url.clone(),
            source,
        })?;

        let list: ModelList = Self::decode(url, response).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, TranslatorError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|source| TranslatorError::Request {
            endpoint: url.clone(),
            source,
        })?;

        Self::decode(url, response).await
    }

    async fn decode<R: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<R, TranslatorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranslatorError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| TranslatorError::Request {
                endpoint: url,
                source,
            })
    }
}

impl TextGenerator for OpenAiClient {
    fn mode(&self) -> GenerationMode {
        self.mode
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, TranslatorError> {
        let sampling = &request.sampling;

        let text = match request.prompt {
            Prompt::Chat(ref messages) => {
                let body = ChatCompletionRequest {
                    model: &self.model,
                    messages,
                    temperature: sampling.temperature,
                    top_p: sampling.top_p,
                    max_tokens: sampling.max_tokens,
                    repetition_penalty: sampling.repetition_penalty,
                };
                debug!(model = %self.model, turns = messages.len(), "Sending chat completion");

                let res: ChatCompletionResponse = self.post_json("/chat/completions", &body).await?;
                res.choices.into_iter().next().map(|c| c.message.content)
            }
            Prompt::Plain(ref prompt) => {
                let body = CompletionRequest {
                    model: &self.model,
                    prompt,
                    temperature: sampling.temperature,
                    top_p: sampling.top_p,
                    max_tokens: sampling.max_tokens,
                    repetition_penalty: sampling.repetition_penalty,
                };
                debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending completion");

                let res: CompletionResponse = self.post_json("/completions", &body).await?;
                res.choices.into_iter().next().map(|c| c.text)
            }
        };

        text.ok_or_else(|| TranslatorError::EmptyCompletion {
            model: self.model.clone(),
        })
    }
}
