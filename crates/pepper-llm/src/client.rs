use crate::prompt::build_prompt;
use pepper_types::{RelayError, Turn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Deadline for one generation call. Local models can be slow to answer.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Deadline for the model listing health check.
const LIST_MODELS_TIMEOUT: Duration = Duration::from_secs(5);

/// Default base URL of the generation endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama2";

/// Sampling options sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    /// Response length cap, kept short enough to be spoken.
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            num_predict: 500,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// A model installed on the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Blocking-style client: one request in flight per call, no retries.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    options: GenerationOptions,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
            options: GenerationOptions::default(),
            timeout: GENERATE_TIMEOUT,
        }
    }

    /// Overrides the generation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> GenerationOptions {
        self.options
    }

    /// Generates the assistant's reply to `user_message` given `history`.
    ///
    /// The reply is trimmed; an empty reply is returned as `Ok("")`.
    pub async fn generate(&self, user_message: &str, history: &[Turn]) -> Result<String, RelayError> {
        let prompt = build_prompt(user_message, history);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
            options: self.options,
        };

        tracing::debug!(
            model = %self.model,
            history_turns = history.len(),
            prompt_chars = prompt.chars().count(),
            "requesting generation"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "generation endpoint returned an error");
            return Err(RelayError::Backend {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation completed"
        );

        Ok(parsed.response.trim().to_string())
    }

    /// Lists the models installed on the endpoint.
    ///
    /// An empty list means the endpoint is up but unusable until a model is
    /// pulled; callers treat that as a warning.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, RelayError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(LIST_MODELS_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(RelayError::Backend {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let tags: TagsResponse = serde_json::from_slice(&bytes)?;
        Ok(tags.models)
    }

    fn classify(&self, e: reqwest::Error) -> RelayError {
        let err = RelayError::from(e);
        tracing::warn!(endpoint = %self.base_url, error = %err, "generation endpoint call failed");
        err
    }
}
