use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use crate::config::GenerativeConfig;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("generative backend request failed: {0}")]
    Transport(String),
    #[error("generative backend returned a malformed payload: {0}")]
    MalformedPayload(String),
    #[error("generative runtime unavailable: {0}")]
    Runtime(String),
}

impl GatewayError {
    /// Malformed content counts as a validation failure (retried once by the
    /// requesters); transport and runtime problems do not.
    pub fn is_malformed(&self) -> bool {
        matches!(self, GatewayError::MalformedPayload(_))
    }
}

/// Seam for the external generative backend. Implementations submit a system
/// instruction plus a JSON prompt object and must hand back parsed JSON.
pub trait GenerativeGateway: fmt::Debug + Send + Sync {
    fn complete_json(
        &self,
        system_instruction: &str,
        payload: &Value,
    ) -> Result<Value, GatewayError>;
}

/// Client for OpenAI-style `/chat/completions` endpoints requesting strict
/// JSON output. Wraps the async HTTP client behind a private runtime so the
/// synchronous workflow code never sees async details.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    runtime: Runtime,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    /// Build a client when credentials are configured. `Ok(None)` is the
    /// recognized offline state, not an error.
    pub fn from_config(config: &GenerativeConfig) -> Result<Option<Self>, GatewayError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let runtime = Runtime::new().map_err(|err| GatewayError::Runtime(err.to_string()))?;
        Ok(Some(Self {
            http: reqwest::Client::new(),
            runtime,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        }))
    }
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GenerativeGateway for ChatCompletionsClient {
    fn complete_json(
        &self,
        system_instruction: &str,
        payload: &Value,
    ) -> Result<Value, GatewayError> {
        let body = json!({
            "model": self.model,
            "temperature": 0.3,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system_instruction},
                {"role": "user", "content": payload.to_string()},
            ],
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .runtime
            .block_on(async {
                self.http
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<ChatCompletionsResponse>()
                    .await
            })
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                GatewayError::MalformedPayload("response contained no choices".to_string())
            })?;

        serde_json::from_str(&content).map_err(|err| GatewayError::MalformedPayload(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
