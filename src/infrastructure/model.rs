use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

// Generation latency dwarfs tool-call latency, so the model call gets a much
// longer bound than the 30s tool timeout.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub options: Option<Value>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("model backend returned invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub fn user_message(&self) -> String {
        match self {
            ModelError::Network(err) => {
                if err.is_connect() {
                    "Cannot reach the model backend. Make sure the Ollama server is running and reachable.".to_string()
                } else if err.is_timeout() {
                    "The model backend took too long to respond. Try again shortly.".to_string()
                } else if let Some(status) = err.status() {
                    match status {
                        StatusCode::NOT_FOUND => {
                            "Model endpoint not found (404). Check that the backend serves /api/generate.".to_string()
                        }
                        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                            "The model backend is currently unavailable. Try again later.".to_string()
                        }
                        _ => format!(
                            "Model backend request failed with status {}.",
                            status.as_u16()
                        ),
                    }
                } else {
                    "A network error occurred while contacting the model backend.".to_string()
                }
            }
            ModelError::InvalidResponse(_) => {
                "The model backend returned a response that could not be processed.".to_string()
            }
        }
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<Value, ModelError>;
}

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            http: client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{trimmed}/{path}")
    }
}

#[async_trait]
impl ModelProvider for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> Result<Value, ModelError> {
        let url = self.endpoint("/api/generate");
        let payload = OllamaGenerateRequest::from(&request);
        info!(
            model = request.model.as_str(),
            url = %url,
            prompt_bytes = request.prompt.len(),
            "Sending generate request to model backend"
        );
        let response: Value = self
            .http
            .post(url)
            .timeout(GENERATE_TIMEOUT)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Received response from model backend");

        if !response.is_object() {
            return Err(ModelError::InvalidResponse(
                "expected a JSON object body".into(),
            ));
        }
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Value>,
}

impl From<&GenerateRequest> for OllamaGenerateRequest {
    fn from(value: &GenerateRequest) -> Self {
        Self {
            model: value.model.clone(),
            prompt: value.prompt.clone(),
            system: value.system.clone(),
            stream: false,
            options: value.options.clone(),
        }
    }
}
