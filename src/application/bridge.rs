use crate::augment::augment;
use crate::invoker::ToolInvoker;
use crate::model::{GenerateRequest, ModelError, ModelProvider};
use crate::types::{ToolResults, TransportHint};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info};

/// The `params` object of an `invoke` request.
#[derive(Debug, Deserialize)]
pub struct InvokeParams {
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub tool_inputs: Map<String, Value>,
    #[serde(default)]
    pub httpmethod: TransportHint,
}

#[derive(Debug)]
pub struct InvokeOutcome {
    pub tool_results: ToolResults,
    pub model_response: Value,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid params: {0}")]
    Validation(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl BridgeError {
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::Validation(message) => message.clone(),
            BridgeError::Model(err) => err.user_message(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub default_model: String,
    pub system_prompt: Option<String>,
}

impl BridgeConfig {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Drives one invocation: validate, walk the requested tools, augment the
/// prompt, call the model backend. Tool faults are contained per name; a
/// model fault is fatal for the whole request.
pub struct Bridge<P: ModelProvider> {
    provider: P,
    invoker: ToolInvoker,
    config: BridgeConfig,
}

impl<P: ModelProvider> Bridge<P> {
    pub fn new(provider: P, invoker: ToolInvoker, config: BridgeConfig) -> Self {
        Self {
            provider,
            invoker,
            config,
        }
    }

    /// Entry point for raw `params` values arriving off the wire.
    pub async fn handle(&self, params: Value) -> Result<InvokeOutcome, BridgeError> {
        let params: InvokeParams = serde_json::from_value(params)
            .map_err(|error| BridgeError::Validation(format!("invalid params: {error}")))?;
        self.run(params).await
    }

    async fn run(&self, params: InvokeParams) -> Result<InvokeOutcome, BridgeError> {
        let mut tool_results = ToolResults::new();
        for name in &params.tools {
            // Exactly one entry per distinct requested name.
            if tool_results.contains(name) {
                debug!(tool = name.as_str(), "Skipping duplicate tool name");
                continue;
            }
            let input = params
                .tool_inputs
                .get(name)
                .cloned()
                .unwrap_or_else(|| json!({}));
            let result = self.invoker.invoke(name, input, params.httpmethod).await;
            tool_results.push(name.clone(), result);
        }
        info!(
            tools = tool_results.len(),
            failed = tool_results.iter().filter(|(_, r)| r.is_err()).count(),
            "Tool phase complete"
        );

        let augmented = augment(&params.prompt, &tool_results);
        let model = params
            .model
            .unwrap_or_else(|| self.config.default_model.clone());

        let model_response = self
            .provider
            .generate(GenerateRequest {
                model,
                prompt: augmented,
                system: self.config.system_prompt.clone(),
                options: None,
            })
            .await?;

        Ok(InvokeOutcome {
            tool_results,
            model_response,
        })
    }
}
