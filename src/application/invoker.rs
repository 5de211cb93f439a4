use crate::registry::{ToolEndpoint, ToolRegistry};
use crate::types::{ToolResult, TransportHint};
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
enum ToolInvokeError {
    #[error("tool not registered")]
    NotRegistered,
    #[error("tool endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn tool process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool process pipe error: {0}")]
    Pipe(String),
    #[error("tool process I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tool process exited without writing a response line")]
    NoResponse,
    #[error("tool returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("tool returned JSON-RPC error: {message}")]
    Rpc { message: String },
}

/// Executes one tool call. Holds no state across calls; every failure is
/// normalised into a `ToolResult::Err` so the caller's tool phase can keep
/// walking its remaining tools.
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    http: reqwest::Client,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            http: reqwest::Client::new(),
            timeout: TOOL_CALL_TIMEOUT,
        }
    }

    /// Overrides the per-call timeout (for tests).
    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn invoke(&self, name: &str, input: Value, hint: TransportHint) -> ToolResult {
        let outcome = match self.registry.resolve(name) {
            None => Err(ToolInvokeError::NotRegistered),
            Some(ToolEndpoint::Http { url }) => self.invoke_http(url, input, hint).await,
            Some(ToolEndpoint::Command { program, args }) => {
                self.invoke_command(name, program, args, input).await
            }
        };

        match outcome {
            Ok(payload) => {
                debug!(tool = name, "Tool call succeeded");
                ToolResult::Ok(payload)
            }
            Err(error) => {
                warn!(tool = name, %error, "Tool call failed");
                ToolResult::Err(error.to_string())
            }
        }
    }

    async fn invoke_http(
        &self,
        url: &str,
        input: Value,
        hint: TransportHint,
    ) -> Result<Value, ToolInvokeError> {
        debug!(url, ?hint, "Dispatching HTTP tool call");
        let request = match hint {
            // Retrieval-only hint: a parameter-less fetch.
            TransportHint::Get => self.http.get(url),
            TransportHint::Post => self.http.post(url).json(&input),
        };
        let payload = request
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(payload)
    }

    async fn invoke_command(
        &self,
        name: &str,
        program: &str,
        args: &[String],
        input: Value,
    ) -> Result<Value, ToolInvokeError> {
        debug!(tool = name, program, "Spawning single-shot tool process");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ToolInvokeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let outcome = tokio::time::timeout(self.timeout, exchange(&mut child, name, input)).await;
        match outcome {
            Ok(Ok(payload)) => {
                // Single-shot contract: the process exits after one response.
                let _ = child.wait().await;
                Ok(payload)
            }
            Ok(Err(error)) => {
                reap(&mut child).await;
                Err(error)
            }
            Err(_) => {
                reap(&mut child).await;
                Err(ToolInvokeError::Timeout(self.timeout))
            }
        }
    }
}

/// Writes one JSON-RPC request line to the child's stdin and treats the first
/// newline-terminated stdout line as the entire response.
async fn exchange(child: &mut Child, name: &str, input: Value) -> Result<Value, ToolInvokeError> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ToolInvokeError::Pipe("failed to capture tool stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ToolInvokeError::Pipe("failed to capture tool stdout".into()))?;

    let request = json!({
        "jsonrpc": "2.0",
        "id": "req-1",
        "method": name,
        "params": input,
    });
    let mut line = serde_json::to_vec(&request)?;
    line.push(b'\n');
    stdin.write_all(&line).await?;
    stdin.flush().await?;
    drop(stdin);

    let mut lines = BufReader::new(stdout).lines();
    let raw = lines.next_line().await?.ok_or(ToolInvokeError::NoResponse)?;
    let response: Value = serde_json::from_str(&raw)?;

    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ToolInvokeError::Rpc { message });
    }
    Ok(response.get("result").cloned().unwrap_or(Value::Null))
}

async fn reap(child: &mut Child) {
    if let Err(error) = child.kill().await {
        debug!(%error, "failed to kill tool process (may have already exited)");
    }
    let _ = child.wait().await;
}
