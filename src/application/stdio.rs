use crate::invoker::ToolInvoker;
use crate::rpc::types::{RpcRequest, RpcResponse};
use crate::types::{ToolResult, TransportHint};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize stdio response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Single-shot stdio transport: reads exactly one JSON-RPC line from stdin,
/// writes at most one response line to stdout, then returns so the process
/// can exit. A caller wanting N calls spawns N processes.
pub async fn run(invoker: ToolInvoker) -> Result<(), StdioError> {
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();

    let Some(line) = lines.next_line().await? else {
        debug!("No stdio input; exiting cleanly");
        return Ok(());
    };
    if line.trim().is_empty() {
        debug!("Empty stdio input line; exiting cleanly");
        return Ok(());
    }

    // Unsupported methods produce no stdout line at all; the caller treats
    // "no line" as failure.
    let Some(response) = dispatch(&invoker, &line).await else {
        return Ok(());
    };

    let mut stdout = io::stdout();
    let mut payload = serde_json::to_vec(&response)?;
    payload.push(b'\n');
    stdout.write_all(&payload).await?;
    stdout.flush().await?;
    Ok(())
}

/// Resolves one request line against the statically declared method set: the
/// registry's tool names plus `tools/list`. Returns `None` when no response
/// line may be written.
pub(crate) async fn dispatch(invoker: &ToolInvoker, line: &str) -> Option<RpcResponse> {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(source) => {
            error!(%source, "SERVER CRASH: failed to parse stdio request line");
            return None;
        }
    };

    match request.method.as_str() {
        "tools/list" => {
            debug!("Serving stdio tool discovery request");
            let mut tools: Vec<Value> = invoker
                .registry()
                .iter()
                .map(|(name, endpoint)| json!({"name": name, "kind": endpoint.kind()}))
                .collect();
            tools.sort_by_key(|tool| tool["name"].as_str().map(str::to_owned));
            Some(RpcResponse::success(request.id, json!({"tools": tools})))
        }
        method if invoker.registry().resolve(method).is_some() => {
            info!(tool = method, "Invoking tool via stdio");
            // No tools/tool_inputs wrapper here: params are the tool's own
            // argument object.
            let input = request.params.unwrap_or_else(|| json!({}));
            match invoker.invoke(method, input, TransportHint::Post).await {
                ToolResult::Ok(payload) => Some(RpcResponse::success(request.id, payload)),
                ToolResult::Err(message) => Some(RpcResponse::error(request.id, message)),
            }
        }
        other => {
            error!(
                method = other,
                "SERVER CRASH: method not supported by this single-shot server"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, ToolDefinition};
    use crate::registry::ToolRegistry;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn invoker_with(definitions: Vec<ToolDefinition>) -> ToolInvoker {
        ToolInvoker::new(Arc::new(ToolRegistry::new(definitions)))
    }

    #[tokio::test]
    async fn unsupported_method_writes_no_response() {
        let invoker = invoker_with(Vec::new());
        let line = r#"{"jsonrpc":"2.0","id":"x","method":"unsupported_method","params":{}}"#;
        assert!(dispatch(&invoker, line).await.is_none());
    }

    #[tokio::test]
    async fn unparseable_line_writes_no_response() {
        let invoker = invoker_with(Vec::new());
        assert!(dispatch(&invoker, "not json at all").await.is_none());
    }

    #[tokio::test]
    async fn discovery_lists_registered_tools() {
        let invoker = invoker_with(vec![ToolDefinition {
            name: "echo".into(),
            endpoint: EndpointConfig::Http {
                url: "http://localhost:9001/echo".into(),
            },
        }]);
        let line = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#;
        let response = dispatch(&invoker, line).await.expect("response present");
        let rendered = serde_json::to_value(&response).expect("serialize");
        assert_eq!(rendered["id"], json!(1));
        assert_eq!(
            rendered["result"]["tools"],
            json!([{"name": "echo", "kind": "http"}])
        );
    }

    #[tokio::test]
    async fn registered_tool_gets_params_as_argument_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(body_json(json!({"message": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("HELLO")))
            .mount(&server)
            .await;

        let invoker = invoker_with(vec![ToolDefinition {
            name: "echo".into(),
            endpoint: EndpointConfig::Http {
                url: format!("{}/echo", server.uri()),
            },
        }]);
        let line = r#"{"jsonrpc":"2.0","id":"x","method":"echo","params":{"message":"hello"}}"#;
        let response = dispatch(&invoker, line).await.expect("response present");
        let rendered = serde_json::to_value(&response).expect("serialize");
        assert_eq!(rendered["id"], json!("x"));
        assert_eq!(rendered["result"], json!("HELLO"));
    }

    #[tokio::test]
    async fn failing_registered_tool_still_answers_with_error_envelope() {
        let invoker = invoker_with(vec![ToolDefinition {
            name: "echo".into(),
            endpoint: EndpointConfig::Http {
                url: "http://127.0.0.1:1/echo".into(),
            },
        }]);
        let line = r#"{"jsonrpc":"2.0","id":2,"method":"echo","params":{}}"#;
        let response = dispatch(&invoker, line).await.expect("response present");
        let rendered = serde_json::to_value(&response).expect("serialize");
        assert_eq!(rendered["id"], json!(2));
        assert!(rendered.get("result").is_none());
        assert!(
            !rendered["error"]["message"]
                .as_str()
                .expect("message")
                .is_empty()
        );
    }
}
