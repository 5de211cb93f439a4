use crate::bridge::BridgeError;
use crate::model::ModelProvider;
use crate::rpc::types::{RpcRequest, RpcResponse};
use crate::server::ServerState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error};

/// JSON-RPC entry point. Whatever happens, the caller gets a syntactically
/// valid envelope with the request id echoed back. Deserialization happens
/// inside the handler, not in the extractor, so a body with a missing or
/// malformed field still gets an error envelope instead of a bare 422.
#[utoipa::path(
    post,
    path = "/mcp",
    tag = "bridge",
    request_body = RpcRequest,
    responses(
        (status = 200, description = "JSON-RPC envelope with either result or error", body = RpcResponse)
    )
)]
pub(crate) async fn handle_rpc<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Json<RpcResponse> {
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            error!(%rejection, "Failed to read JSON-RPC request body");
            return Json(RpcResponse::invalid_request(
                None,
                format!("invalid request body: {rejection}"),
            ));
        }
    };

    let id = body.get("id").cloned();
    let request: RpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(source) => {
            debug!(%source, "Rejecting malformed JSON-RPC request");
            return Json(RpcResponse::invalid_request(
                id,
                format!("invalid request: {source}"),
            ));
        }
    };
    debug!(method = %request.method, "Received JSON-RPC request");

    if request.jsonrpc != "2.0" {
        return Json(RpcResponse::invalid_request(
            request.id,
            "unsupported jsonrpc version (expected 2.0)",
        ));
    }

    let response = match request.method.as_str() {
        "invoke" => handle_invoke(&state, request).await,
        other => {
            error!(method = other, "Unknown JSON-RPC method");
            RpcResponse::method_not_found(request.id, other)
        }
    };

    Json(response)
}

async fn handle_invoke<P: ModelProvider>(
    state: &Arc<ServerState<P>>,
    request: RpcRequest,
) -> RpcResponse {
    let params = request.params.unwrap_or_else(|| json!({}));
    match state.bridge().handle(params).await {
        Ok(outcome) => RpcResponse::success(
            request.id,
            json!({
                "tool_results": outcome.tool_results,
                "model_response": outcome.model_response,
            }),
        ),
        Err(error @ BridgeError::Validation(_)) => {
            debug!(%error, "Rejecting invoke request");
            RpcResponse::error(request.id, error.user_message())
        }
        Err(error @ BridgeError::Model(_)) => {
            error!(%error, "Model backend call failed");
            RpcResponse::error(request.id, error.user_message())
        }
    }
}
