use crate::bridge::Bridge;
use crate::model::ModelProvider;
use crate::registry::ToolRegistry;
use crate::rpc::server::handle_rpc;
use crate::rpc::types::{RpcError, RpcRequest, RpcResponse};
use axum::extract::State;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub struct ServerState<P: ModelProvider> {
    bridge: Arc<Bridge<P>>,
    registry: Arc<ToolRegistry>,
}

impl<P: ModelProvider> ServerState<P> {
    pub fn new(bridge: Arc<Bridge<P>>, registry: Arc<ToolRegistry>) -> Self {
        Self { bridge, registry }
    }

    pub fn bridge(&self) -> Arc<Bridge<P>> {
        Arc::clone(&self.bridge)
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(crate::rpc::server::handle_rpc, tools_handler),
    components(schemas(RpcRequest, RpcResponse, RpcError, ToolListResponse, ToolListEntry)),
    tags(
        (name = "bridge", description = "JSON-RPC tool-invocation bridge"),
        (name = "tools", description = "Registered tool endpoints")
    )
)]
struct ApiDoc;

pub async fn serve<P>(
    bridge: Arc<Bridge<P>>,
    registry: Arc<ToolRegistry>,
    addr: SocketAddr,
) -> Result<(), ServerError>
where
    P: ModelProvider + 'static,
{
    let api = ApiDoc::openapi();
    info!(%addr, tools = registry.len(), "Binding bridge server");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let state = Arc::new(ServerState::new(bridge, registry));
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", api))
        .route("/mcp", post(handle_rpc::<P>))
        .route("/tools", get(tools_handler::<P>))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Bridge server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}

#[derive(Debug, Serialize, ToSchema)]
struct ToolListEntry {
    name: String,
    kind: String,
    target: String,
}

#[derive(Debug, Serialize, ToSchema)]
struct ToolListResponse {
    tools: Vec<ToolListEntry>,
}

#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    responses(
        (status = 200, description = "Registered tools and their invocation targets", body = ToolListResponse)
    )
)]
async fn tools_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
) -> Json<ToolListResponse> {
    let registry = state.registry();
    debug!(tool_count = registry.len(), "Serving /tools request");
    let mut tools: Vec<ToolListEntry> = registry
        .iter()
        .map(|(name, endpoint)| ToolListEntry {
            name: name.to_string(),
            kind: endpoint.kind().to_string(),
            target: endpoint.target(),
        })
        .collect();
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ToolListResponse { tools })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, ToolDefinition};

    struct NoopProvider;

    #[async_trait::async_trait]
    impl ModelProvider for NoopProvider {
        async fn generate(
            &self,
            _request: crate::model::GenerateRequest,
        ) -> Result<serde_json::Value, crate::model::ModelError> {
            Ok(serde_json::json!({}))
        }
    }

    #[tokio::test]
    async fn tools_listing_is_sorted_by_name() {
        let registry = Arc::new(ToolRegistry::new(vec![
            ToolDefinition {
                name: "zeta".into(),
                endpoint: EndpointConfig::Http {
                    url: "http://localhost:9001/zeta".into(),
                },
            },
            ToolDefinition {
                name: "alpha".into(),
                endpoint: EndpointConfig::Command {
                    program: "mcp-echo".into(),
                    args: vec!["--single-shot".into()],
                },
            },
        ]));
        let bridge = Arc::new(Bridge::new(
            NoopProvider,
            crate::invoker::ToolInvoker::new(registry.clone()),
            crate::bridge::BridgeConfig::new("llama3"),
        ));
        let state = Arc::new(ServerState::new(bridge, registry));

        let response = tools_handler(State(state)).await;
        let names: Vec<_> = response.0.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(response.0.tools[0].kind, "command");
        assert_eq!(response.0.tools[0].target, "mcp-echo --single-shot");
    }
}
