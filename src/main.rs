mod application;
mod config;
mod domain;
mod infrastructure;

pub use application::{augment, bridge, invoker, registry, stdio};
pub use domain::types;
pub use infrastructure::{model, rpc, server};

use bridge::{Bridge, BridgeConfig};
use clap::{Parser, ValueEnum};
use config::AppConfig;
use invoker::ToolInvoker;
use model::OllamaClient;
use registry::ToolRegistry;
use rpc::types::RpcResponse;
use serde_json::{Value, json};
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "mcp-bridge",
    version,
    about = "JSON-RPC bridge between registered tools and an Ollama backend"
)]
struct Cli {
    #[arg(long)]
    ollama_url: Option<String>,
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    system: Option<String>,
    #[arg(long, value_enum, default_value_t = RunMode::Serve)]
    mode: RunMode,
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
    #[arg(long)]
    prompt_file: Option<String>,
    /// Tool names to invoke before the model call (invoke mode).
    #[arg(long = "tool")]
    tools: Vec<String>,
    /// Tool input as name=<json object> (invoke mode).
    #[arg(long = "tool-input")]
    tool_inputs: Vec<String>,
    /// Hint tools as retrieval-only: parameter-less GET instead of POST.
    #[arg(long)]
    get: bool,
    prompt: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RunMode {
    Serve,
    Stdio,
    Invoke,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting mcp-bridge");
    let cli = Cli::parse();
    debug!(?cli.mode, config = ?cli.config, model = ?cli.model, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let file_config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }

    let registry = Arc::new(ToolRegistry::new(file_config.tools.clone()));
    let invoker = ToolInvoker::new(Arc::clone(&registry));

    let ollama_url = cli
        .ollama_url
        .clone()
        .unwrap_or_else(|| file_config.ollama_url.clone());
    debug!(ollama_url = %ollama_url, "Creating Ollama provider");
    let provider = OllamaClient::new(ollama_url);

    let mut bridge_config = BridgeConfig::new(file_config.model.clone());
    if let Some(system) = cli.system.clone().or(file_config.system_prompt.clone()) {
        bridge_config = bridge_config.with_system_prompt(system);
    }
    let bridge = Arc::new(Bridge::new(provider, invoker.clone(), bridge_config));

    info!(mode = ?cli.mode, tools = registry.len(), "Running bridge in selected mode");
    match cli.mode {
        RunMode::Serve => {
            server::serve(bridge, registry, cli.addr).await?;
        }
        RunMode::Stdio => {
            info!("Entering single-shot stdio mode; awaiting one JSON-RPC line");
            stdio::run(invoker).await?;
        }
        RunMode::Invoke => {
            let prompt = load_prompt(&cli)?;
            let params = build_invoke_params(&cli, prompt)?;
            let id = Value::String(Uuid::new_v4().to_string());
            info!("Dispatching one-shot invoke request");
            let response = match bridge.handle(params).await {
                Ok(outcome) => RpcResponse::success(
                    Some(id),
                    json!({
                        "tool_results": outcome.tool_results,
                        "model_response": outcome.model_response,
                    }),
                ),
                Err(error) => RpcResponse::error(Some(id), error.user_message()),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    info!("Bridge execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

fn build_invoke_params(cli: &Cli, prompt: String) -> Result<Value, Box<dyn Error>> {
    let mut tool_inputs = serde_json::Map::new();
    for entry in &cli.tool_inputs {
        let (name, raw) = entry
            .split_once('=')
            .ok_or("tool input must use name=<json> syntax")?;
        let value: Value = serde_json::from_str(raw)
            .map_err(|error| format!("tool input for '{name}' is not valid JSON: {error}"))?;
        tool_inputs.insert(name.to_string(), value);
    }

    Ok(json!({
        "model": cli.model,
        "prompt": prompt,
        "tools": cli.tools,
        "tool_inputs": tool_inputs,
        "httpmethod": if cli.get { "get" } else { "post" },
    }))
}

fn load_prompt(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.prompt_file {
        info!(path = %path, "Loading prompt from file");
        let content = fs::read_to_string(path)?;
        return Ok(normalize_prompt(content));
    }

    if !cli.prompt.is_empty() {
        info!("Using prompt provided through CLI arguments");
        let joined = cli.prompt.join(" ");
        return Ok(normalize_prompt(joined));
    }

    if atty::isnt(atty::Stream::Stdin) {
        info!("Reading prompt from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(normalize_prompt(buffer));
    }

    warn!("Prompt not provided via arguments, file, or stdin");
    Err("prompt required via arguments, file, or stdin".into())
}

fn normalize_prompt(prompt: String) -> String {
    prompt.trim().to_string()
}
