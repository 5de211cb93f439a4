use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_CONFIG_PATH: &str = "config/bridge.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub ollama_url: String,
    pub system_prompt: Option<String>,
    pub tools: Vec<ToolDefinition>,
}

/// One registry entry as declared by the operator. The registry is fixed at
/// process start; there is no runtime registration surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub endpoint: EndpointConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointConfig {
    Http { url: String },
    Command { program: String, args: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("tool '{name}' in {path:?} must declare exactly one of `url` or `command`")]
    Tool { path: PathBuf, name: String },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    ollama_url: Option<String>,
    system_prompt: Option<String>,
    #[serde(default)]
    tools: Vec<RawTool>,
}

#[derive(Debug, Deserialize)]
struct RawTool {
    name: String,
    url: Option<String>,
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, Path::new(DEFAULT_CONFIG_PATH))
    }

    fn load_from(path: Option<&Path>, default_path: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            system_prompt: None,
            tools: Vec::new(),
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading bridge configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tools = Vec::with_capacity(parsed.tools.len());
    for tool in parsed.tools {
        tools.push(convert_tool(path, tool)?);
    }

    Ok(AppConfig {
        model: parsed.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        ollama_url: parsed
            .ollama_url
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        system_prompt: parsed.system_prompt,
        tools,
    })
}

fn convert_tool(path: &Path, raw: RawTool) -> Result<ToolDefinition, ConfigError> {
    let endpoint = match (raw.url, raw.command) {
        (Some(url), None) => EndpointConfig::Http { url },
        (None, Some(program)) => EndpointConfig::Command {
            program,
            args: raw.args,
        },
        _ => {
            return Err(ConfigError::Tool {
                path: path.to_path_buf(),
                name: raw.name,
            });
        }
    };
    Ok(ToolDefinition {
        name: raw.name,
        endpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let default_path = temp.path().join("bridge.toml");

        let config = AppConfig::load_from(None, &default_path).expect("load succeeds");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert!(config.system_prompt.is_none());
        assert!(config.tools.is_empty());
    }

    #[test]
    fn broken_default_config_is_still_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let default_path = temp.path().join("bridge.toml");
        fs::write(&default_path, "model = [").expect("write");

        let error = AppConfig::load_from(None, &default_path).expect_err("must fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn reads_model_and_ollama_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.toml");
        fs::write(
            &path,
            r#"
model = "mistral"
ollama_url = "http://10.0.0.5:11434"
system_prompt = "keep short"
"#,
        )
        .expect("write");

        let config = AppConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.ollama_url, "http://10.0.0.5:11434");
        assert_eq!(config.system_prompt.as_deref(), Some("keep short"));
        assert!(config.tools.is_empty());
    }

    #[test]
    fn reads_tool_definitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.toml");
        fs::write(
            &path,
            r#"
model = "mistral"

[[tools]]
name = "filesystem:list"
url = "http://localhost:9001/tools/filesystem/list"

[[tools]]
name = "echo"
command = "mcp-echo"
args = ["--single-shot"]
"#,
        )
        .expect("write tools config");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.tools.len(), 2);
        assert_eq!(config.tools[0].name, "filesystem:list");
        assert_eq!(
            config.tools[0].endpoint,
            EndpointConfig::Http {
                url: "http://localhost:9001/tools/filesystem/list".to_string()
            }
        );
        assert_eq!(
            config.tools[1].endpoint,
            EndpointConfig::Command {
                program: "mcp-echo".to_string(),
                args: vec!["--single-shot".to_string()],
            }
        );
    }

    #[test]
    fn rejects_tool_with_both_transports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.toml");
        fs::write(
            &path,
            r#"
[[tools]]
name = "broken"
url = "http://localhost:9001/x"
command = "x"
"#,
        )
        .expect("write");

        let error = AppConfig::load(Some(&path)).expect_err("must fail");
        assert!(matches!(error, ConfigError::Tool { name, .. } if name == "broken"));
    }

    #[test]
    fn falls_back_to_default_model_if_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.toml");
        fs::write(&path, "system_prompt = \"only system\"").expect("write");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.system_prompt.as_deref(), Some("only system"));
    }
}
