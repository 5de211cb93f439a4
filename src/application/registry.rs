use crate::config::{EndpointConfig, ToolDefinition};
use std::collections::HashMap;

/// Where a logical tool name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEndpoint {
    Http { url: String },
    Command { program: String, args: Vec<String> },
}

impl ToolEndpoint {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolEndpoint::Http { .. } => "http",
            ToolEndpoint::Command { .. } => "command",
        }
    }

    pub fn target(&self) -> String {
        match self {
            ToolEndpoint::Http { url } => url.clone(),
            ToolEndpoint::Command { program, args } => {
                if args.is_empty() {
                    program.clone()
                } else {
                    format!("{} {}", program, args.join(" "))
                }
            }
        }
    }
}

/// Static mapping from logical tool name to invocation target. Built once at
/// startup from configuration and read-only afterwards, so concurrent
/// requests share it without locking.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolEndpoint>,
}

impl ToolRegistry {
    pub fn new(definitions: Vec<ToolDefinition>) -> Self {
        let entries = definitions
            .into_iter()
            .map(|definition| {
                let endpoint = match definition.endpoint {
                    EndpointConfig::Http { url } => ToolEndpoint::Http { url },
                    EndpointConfig::Command { program, args } => {
                        ToolEndpoint::Command { program, args }
                    }
                };
                (definition.name, endpoint)
            })
            .collect();
        Self { entries }
    }

    /// Pure lookup. A miss is a first-class outcome handled by the caller,
    /// never an abort.
    pub fn resolve(&self, name: &str) -> Option<&ToolEndpoint> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolEndpoint)> {
        self.entries
            .iter()
            .map(|(name, endpoint)| (name.as_str(), endpoint))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ToolRegistry {
        ToolRegistry::new(vec![
            ToolDefinition {
                name: "filesystem:list".into(),
                endpoint: EndpointConfig::Http {
                    url: "http://localhost:9001/tools/filesystem/list".into(),
                },
            },
            ToolDefinition {
                name: "echo".into(),
                endpoint: EndpointConfig::Command {
                    program: "mcp-echo".into(),
                    args: Vec::new(),
                },
            },
        ])
    }

    #[test]
    fn resolves_registered_names() {
        let registry = sample_registry();
        assert_eq!(
            registry.resolve("filesystem:list"),
            Some(&ToolEndpoint::Http {
                url: "http://localhost:9001/tools/filesystem/list".into()
            })
        );
        assert_eq!(registry.resolve("echo").map(ToolEndpoint::kind), Some("command"));
    }

    #[test]
    fn miss_is_none_not_error() {
        let registry = sample_registry();
        assert!(registry.resolve("unknown:tool").is_none());
        assert_eq!(registry.len(), 2);
    }
}
