use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportHint {
    #[default]
    Post,
    Get,
}

/// Outcome of a single tool call. A failure is a value, not an abort: one
/// tool's fault must never suppress a sibling's result.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Ok(Value),
    Err(String),
}

impl ToolResult {
    pub fn is_err(&self) -> bool {
        matches!(self, ToolResult::Err(_))
    }
}

impl Serialize for ToolResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ToolResult::Ok(payload) => payload.serialize(serializer),
            ToolResult::Err(message) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

/// Tool results keyed by tool name, kept in request-declared order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResults {
    entries: Vec<(String, ToolResult)>,
}

impl ToolResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, result: ToolResult) {
        self.entries.push((name.into(), result));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(entry, _)| entry == name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolResult> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolResult)> {
        self.entries
            .iter()
            .map(|(name, result)| (name.as_str(), result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the collection as a JSON object. Relies on serde_json's
    /// `preserve_order` feature so the object keeps insertion order.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.entries.len());
        for (name, result) in &self.entries {
            let rendered = match result {
                ToolResult::Ok(payload) => payload.clone(),
                ToolResult::Err(message) => serde_json::json!({
                    "ok": false,
                    "error": message,
                }),
            };
            map.insert(name.clone(), rendered);
        }
        Value::Object(map)
    }
}

impl Serialize for ToolResults {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, result) in &self.entries {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_result_serializes_as_raw_payload() {
        let result = ToolResult::Ok(json!({"ok": true, "files": ["a.txt"]}));
        let rendered = serde_json::to_value(&result).expect("serialize");
        assert_eq!(rendered, json!({"ok": true, "files": ["a.txt"]}));
    }

    #[test]
    fn err_result_serializes_with_ok_false() {
        let result = ToolResult::Err("tool not registered".into());
        let rendered = serde_json::to_value(&result).expect("serialize");
        assert_eq!(rendered, json!({"ok": false, "error": "tool not registered"}));
    }

    #[test]
    fn results_keep_declared_order() {
        let mut results = ToolResults::new();
        results.push("zeta", ToolResult::Ok(json!(1)));
        results.push("alpha", ToolResult::Err("boom".into()));
        let names: Vec<_> = results.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        let rendered = serde_json::to_string(&results).expect("serialize");
        let zeta = rendered.find("zeta").expect("zeta present");
        let alpha = rendered.find("alpha").expect("alpha present");
        assert!(zeta < alpha);
    }

    #[test]
    fn lookup_by_name() {
        let mut results = ToolResults::new();
        results.push("echo", ToolResult::Ok(json!("HELLO")));
        assert!(results.contains("echo"));
        assert!(!results.contains("other"));
        assert_eq!(results.get("echo"), Some(&ToolResult::Ok(json!("HELLO"))));
    }

    #[test]
    fn transport_hint_deserializes_lowercase() {
        assert_eq!(
            serde_json::from_value::<TransportHint>(json!("get")).expect("parse"),
            TransportHint::Get
        );
        assert_eq!(TransportHint::default(), TransportHint::Post);
    }
}
