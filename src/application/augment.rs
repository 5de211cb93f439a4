use crate::types::ToolResults;

const PREAMBLE: &str =
    "The model has access to the following tool results (do not assume more than listed):";

/// Merges the user prompt with collected tool results into the single string
/// handed to the model backend. With no tool results the prompt passes
/// through unchanged, byte for byte. Results are rendered pretty-printed in
/// the request's declared tool order, never truncated or reordered.
pub fn augment(prompt: &str, tool_results: &ToolResults) -> String {
    if tool_results.is_empty() {
        return prompt.to_string();
    }

    let rendered = serde_json::to_string_pretty(&tool_results.to_value())
        .expect("tool results render as JSON");

    format!(
        "{PREAMBLE}\n\n{rendered}\n\nNow answer the user's prompt.\n\nUser prompt:\n{prompt}"
    )
}
