//! Answer extraction. Pulls the human-readable reply out of whatever JSON
//! shape the agent endpoint returns.

use serde_json::Value;

// ---------------------------------------------------------------------------
// ExtractionStrategy
// ---------------------------------------------------------------------------

/// One way of locating answer text inside a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// A dot-notation path with optional array indices, e.g. `outputs[0].text`.
    JsonPath(&'static str),
    /// Every element of the array under `array`, reading the string `field`
    /// of each element in order.
    ArrayField {
        array: &'static str,
        field: &'static str,
    },
}

/// Strategies tried by [`extract_text`], highest priority first.
pub const DEFAULT_STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy::JsonPath("outputs[0].outputs[0].results.message.text"),
    ExtractionStrategy::JsonPath("outputs[0].outputs[0].results.text"),
    ExtractionStrategy::JsonPath("result.text"),
    ExtractionStrategy::JsonPath("message.text"),
    ExtractionStrategy::JsonPath("text"),
    ExtractionStrategy::JsonPath("output"),
    ExtractionStrategy::JsonPath("answer"),
    ExtractionStrategy::JsonPath("response"),
    ExtractionStrategy::ArrayField {
        array: "messages",
        field: "text",
    },
];

impl ExtractionStrategy {
    /// String candidates this strategy finds in `value`, in order. A path that
    /// runs into the wrong kind of value yields nothing.
    pub fn candidates<'a>(&self, value: &'a Value) -> Vec<&'a str> {
        match self {
            ExtractionStrategy::JsonPath(expression) => navigate_json_path(value, expression)
                .and_then(Value::as_str)
                .into_iter()
                .collect(),
            ExtractionStrategy::ArrayField { array, field } => value
                .get(*array)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get(*field).and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// extract_text
// ---------------------------------------------------------------------------

/// Extract the agent's answer using [`DEFAULT_STRATEGIES`].
///
/// Returns the first candidate that is non-empty after trimming, trimmed, or
/// an empty string when nothing matches.
pub fn extract_text(value: &Value) -> String {
    extract_with(value, DEFAULT_STRATEGIES)
}

/// Same as [`extract_text`] with an explicit strategy list.
pub fn extract_with(value: &Value, strategies: &[ExtractionStrategy]) -> String {
    strategies
        .iter()
        .flat_map(|strategy| strategy.candidates(value))
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// JSON path navigator (simple dot-notation)
// ---------------------------------------------------------------------------

/// Navigate a simple dot-notation JSON path.
///
/// Supports:
/// - `"key"`: top-level key
/// - `"key.subkey"`: nested key
/// - `"key[0]"`: array index
/// - `"key[0].subkey"`: array index followed by key
///
/// An index applied to a non-array, or a key applied to a non-object,
/// returns `None`.
pub(crate) fn navigate_json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        if let Some(bracket_pos) = segment.find('[') {
            let key = &segment[..bracket_pos];
            let closing = segment.rfind(']').unwrap_or(segment.len());
            let idx_str = segment.get(bracket_pos + 1..closing)?;

            if !key.is_empty() {
                current = current.get(key)?;
            }
            let idx: usize = idx_str.parse().ok()?;
            current = current.get(idx)?;
        } else {
            current = current.get(segment)?;
        }
    }
    Some(current)
}

/// Render a JSON value as plain text: strings without quotes, everything else
/// in its JSON form.
pub(crate) fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_nested_path_wins() {
        let body = json!({
            "outputs": [{ "outputs": [{ "results": { "message": { "text": "hello" } } }] }]
        });
        assert_eq!(extract_text(&body), "hello");
    }

    #[test]
    fn flat_text_is_trimmed() {
        assert_eq!(extract_text(&json!({ "text": "  hi  " })), "hi");
    }

    #[test]
    fn empty_object_yields_empty_string() {
        assert_eq!(extract_text(&json!({})), "");
    }

    #[test]
    fn results_text_is_used_when_message_missing() {
        let body = json!({ "outputs": [{ "outputs": [{ "results": { "text": "direct" } }] }] });
        assert_eq!(extract_text(&body), "direct");
    }

    #[test]
    fn priority_order_is_respected() {
        let body = json!({
            "response": "last",
            "answer": "fourth",
            "text": "third",
            "message": { "text": "second" },
            "result": { "text": "first" }
        });
        assert_eq!(extract_text(&body), "first");
    }

    #[test]
    fn blank_candidates_are_skipped() {
        let body = json!({ "result": { "text": "   " }, "output": "fallback" });
        assert_eq!(extract_text(&body), "fallback");
    }

    #[test]
    fn non_string_values_are_ignored() {
        let body = json!({ "text": 42, "answer": { "nested": true }, "response": "ok" });
        assert_eq!(extract_text(&body), "ok");
    }

    #[test]
    fn messages_array_first_non_empty_text() {
        let body = json!({
            "messages": [{ "role": "user" }, { "text": "  " }, { "text": "from messages" }, { "text": "later" }]
        });
        assert_eq!(extract_text(&body), "from messages");
    }

    #[test]
    fn messages_that_is_not_an_array_is_ignored() {
        let body = json!({ "messages": { "text": "nope" } });
        assert_eq!(extract_text(&body), "");
    }

    #[test]
    fn wrong_shape_abandons_path_without_error() {
        // `outputs` is an object, so the indexed path is abandoned.
        let body = json!({ "outputs": { "0": "x" }, "answer": "fallback" });
        assert_eq!(extract_text(&body), "fallback");
    }

    #[test]
    fn non_object_root_yields_empty_string() {
        assert_eq!(extract_text(&json!(["text"])), "");
        assert_eq!(extract_text(&json!("plain")), "");
        assert_eq!(extract_text(&Value::Null), "");
    }

    #[test]
    fn navigate_nested_key_and_index() {
        let body = json!({ "items": ["first", "second"], "data": { "id": 7 } });
        assert_eq!(navigate_json_path(&body, "items[1]"), Some(&json!("second")));
        assert_eq!(navigate_json_path(&body, "data.id"), Some(&json!(7)));
        assert_eq!(navigate_json_path(&body, "items[9]"), None);
        assert_eq!(navigate_json_path(&body, "data[0]"), None);
    }

    #[test]
    fn navigate_malformed_index_is_none() {
        let body = json!({ "items": ["a"] });
        assert_eq!(navigate_json_path(&body, "items[x]"), None);
        assert_eq!(navigate_json_path(&body, "items["), None);
    }

    #[test]
    fn custom_strategy_list() {
        let body = json!({ "text": "default", "reply": "custom" });
        let strategies = [ExtractionStrategy::JsonPath("reply")];
        assert_eq!(extract_with(&body, &strategies), "custom");
    }

    #[test]
    fn value_to_string_renders_plain_text() {
        assert_eq!(json_value_to_string(&json!("s")), "s");
        assert_eq!(json_value_to_string(&json!(3)), "3");
        assert_eq!(json_value_to_string(&json!(false)), "false");
        assert_eq!(json_value_to_string(&json!({"a":1})), r#"{"a":1}"#);
    }
}
