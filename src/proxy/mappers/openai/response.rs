// OpenAI 非流式响应转换
use serde_json::Value;

use super::streaming::{TransformOptions, REASONING_KEYS};
use crate::constants::{THINK_CLOSE, THINK_OPEN};

/// Fold each choice's reasoning into its content as a `<think>` block.
///
/// Choices are independent. Reasoning fields are removed from the output whether or
/// not they were shown; empty reasoning leaves the content untouched.
pub fn transform_openai_response(body: &mut Value, options: &TransformOptions) {
    let Some(choices) = body.get_mut("choices").and_then(Value::as_array_mut) else {
        return;
    };

    for choice in choices.iter_mut() {
        let Some(message) = choice.get_mut("message").and_then(Value::as_object_mut) else {
            continue;
        };

        let reasoning = REASONING_KEYS
            .iter()
            .find_map(|k| message.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .map(str::to_string);
        for key in REASONING_KEYS {
            message.remove(key);
        }

        if !options.show_reasoning {
            continue;
        }
        let Some(reasoning) = reasoning else {
            continue;
        };

        let answer = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let merged = format!("{}{}{}{}", THINK_OPEN, reasoning, THINK_CLOSE, answer);
        message.insert("content".to_string(), Value::String(merged));
    }
}
