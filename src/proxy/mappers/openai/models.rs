// OpenAI 数据模型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::DEFAULT_MAX_TOKENS;

/// Inbound chat request, already normalized.
///
/// Built leniently from whatever the client sent: a missing or wrong-typed field
/// becomes its default instead of a 400, so every body reaches the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                tracing::warn!("Client body is not JSON ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let model = value
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let messages = value
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let msg = ChatMessage::from_value(item);
                        if msg.is_none() {
                            tracing::debug!("Skipping non-object message: {}", item);
                        }
                        msg
                    })
                    .collect()
            })
            .unwrap_or_default();

        let temperature = value
            .get("temperature")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite());

        let max_tokens = value.get("max_tokens").and_then(|v| {
            v.as_u64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.is_finite() && *f >= 1.0)
                    .map(|f| f as u64)
            })
        });

        Self {
            model,
            messages,
            temperature,
            max_tokens,
            stream: value.get("stream").map(coerce_bool).unwrap_or(false),
        }
    }

    pub fn max_tokens_or_default(&self) -> u64 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// `true`, `"true"`, `"1"` and non-zero numbers are true; everything else is false
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    /// name, tool_call_id, tool_calls, ... forwarded as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// Lenient per-message parse: any JSON object is a message, a non-string role
    /// becomes empty. `None` only for items that are not objects.
    pub fn from_value(item: &Value) -> Option<Self> {
        let mut extra = item.as_object()?.clone();
        let role = extra
            .remove("role")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let content = extra
            .remove("content")
            .filter(|v| !v.is_null())
            .map(MessageContent::from_value);

        Some(Self {
            role,
            content,
            extra,
        })
    }

    pub fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(MessageContent::Text(content.to_string())),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    /// OpenAI content parts; only `{"type": "text"}` parts are inspected
    Parts(Vec<Value>),
    /// Any other shape (a lone part object, a number...), forwarded untouched
    Other(Value),
}

impl MessageContent {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => MessageContent::Text(s),
            Value::Array(parts) => MessageContent::Parts(parts),
            other => MessageContent::Other(other),
        }
    }
}

/// Body sent to the upstream `/chat/completions` endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub stream: bool,
    /// NVIDIA NIM reasoning switch. Absent means off; never sent as `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_template_kwargs: Option<ChatTemplateKwargs>,
    /// SiliconFlow reasoning switch. Absent means off; never sent as `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTemplateKwargs {
    pub thinking: bool,
}
