// OpenAI → 上游请求构建
use super::models::*;

use crate::proxy::provider::{Provider, ProviderSettings};

/// Assemble the upstream body.
///
/// `thinking` already folds in the global `force_thinking` toggle. When it is false the
/// provider's reasoning key is left out entirely: upstream treats its mere presence as "on".
pub fn build_upstream_request(
    settings: &ProviderSettings<'_>,
    model: String,
    messages: Vec<ChatMessage>,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    thinking: bool,
    stream: bool,
) -> UpstreamChatRequest {
    let mut body = UpstreamChatRequest {
        model,
        messages,
        temperature: temperature
            .filter(|t| t.is_finite())
            .unwrap_or(settings.default_temperature),
        max_tokens: max_tokens
            .filter(|n| *n > 0)
            .unwrap_or(crate::constants::DEFAULT_MAX_TOKENS),
        stream,
        chat_template_kwargs: None,
        enable_thinking: None,
    };

    if thinking {
        match settings.provider {
            Provider::Nvidia => {
                body.chat_template_kwargs = Some(ChatTemplateKwargs { thinking: true });
            }
            Provider::SiliconFlow => {
                body.enable_thinking = Some(true);
            }
        }
    }

    body
}

/// One-token request used to check whether upstream accepts `model` verbatim
pub fn build_probe_request(model: String) -> UpstreamChatRequest {
    UpstreamChatRequest {
        model,
        messages: vec![ChatMessage::text("user", "ping")],
        temperature: 0.0,
        max_tokens: 1,
        stream: false,
        chat_template_kwargs: None,
        enable_thinking: None,
    }
}
