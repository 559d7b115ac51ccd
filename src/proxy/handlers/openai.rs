// OpenAI Handler
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tokio::time::Duration;
use tracing::{debug, info};

use super::common::{error_response, new_trace_id};
use crate::models::StreamProfile;
use crate::proxy::common::directive::scan_thinking_directive;
use crate::proxy::common::model_mapping::resolve_model;
use crate::proxy::mappers::openai::{
    build_upstream_request, create_reasoning_sse_stream, transform_openai_response, ChatRequest,
    TransformOptions,
};
use crate::proxy::provider::Provider;
use crate::proxy::server::AppState;
use crate::proxy::upstream::UpstreamError;

/// POST /v1/chat/completions, /{provider}/v1/chat/completions
///
/// The body is taken as raw bytes so a malformed payload degrades to defaults
/// instead of being rejected by an extractor.
pub async fn handle_chat_completions(
    State(state): State<AppState>,
    uri: Uri,
    body: Bytes,
) -> Response {
    let trace_id = new_trace_id();
    let provider = Provider::from_path(uri.path());
    let settings = provider.settings(&state.config);
    let request = ChatRequest::from_slice(&body);

    let chat_url = settings.chat_url();
    let probe_timeout = Duration::from_secs(state.config.probe_timeout_secs);
    let resolved = resolve_model(&request.model, &settings, |model| {
        state
            .upstream
            .probe(&chat_url, settings.api_key, model, probe_timeout)
    })
    .await;

    let scan = scan_thinking_directive(&request.messages, &state.config.thinking_marker);
    let thinking = scan.thinking_requested || state.config.force_thinking;

    info!(
        "[{}] {} | model: {} -> {} | stream: {} | thinking: {} | messages: {}",
        trace_id,
        provider,
        request.model,
        resolved.id,
        request.stream,
        thinking,
        scan.messages.len()
    );

    let upstream_body = build_upstream_request(
        &settings,
        resolved.id,
        scan.messages,
        request.temperature,
        request.max_tokens,
        thinking,
        request.stream,
    );

    let options = TransformOptions {
        show_reasoning: state.config.show_reasoning,
    };

    let response = match state
        .upstream
        .post_chat(&chat_url, settings.api_key, &upstream_body)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("[{}] Upstream call failed: {}", trace_id, e);
            return e.into_response();
        }
    };

    let status = response.status();
    if request.stream && status.is_success() {
        return sse_response(response, settings.stream_profile, options, trace_id);
    }

    buffered_response(response, options, &trace_id).await
}

fn sse_response(
    response: reqwest::Response,
    profile: StreamProfile,
    options: TransformOptions,
    trace_id: String,
) -> Response {
    debug!("[{}] Streaming with profile {:?}", trace_id, profile);
    let stream = create_reasoning_sse_stream(response.bytes_stream(), profile, options, trace_id);

    let mut resp = Response::new(Body::from_stream(stream));
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    resp
}

/// Whole-document reply. Also used for non-2xx answers to stream requests,
/// since nothing has been committed to the client yet.
async fn buffered_response(
    response: reqwest::Response,
    options: TransformOptions,
    trace_id: &str,
) -> Response {
    let status = response.status();
    let text = match response.text().await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("[{}] Failed to read upstream body: {}", trace_id, e);
            return UpstreamError::from(e).into_response();
        }
    };

    let mut body: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("[{}] Upstream {} body is not JSON: {}", trace_id, status, e);
            if status.is_success() {
                return UpstreamError::InvalidBody(e.to_string()).into_response();
            }
            return error_response(status.as_u16(), &text);
        }
    };

    if status.is_success() {
        transform_openai_response(&mut body, &options);
    } else {
        tracing::warn!("[{}] Upstream replied {}: {}", trace_id, status, text);
    }

    (status, Json(body)).into_response()
}
