// OpenAI 流式响应转换 (upstream SSE → 统一 <think> 格式 SSE)
// 对应 LineReassembler + ReasoningState

use std::fmt::Display;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde_json::{Map, Value};

use crate::constants::{SSE_DATA_PREFIX, SSE_DONE, THINK_CLOSE, THINK_OPEN};
use crate::models::StreamProfile;

/// Provider fields that carry reasoning text, checked in order
pub const REASONING_KEYS: [&str; 2] = ["reasoning_content", "reasoning"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub show_reasoning: bool,
}

/// Cross-event state of one streaming response
#[derive(Debug, Default)]
pub struct ReasoningState {
    inside_think: bool,
}

impl ReasoningState {
    pub fn new() -> Self {
        Self::default()
    }

    /// An opening delimiter has been emitted without its close
    pub fn is_inside_think(&self) -> bool {
        self.inside_think
    }
}

/// Splits an arbitrarily chunked byte stream back into lines.
///
/// Only the trailing partial line is buffered between pushes.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: BytesMut,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line, in order, without the
    /// terminator. Blank lines (SSE event separators) are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            lines.push(line.freeze());
        }
        self.scanned = self.buffer.len();
        lines
    }

    /// Bytes still waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of input. The unterminated fragment, if any, is handed back for
    /// diagnostics only; it is never forwarded.
    pub fn finish(self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.freeze())
        }
    }
}

/// One upstream protocol line after classification
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<'a> {
    /// `data: [DONE]`
    Done,
    /// `data: {...}` with a parsable JSON payload
    Payload(Value),
    /// Anything else, forwarded byte for byte
    Opaque(&'a str),
}

pub fn parse_event(line: &str) -> StreamEvent<'_> {
    let Some(rest) = line.strip_prefix(SSE_DATA_PREFIX) else {
        return StreamEvent::Opaque(line);
    };

    let payload = rest.trim();
    if payload == SSE_DONE {
        return StreamEvent::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => StreamEvent::Payload(value),
        Err(_) => StreamEvent::Opaque(line),
    }
}

fn frame(line: &str) -> String {
    format!("{}\n\n", line)
}

fn non_empty_str<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn take_reasoning(map: &mut Map<String, Value>) -> (Option<String>, bool) {
    let text = REASONING_KEYS
        .iter()
        .find_map(|k| non_empty_str(map, k))
        .map(str::to_string);
    let mut had_key = false;
    for key in REASONING_KEYS {
        had_key |= map.remove(key).is_some();
    }
    (text, had_key)
}

/// Rewrite one delta in place. Returns whether anything changed.
fn transform_delta(
    delta: &mut Map<String, Value>,
    state: &mut ReasoningState,
    options: &TransformOptions,
) -> bool {
    let has_reasoning = REASONING_KEYS.iter().any(|k| non_empty_str(delta, k).is_some());
    let content = non_empty_str(delta, "content").map(str::to_string);

    if !has_reasoning && content.is_none() {
        // nothing to merge; hidden mode still scrubs empty/null reasoning keys
        if !options.show_reasoning {
            return take_reasoning(delta).1;
        }
        return false;
    }

    let (reasoning, had_reasoning_key) = take_reasoning(delta);

    if !options.show_reasoning {
        if !had_reasoning_key {
            return false;
        }
        delta.insert(
            "content".to_string(),
            Value::String(content.unwrap_or_default()),
        );
        return true;
    }

    let mut text = String::new();
    if let Some(reasoning) = reasoning {
        if !state.inside_think {
            text.push_str(THINK_OPEN);
            state.inside_think = true;
        }
        text.push_str(&reasoning);
    }
    if let Some(content) = content {
        if state.inside_think {
            text.push_str(THINK_CLOSE);
            state.inside_think = false;
        }
        text.push_str(&content);
    }

    let unchanged = !had_reasoning_key
        && delta.get("content").and_then(Value::as_str) == Some(text.as_str());
    delta.insert("content".to_string(), Value::String(text));
    !unchanged
}

/// Transform a single complete line into its framed output (`...\n\n`).
///
/// Parse failures are not errors: the raw line goes out unchanged and `state` is untouched.
pub fn transform_line(line: &str, state: &mut ReasoningState, options: &TransformOptions) -> String {
    match parse_event(line) {
        StreamEvent::Done => frame(&format!("{} {}", SSE_DATA_PREFIX, SSE_DONE)),
        StreamEvent::Opaque(raw) => frame(raw),
        StreamEvent::Payload(mut value) => {
            let mut changed = false;
            if let Some(choices) = value.get_mut("choices").and_then(Value::as_array_mut) {
                for (i, choice) in choices.iter_mut().enumerate() {
                    let Some(delta) = choice.get_mut("delta").and_then(Value::as_object_mut) else {
                        continue;
                    };
                    if i == 0 {
                        changed |= transform_delta(delta, state, options);
                    } else if !options.show_reasoning {
                        // think block follows choices[0] only; other choices are just scrubbed
                        changed |= take_reasoning(delta).1;
                    }
                }
            }

            if !changed {
                return frame(line);
            }
            match serde_json::to_string(&value) {
                Ok(json) => frame(&format!("{} {}", SSE_DATA_PREFIX, json)),
                Err(_) => frame(line),
            }
        }
    }
}

/// Per-provider dispatch: `Passthrough` with reasoning shown is a pure re-frame,
/// every other combination runs the delta transform.
fn process_line(
    line: &[u8],
    profile: StreamProfile,
    state: &mut ReasoningState,
    options: &TransformOptions,
) -> (Bytes, bool) {
    let Ok(text) = std::str::from_utf8(line) else {
        let mut raw = BytesMut::with_capacity(line.len() + 2);
        raw.extend_from_slice(line);
        raw.extend_from_slice(b"\n\n");
        return (raw.freeze(), false);
    };

    let is_done = text
        .strip_prefix(SSE_DATA_PREFIX)
        .is_some_and(|rest| rest.trim() == SSE_DONE);
    let out = match profile {
        StreamProfile::Passthrough if options.show_reasoning => frame(text),
        _ => transform_line(text, state, options),
    };
    (Bytes::from(out), is_done)
}

/// 创建从上游 SSE 流到统一 <think> SSE 流的转换
///
/// Upstream errors end the output with an `Err` item, which makes the server drop the
/// connection; a `[DONE]` is never synthesized.
pub fn create_reasoning_sse_stream<S, E>(
    upstream: S,
    profile: StreamProfile,
    options: TransformOptions,
    trace_id: String,
) -> Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    use async_stream::stream;

    Box::pin(stream! {
        let mut upstream = Box::pin(upstream);
        let mut state = ReasoningState::new();
        let mut reassembler = LineReassembler::new();
        let mut saw_done = false;
        let mut failed = false;

        while let Some(chunk_result) = upstream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    for line in reassembler.push(&chunk) {
                        let (out, is_done) = process_line(&line, profile, &mut state, &options);
                        saw_done |= is_done;
                        yield Ok(out);
                    }
                }
                Err(e) => {
                    tracing::warn!("[{}] Upstream stream error: {}", trace_id, e);
                    failed = true;
                    yield Err(format!("Stream error: {}", e));
                    break;
                }
            }
        }

        if !failed {
            if let Some(rest) = reassembler.finish() {
                tracing::warn!(
                    "[{}] Discarding {} bytes of unterminated upstream data",
                    trace_id,
                    rest.len()
                );
            }
            if !saw_done {
                tracing::warn!("[{}] Upstream stream ended without [DONE]", trace_id);
            } else {
                tracing::debug!("[{}] Stream completed", trace_id);
            }
        }
    })
}
