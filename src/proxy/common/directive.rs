// 思维指令扫描
// Detects the in-band marker that asks for extended reasoning and strips it before upstream.

use serde_json::Value;

use crate::proxy::mappers::openai::{ChatMessage, MessageContent};

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveScan {
    /// Marker seen in at least one message
    pub thinking_requested: bool,
    /// Same length and order as the input; only marked messages differ
    pub messages: Vec<ChatMessage>,
}

/// Scan every message (plain text and `text` parts) for `marker`.
pub fn scan_thinking_directive(messages: &[ChatMessage], marker: &str) -> DirectiveScan {
    let mut thinking_requested = false;

    if marker.trim().is_empty() {
        return DirectiveScan {
            thinking_requested,
            messages: messages.to_vec(),
        };
    }

    let messages = messages
        .iter()
        .map(|msg| match clean_message(msg, marker) {
            Some(cleaned) => {
                thinking_requested = true;
                cleaned
            }
            None => msg.clone(),
        })
        .collect();

    DirectiveScan {
        thinking_requested,
        messages,
    }
}

/// `None` when the message does not carry the marker
fn clean_message(msg: &ChatMessage, marker: &str) -> Option<ChatMessage> {
    let content = match msg.content.as_ref()? {
        MessageContent::Text(text) => MessageContent::Text(strip_marker(text, marker)?),
        MessageContent::Parts(parts) => {
            let mut found = false;
            let cleaned = parts
                .iter()
                .map(|part| {
                    let text = part
                        .get("type")
                        .and_then(Value::as_str)
                        .filter(|t| *t == "text")
                        .and_then(|_| part.get("text"))
                        .and_then(Value::as_str);
                    match text.and_then(|t| strip_marker(t, marker)) {
                        Some(stripped) => {
                            found = true;
                            let mut part = part.clone();
                            part["text"] = Value::String(stripped);
                            part
                        }
                        None => part.clone(),
                    }
                })
                .collect();
            if !found {
                return None;
            }
            MessageContent::Parts(cleaned)
        }
        MessageContent::Other(_) => return None,
    };

    Some(ChatMessage {
        content: Some(content),
        ..msg.clone()
    })
}

/// Remove every occurrence of `marker`, collapsing the whitespace around each removal
/// to a single space (or newline if the gap spanned lines). `None` if absent.
pub fn strip_marker(text: &str, marker: &str) -> Option<String> {
    if marker.is_empty() || !text.contains(marker) {
        return None;
    }

    let mut current = text.to_string();
    // a join can splice a new occurrence together when the marker contains whitespace
    while current.contains(marker) {
        current = remove_once(&current, marker);
    }
    Some(current)
}

fn remove_once(text: &str, marker: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for (i, piece) in text.split(marker).enumerate() {
        if i == 0 {
            out.push_str(piece);
            continue;
        }

        let left_trimmed = out.trim_end().len();
        let rest = piece.trim_start();
        let gap_has_newline =
            out[left_trimmed..].contains('\n') || piece[..piece.len() - rest.len()].contains('\n');

        out.truncate(left_trimmed);
        if !out.is_empty() && !rest.is_empty() {
            out.push(if gap_has_newline { '\n' } else { ' ' });
        }
        out.push_str(rest);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MARKER: &str = "/think";

    fn user(text: &str) -> ChatMessage {
        ChatMessage::text("user", text)
    }

    fn text_of(msg: &ChatMessage) -> &str {
        match &msg.content {
            Some(MessageContent::Text(t)) => t,
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_strip_marker_whitespace() {
        assert_eq!(strip_marker("/think explain rust", MARKER).as_deref(), Some("explain rust"));
        assert_eq!(strip_marker("explain /think rust", MARKER).as_deref(), Some("explain rust"));
        assert_eq!(strip_marker("explain rust /think", MARKER).as_deref(), Some("explain rust"));
        assert_eq!(
            strip_marker("line one\n/think\nline two", MARKER).as_deref(),
            Some("line one\nline two")
        );
        assert_eq!(strip_marker("/think /think", MARKER).as_deref(), Some(""));
        assert_eq!(strip_marker("no marker here", MARKER), None);
    }

    #[test]
    fn test_strip_marker_keeps_unrelated_whitespace() {
        assert_eq!(
            strip_marker("    let x = 1;\n/think", MARKER).as_deref(),
            Some("    let x = 1;")
        );
        assert_eq!(
            strip_marker("  first\n  second /think\n", MARKER).as_deref(),
            Some("  first\n  second")
        );
        assert_eq!(
            strip_marker("/think\n    indented code", MARKER).as_deref(),
            Some("indented code")
        );
    }

    #[test]
    fn test_other_content_is_not_scanned() {
        let msg = ChatMessage {
            role: "user".to_string(),
            content: Some(MessageContent::Other(json!({"type": "text", "text": "/think hi"}))),
            extra: Default::default(),
        };
        let scan = scan_thinking_directive(std::slice::from_ref(&msg), MARKER);
        assert!(!scan.thinking_requested);
        assert_eq!(scan.messages, vec![msg]);
    }

    #[test]
    fn test_strip_marker_never_leaves_occurrence() {
        // pieces re-joined by a space would spell the marker again
        let marker = "a b";
        let out = strip_marker("xa a bb y", marker).unwrap();
        assert!(!out.contains(marker), "{out:?}");

        let out = strip_marker("/th/thinkink", MARKER).unwrap();
        assert!(!out.contains(MARKER));
    }

    #[test]
    fn test_scan_sets_flag_and_cleans_only_marked_messages() {
        let messages = vec![
            ChatMessage::text("system", "You are helpful."),
            user("/think why is the sky blue? /think"),
            ChatMessage::text("assistant", "Rayleigh scattering."),
        ];

        let scan = scan_thinking_directive(&messages, MARKER);
        assert!(scan.thinking_requested);
        assert_eq!(scan.messages.len(), 3);
        assert_eq!(scan.messages[0], messages[0]);
        assert_eq!(text_of(&scan.messages[1]), "why is the sky blue?");
        assert_eq!(scan.messages[2], messages[2]);

        // input untouched
        assert_eq!(text_of(&messages[1]), "/think why is the sky blue? /think");
    }

    #[test]
    fn test_scan_without_marker() {
        let messages = vec![user("hello"), ChatMessage::text("assistant", "hi")];
        let scan = scan_thinking_directive(&messages, MARKER);
        assert!(!scan.thinking_requested);
        assert_eq!(scan.messages, messages);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let messages = vec![user("solve x^2 = 4 /think"), user("and /think x^3 = 8")];
        let first = scan_thinking_directive(&messages, MARKER);
        assert!(first.thinking_requested);

        let second = scan_thinking_directive(&first.messages, MARKER);
        assert!(!second.thinking_requested);
        assert_eq!(second.messages, first.messages);
        for msg in &second.messages {
            assert!(!text_of(msg).contains(MARKER));
        }
    }

    #[test]
    fn test_scan_content_parts() {
        let msg = ChatMessage {
            role: "user".to_string(),
            content: Some(MessageContent::Parts(vec![
                json!({"type": "image_url", "image_url": {"url": "https://x/y.png"}}),
                json!({"type": "text", "text": "describe this /think"}),
            ])),
            extra: Default::default(),
        };

        let scan = scan_thinking_directive(std::slice::from_ref(&msg), MARKER);
        assert!(scan.thinking_requested);
        match &scan.messages[0].content {
            Some(MessageContent::Parts(parts)) => {
                assert_eq!(parts[0], json!({"type": "image_url", "image_url": {"url": "https://x/y.png"}}));
                assert_eq!(parts[1]["text"], json!("describe this"));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_scan_empty_and_contentless() {
        let scan = scan_thinking_directive(&[], MARKER);
        assert!(!scan.thinking_requested);
        assert!(scan.messages.is_empty());

        let msg = ChatMessage {
            role: "assistant".to_string(),
            content: None,
            extra: Default::default(),
        };
        let scan = scan_thinking_directive(std::slice::from_ref(&msg), MARKER);
        assert!(!scan.thinking_requested);
        assert_eq!(scan.messages, vec![msg]);
    }
}
