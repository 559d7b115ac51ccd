//! 流式转换场景测试
//! Whole-stream behaviour of the SSE rewriter, independent of how upstream chunks its bytes.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::StreamExt;
    use serde_json::Value;

    use crate::models::StreamProfile;
    use crate::proxy::mappers::openai::{create_reasoning_sse_stream, TransformOptions};

    const SHOW: TransformOptions = TransformOptions { show_reasoning: true };
    const HIDE: TransformOptions = TransformOptions { show_reasoning: false };

    const UPSTREAM: &str = concat!(
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"reasoning_content\":\"先想一想\"}}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"reasoning_content\":\", then answer\"}}]}\n\n",
        ": keep-alive\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Answer\",\"reasoning_content\":null}}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" done.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    async fn run(
        chunks: Vec<Vec<u8>>,
        profile: StreamProfile,
        options: TransformOptions,
    ) -> Vec<Result<Bytes, String>> {
        let upstream = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<Bytes, std::io::Error>(Bytes::from(c))),
        );
        create_reasoning_sse_stream(upstream, profile, options, "test".to_string())
            .collect()
            .await
    }

    async fn run_ok(chunks: Vec<Vec<u8>>, profile: StreamProfile, options: TransformOptions) -> String {
        let mut out = Vec::new();
        for item in run(chunks, profile, options).await {
            out.extend_from_slice(&item.expect("stream item"));
        }
        String::from_utf8(out).expect("utf-8 output")
    }

    /// Concatenation of every `choices[0].delta.content` in the output
    fn joined_content(output: &str) -> String {
        output
            .split("\n\n")
            .filter_map(|frame| frame.strip_prefix("data: "))
            .filter_map(|payload| serde_json::from_str::<Value>(payload).ok())
            .filter_map(|v| v["choices"][0]["delta"]["content"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_reasoning_merged_into_think_block() {
        let out = run_ok(vec![UPSTREAM.as_bytes().to_vec()], StreamProfile::Reasoning, SHOW).await;

        assert_eq!(
            joined_content(&out),
            "<think>\n先想一想, then answer\n</think>\n\nAnswer done."
        );
        assert!(!out.contains("reasoning_content"));
        assert!(out.contains(": keep-alive\n\n"));
        assert!(out.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_output_independent_of_chunking() {
        let bytes = UPSTREAM.as_bytes();
        let whole = run_ok(vec![bytes.to_vec()], StreamProfile::Reasoning, SHOW).await;

        // every two-way split, including ones inside a multi-byte character
        for i in 1..bytes.len() {
            let split = run_ok(
                vec![bytes[..i].to_vec(), bytes[i..].to_vec()],
                StreamProfile::Reasoning,
                SHOW,
            )
            .await;
            assert_eq!(split, whole, "split at byte {}", i);
        }

        let single_bytes: Vec<Vec<u8>> = bytes.iter().map(|b| vec![*b]).collect();
        assert_eq!(run_ok(single_bytes, StreamProfile::Reasoning, SHOW).await, whole);
    }

    #[tokio::test]
    async fn test_split_mid_json_produces_one_event() {
        let chunks = vec![
            b"data: {\"choices\":[{\"delta\":{\"reasoning_con".to_vec(),
            b"tent\":\"x\"}}]}\n".to_vec(),
            b"\ndata: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
        ];
        let out = run_ok(chunks, StreamProfile::Reasoning, SHOW).await;

        let frames: Vec<&str> = out.split("\n\n").filter(|f| !f.is_empty()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(joined_content(&out), "<think>\nx\n</think>\n\ny");
    }

    #[tokio::test]
    async fn test_hidden_reasoning_never_leaks() {
        let bytes = UPSTREAM.as_bytes();
        for i in (1..bytes.len()).step_by(7) {
            let out = run_ok(
                vec![bytes[..i].to_vec(), bytes[i..].to_vec()],
                StreamProfile::Reasoning,
                HIDE,
            )
            .await;
            assert_eq!(joined_content(&out), "Answer done.");
            assert!(!out.contains("reasoning_content"));
            assert!(!out.contains("先想一想"));
            assert!(!out.contains("<think>"));
        }
    }

    #[tokio::test]
    async fn test_passthrough_reframes_verbatim() {
        let bytes = UPSTREAM.as_bytes();
        let out = run_ok(
            vec![bytes[..50].to_vec(), bytes[50..].to_vec()],
            StreamProfile::Passthrough,
            SHOW,
        )
        .await;
        assert_eq!(out, UPSTREAM);
    }

    #[tokio::test]
    async fn test_passthrough_hidden_scrubs_reasoning() {
        let out = run_ok(vec![UPSTREAM.as_bytes().to_vec()], StreamProfile::Passthrough, HIDE).await;
        assert!(!out.contains("reasoning_content"));
        assert_eq!(joined_content(&out), "Answer done.");
    }

    #[tokio::test]
    async fn test_crlf_lines_normalized() {
        let input = UPSTREAM.replace('\n', "\r\n");
        let out = run_ok(vec![input.into_bytes()], StreamProfile::Reasoning, SHOW).await;
        let expected = run_ok(vec![UPSTREAM.as_bytes().to_vec()], StreamProfile::Reasoning, SHOW).await;
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_dropped() {
        let chunks = vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}".to_vec(),
        ];
        let out = run_ok(chunks, StreamProfile::Reasoning, SHOW).await;
        assert_eq!(joined_content(&out), "a");
        assert!(!out.contains("[DONE]"));
    }

    #[tokio::test]
    async fn test_upstream_error_ends_stream() {
        let upstream = futures::stream::iter(vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"r\"}}]}\n\n",
            )),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ]);
        let items: Vec<_> =
            create_reasoning_sse_stream(upstream, StreamProfile::Reasoning, SHOW, "t".to_string())
                .collect()
                .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        let err = items[1].as_ref().unwrap_err();
        assert!(err.contains("reset"), "{err}");
    }

    #[tokio::test]
    async fn test_independent_streams_do_not_share_state() {
        let open_only = b"data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"r\"}}]}\n\n".to_vec();
        let content_only = b"data: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n\n".to_vec();

        let first = run_ok(vec![open_only], StreamProfile::Reasoning, SHOW).await;
        assert_eq!(joined_content(&first), "<think>\nr");

        // a fresh stream starts outside the think block
        let second = run_ok(vec![content_only], StreamProfile::Reasoning, SHOW).await;
        assert_eq!(joined_content(&second), "c");
    }
}
