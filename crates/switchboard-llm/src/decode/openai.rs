//! Decoder for OpenAI-style chat-completion chunks.
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}
//!
//! data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"f","arguments":""}}]}}]}
//!
//! data: {"choices":[{"delta":{},"finish_reason":"stop"}]}
//!
//! data: [DONE]
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::event::StreamEvent;
use crate::types::StopReason;

/// The sentinel value that marks the end of an OpenAI stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A `chat.completion.chunk` payload.
#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    /// Set instead of `choices` when the server aborts the stream.
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Decode one OpenAI `data:` payload.
///
/// A single chunk can carry a text fragment, tool-call fragments and a
/// finish reason at once; they are emitted in that order.
pub fn decode(payload: &str) -> Vec<StreamEvent> {
    if payload == DONE_SENTINEL {
        return vec![StreamEvent::done(StopReason::Normal)];
    }

    let Ok(chunk) = serde_json::from_str::<Chunk>(payload) else {
        return Vec::new();
    };
    if let Some(error) = chunk.error {
        return vec![StreamEvent::Error {
            message: super::error_message(&error),
        }];
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut events = Vec::new();

    if let Some(text) = choice.delta.content
        && !text.is_empty()
    {
        events.push(StreamEvent::TextDelta { text });
    }

    for call in choice.delta.tool_calls.unwrap_or_default() {
        let function = call.function.unwrap_or_default();

        // id + name marks the start of a call; everything after carries
        // only argument text.
        if let (Some(id), Some(name)) = (call.id, function.name) {
            events.push(StreamEvent::ToolCallStart {
                index: call.index,
                id,
                name,
            });
        }

        if let Some(arguments) = function.arguments
            && !arguments.is_empty()
        {
            events.push(StreamEvent::ToolCallDelta {
                index: call.index,
                arguments_fragment: arguments,
            });
        }
    }

    if let Some(reason) = choice.finish_reason {
        events.push(StreamEvent::done(StopReason::from_vendor(&reason)));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_sentinel() {
        assert_eq!(
            decode("[DONE]"),
            vec![StreamEvent::done(StopReason::Normal)]
        );
    }

    #[test]
    fn mid_stream_error_object() {
        let payload = r#"{"error":{"message":"Rate limit reached for gpt-4o","type":"requests","code":"rate_limit_exceeded"}}"#;
        assert_eq!(
            decode(payload),
            vec![StreamEvent::Error {
                message: "Rate limit reached for gpt-4o".into()
            }]
        );
    }

    #[test]
    fn null_error_is_ignored() {
        let payload = r#"{"choices":[{"delta":{"content":"ok"}}],"error":null}"#;
        assert_eq!(decode(payload), vec![StreamEvent::text("ok")]);
    }

    #[test]
    fn text_delta() {
        let payload = r#"{"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(decode(payload), vec![StreamEvent::text("Hello")]);
    }

    #[test]
    fn empty_content_skipped() {
        let payload = r#"{"choices":[{"index":0,"delta":{"content":""},"finish_reason":null}]}"#;
        assert!(decode(payload).is_empty());
    }

    #[test]
    fn role_only_delta_no_events() {
        let payload = r#"{"choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        assert!(decode(payload).is_empty());
    }

    #[test]
    fn tool_call_start_with_empty_arguments() {
        let payload = r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_abc","type":"function","function":{"name":"get_weather","arguments":""}}]},"finish_reason":null}]}"#;
        assert_eq!(
            decode(payload),
            vec![StreamEvent::ToolCallStart {
                index: 0,
                id: "call_abc".into(),
                name: "get_weather".into(),
            }]
        );
    }

    #[test]
    fn tool_call_start_with_inline_arguments() {
        let payload = r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_2","function":{"name":"f","arguments":"{}"}}]}}]}"#;
        assert_eq!(
            decode(payload),
            vec![
                StreamEvent::ToolCallStart {
                    index: 1,
                    id: "call_2".into(),
                    name: "f".into(),
                },
                StreamEvent::ToolCallDelta {
                    index: 1,
                    arguments_fragment: "{}".into(),
                },
            ]
        );
    }

    #[test]
    fn tool_call_continuation() {
        let payload = r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\""}}]},"finish_reason":null}]}"#;
        assert_eq!(
            decode(payload),
            vec![StreamEvent::ToolCallDelta {
                index: 0,
                arguments_fragment: "{\"city\"".into(),
            }]
        );
    }

    #[test]
    fn finish_reasons() {
        let stop = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        let tools = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#;
        let length = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"length"}]}"#;
        assert_eq!(decode(stop), vec![StreamEvent::done(StopReason::Normal)]);
        assert_eq!(decode(tools), vec![StreamEvent::done(StopReason::ToolCalls)]);
        assert_eq!(decode(length), vec![StreamEvent::done(StopReason::MaxTokens)]);
    }

    #[test]
    fn text_and_finish_in_same_chunk() {
        let payload = r#"{"choices":[{"index":0,"delta":{"content":"!"},"finish_reason":"stop"}]}"#;
        assert_eq!(
            decode(payload),
            vec![
                StreamEvent::text("!"),
                StreamEvent::done(StopReason::Normal)
            ]
        );
    }

    #[test]
    fn truncated_json_is_swallowed() {
        assert!(decode(r#"{"choices":[{"delta":{"content":"Hel"#).is_empty());
        assert!(decode("{not valid json}").is_empty());
    }

    #[test]
    fn no_choices() {
        assert!(decode(r#"{"id":"chatcmpl-1","choices":[]}"#).is_empty());
    }

    #[test]
    fn usage_only_chunk() {
        let payload = r#"{"choices":[],"usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#;
        assert!(decode(payload).is_empty());
    }
}
