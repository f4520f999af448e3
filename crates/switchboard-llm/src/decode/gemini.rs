//! Decoder for Gemini `streamGenerateContent?alt=sse` payloads.
//!
//! Gemini has no end sentinel; the stream ends when the body closes. Each
//! payload is a full `GenerateContentResponse` holding the next slice of
//! text:
//!
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"Hel"}],"role":"model"}}]}
//! ```

use serde_json::Value;

use crate::event::StreamEvent;
use crate::types::StopReason;

/// Decode one Gemini `data:` payload.
///
/// A `finishReason` on the first candidate closes the stream after any text
/// carried by the same payload.
pub fn decode(payload: &str) -> Vec<StreamEvent> {
    let Ok(json) = serde_json::from_str::<Value>(payload) else {
        return Vec::new();
    };

    if let Some(error) = json.get("error") {
        return vec![StreamEvent::Error {
            message: super::error_message(error),
        }];
    }

    let Some(candidate) = json.pointer("/candidates/0") else {
        return Vec::new();
    };

    let mut events = Vec::new();

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if !text.is_empty() {
        events.push(StreamEvent::TextDelta { text });
    }

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
        events.push(StreamEvent::done(StopReason::from_vendor(reason)));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_part() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"},"index":0}]}"#;
        assert_eq!(decode(payload), vec![StreamEvent::text("Hello")]);
    }

    #[test]
    fn multiple_parts_concatenated() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#;
        assert_eq!(decode(payload), vec![StreamEvent::text("ab")]);
    }

    #[test]
    fn finish_reason_after_text() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"."}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3}}"#;
        assert_eq!(
            decode(payload),
            vec![
                StreamEvent::text("."),
                StreamEvent::done(StopReason::Normal)
            ]
        );
    }

    #[test]
    fn max_tokens_finish() {
        let payload = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        assert_eq!(
            decode(payload),
            vec![StreamEvent::done(StopReason::MaxTokens)]
        );
    }

    #[test]
    fn top_level_error() {
        let payload = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            decode(payload),
            vec![StreamEvent::Error {
                message: "Resource has been exhausted".into()
            }]
        );
    }

    #[test]
    fn usage_only_payload() {
        assert!(decode(r#"{"usageMetadata":{"totalTokenCount":9}}"#).is_empty());
    }

    #[test]
    fn invalid_json_swallowed() {
        assert!(decode(r#"{"candidates":[{"content":{"pa"#).is_empty());
    }
}
