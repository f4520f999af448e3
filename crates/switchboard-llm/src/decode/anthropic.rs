//! Decoder for Anthropic Messages API stream events.
//!
//! Event order for a typical response:
//! `message_start → content_block_start → content_block_delta* →
//! content_block_stop → message_delta → message_stop`.
//!
//! Each payload repeats its event name in the `type` field, so the
//! preceding `event:` line is not needed.

use serde_json::Value;

use crate::event::StreamEvent;
use crate::types::StopReason;

/// Decode one Anthropic `data:` payload.
pub fn decode(payload: &str) -> Vec<StreamEvent> {
    let Ok(json) = serde_json::from_str::<Value>(payload) else {
        return Vec::new();
    };

    let index = json.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;

    match json.get("type").and_then(Value::as_str).unwrap_or("") {
        "content_block_start" => {
            let block = &json["content_block"];
            if block.get("type").and_then(Value::as_str) != Some("tool_use") {
                return Vec::new();
            }
            let id = str_field(block, "id");
            let name = str_field(block, "name");
            vec![StreamEvent::ToolCallStart { index, id, name }]
        }

        "content_block_delta" => {
            let delta = &json["delta"];
            match delta.get("type").and_then(Value::as_str).unwrap_or("") {
                "text_delta" => {
                    let text = str_field(delta, "text");
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![StreamEvent::TextDelta { text }]
                    }
                }
                "input_json_delta" => {
                    let partial = str_field(delta, "partial_json");
                    if partial.is_empty() {
                        Vec::new()
                    } else {
                        vec![StreamEvent::ToolCallDelta {
                            index,
                            arguments_fragment: partial,
                        }]
                    }
                }
                _ => Vec::new(),
            }
        }

        "message_delta" => {
            let stop_reason = json
                .pointer("/delta/stop_reason")
                .and_then(Value::as_str)
                .map(StopReason::from_vendor)
                .unwrap_or_default();
            vec![StreamEvent::done(stop_reason)]
        }

        "message_stop" => vec![StreamEvent::done(StopReason::Normal)],

        "error" => {
            let message = json
                .pointer("/error/message")
                .and_then(Value::as_str)
                .or_else(|| json.pointer("/error/type").and_then(Value::as_str))
                .unwrap_or("unknown error")
                .to_string();
            vec![StreamEvent::Error { message }]
        }

        // message_start, content_block_stop, ping
        _ => Vec::new(),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
