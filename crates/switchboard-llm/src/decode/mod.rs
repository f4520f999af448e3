//! Wire format decoders.
//!
//! One pure function per vendor grammar turns the JSON payload of a single
//! `data:` line into normalized [`StreamEvent`]s:
//!
//! - [`openai`] — delta-object style (`choices[0].delta`), ends with `[DONE]`
//! - [`anthropic`] — typed-event style (`type` discriminator)
//! - [`gemini`] — candidate-array style (`candidates[0].content.parts`)
//!
//! Payloads that fail to parse yield no events: a physical chunk boundary
//! can split a logical event, and the missing part simply has not arrived.
//! Only errors the vendor reports inside a valid payload become
//! [`StreamEvent::Error`].

pub mod anthropic;
pub mod gemini;
pub mod openai;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::StreamEvent;

/// The streaming grammar a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// OpenAI chat-completion chunks.
    OpenAi,
    /// Anthropic Messages API events.
    Anthropic,
    /// Gemini `streamGenerateContent` candidates.
    Gemini,
}

impl WireFormat {
    /// Decode one `data:` payload with this format's grammar.
    pub fn decode(self, payload: &str) -> Vec<StreamEvent> {
        match self {
            WireFormat::OpenAi => openai::decode(payload),
            WireFormat::Anthropic => anthropic::decode(payload),
            WireFormat::Gemini => gemini::decode(payload),
        }
    }
}

/// Message text of a top-level `error` member: `{"message": ...}`, a bare
/// string, or the raw JSON as a last resort.
pub(crate) fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| error.as_str().map(String::from))
        .unwrap_or_else(|| error.to_string())
}
