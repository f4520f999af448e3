//! Request and result types shared by every provider adapter.
//!
//! These are vendor-neutral: each adapter converts them into its own wire
//! shape when building a request.

use serde::{Deserialize, Serialize};

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author ("system", "user", "assistant").
    pub role: String,

    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a simple message with role and content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Whether this is a system message.
    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// A function the model may call, described by a JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Function name.
    pub name: String,

    /// Human-readable description shown to the model.
    #[serde(default)]
    pub description: String,

    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A complete tool invocation requested by the model.
///
/// `arguments` is the raw serialized argument text (usually JSON), exactly
/// as the vendor produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Vendor-assigned call identifier.
    pub id: String,
    /// Name of the function to invoke.
    pub name: String,
    /// Serialized arguments.
    pub arguments: String,
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the response.
    #[default]
    Normal,
    /// The model is waiting for tool results.
    ToolCalls,
    /// The output token limit was reached.
    MaxTokens,
}

impl StopReason {
    /// Map a vendor finish/stop reason onto the normalized set.
    ///
    /// Covers the OpenAI (`stop`, `tool_calls`, `length`), Anthropic
    /// (`end_turn`, `tool_use`, `max_tokens`) and Gemini (`STOP`,
    /// `MAX_TOKENS`) vocabularies. Unknown values map to [`StopReason::Normal`].
    pub fn from_vendor(reason: &str) -> Self {
        match reason.to_ascii_lowercase().as_str() {
            "tool_calls" | "tool_use" | "function_call" => StopReason::ToolCalls,
            "length" | "max_tokens" => StopReason::MaxTokens,
            _ => StopReason::Normal,
        }
    }
}

/// The final result of a completion call, streaming or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Full generated text.
    pub text: String,
    /// Completed tool invocations, ordered by position.
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    /// Why generation stopped.
    pub stop_reason: StopReason,
}
