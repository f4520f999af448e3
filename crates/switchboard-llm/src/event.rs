//! The unified streaming event model.
//!
//! Every wire format decoder produces [`StreamEvent`] values. A stream is a
//! sequence of text and tool-call events closed by exactly one terminal
//! event ([`StreamEvent::Done`] or [`StreamEvent::Error`]).

use crate::types::StopReason;

/// A single normalized event from a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental content fragment.
    TextDelta {
        /// The partial text.
        text: String,
    },

    /// Declares a new tool invocation at position `index`.
    ToolCallStart {
        /// Position of the invocation within the response.
        index: usize,
        /// Vendor-assigned call identifier.
        id: String,
        /// Function name.
        name: String,
    },

    /// Appends to the argument text accumulating at `index`.
    ToolCallDelta {
        /// Position of the invocation within the response.
        index: usize,
        /// Next fragment of the serialized arguments.
        arguments_fragment: String,
    },

    /// The stream completed.
    Done {
        /// Why generation stopped.
        stop_reason: StopReason,
    },

    /// The vendor reported a failure inside the stream.
    Error {
        /// Vendor error message.
        message: String,
    },
}

impl StreamEvent {
    /// Shorthand for a text delta.
    pub fn text(text: impl Into<String>) -> Self {
        StreamEvent::TextDelta { text: text.into() }
    }

    /// Shorthand for a `Done` event.
    pub fn done(stop_reason: StopReason) -> Self {
        StreamEvent::Done { stop_reason }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::done(StopReason::Normal).is_terminal());
        assert!(
            StreamEvent::Error {
                message: "boom".into()
            }
            .is_terminal()
        );
        assert!(!StreamEvent::text("hi").is_terminal());
        assert!(
            !StreamEvent::ToolCallDelta {
                index: 0,
                arguments_fragment: "{".into()
            }
            .is_terminal()
        );
    }
}
