//! The stateful streaming pipeline: bytes → lines → events → sink.
//!
//! [`StreamDecoder`] owns the per-call state (line buffer, accumulated text,
//! tool-call slots) and guarantees exactly one terminal event per stream.
//! [`drive`] pumps an HTTP body through a decoder into a [`StreamSink`].

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::accumulator::ToolCallAccumulator;
use crate::decode::WireFormat;
use crate::error::ProviderError;
use crate::event::StreamEvent;
use crate::sink::StreamSink;
use crate::sse::{LineReassembler, data_payload};
use crate::types::{Completion, StopReason};

/// Incremental decoder for one streaming response.
#[derive(Debug)]
pub struct StreamDecoder {
    format: WireFormat,
    lines: LineReassembler,
    tools: ToolCallAccumulator,
    text: String,
    stop_reason: Option<StopReason>,
    finished: bool,
}

impl StreamDecoder {
    /// Create a decoder for the given wire format.
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            lines: LineReassembler::new(),
            tools: ToolCallAccumulator::new(),
            text: String::new(),
            stop_reason: None,
            finished: false,
        }
    }

    /// Feed the next chunk of body bytes and return the events it completes.
    ///
    /// Returns nothing once a terminal event has been produced.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        for line in self.lines.feed(bytes) {
            self.process_line(&line, &mut out);
        }
        out
    }

    /// Signal end of body.
    ///
    /// Decodes any unterminated trailing line and, if the stream never
    /// produced a terminal event, synthesizes `Done { Normal }`.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        if let Some(line) = self.lines.flush() {
            self.process_line(&line, &mut out);
        }
        if !self.finished {
            self.apply(StreamEvent::done(StopReason::Normal), &mut out);
        }
        out
    }

    /// Whether a terminal event has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Tool-call slots accumulated so far.
    pub fn tool_calls(&self) -> &ToolCallAccumulator {
        &self.tools
    }

    /// The completion as of now: full text, tool invocations and stop reason.
    pub fn completion(&self) -> Completion {
        Completion {
            text: self.text.clone(),
            tool_calls: self.tools.invocations(),
            stop_reason: self.stop_reason.unwrap_or_default(),
        }
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<StreamEvent>) {
        if self.finished {
            return;
        }
        let Some(payload) = data_payload(line) else {
            return;
        };
        for event in self.format.decode(payload) {
            self.apply(event, out);
        }
    }

    fn apply(&mut self, event: StreamEvent, out: &mut Vec<StreamEvent>) {
        if self.finished {
            return;
        }

        match &event {
            StreamEvent::TextDelta { text } => {
                if text.is_empty() {
                    return;
                }
                self.text.push_str(text);
            }
            StreamEvent::ToolCallStart { index, id, name } => {
                if !self.tools.start(*index, id.as_str(), name.as_str()) {
                    trace!(index, "duplicate tool call start ignored");
                    return;
                }
            }
            StreamEvent::ToolCallDelta {
                index,
                arguments_fragment,
            } => {
                if !self.tools.append(*index, arguments_fragment) {
                    warn!(index, "tool call fragment without start, dropping");
                    return;
                }
            }
            StreamEvent::Done { stop_reason } => {
                self.stop_reason = Some(*stop_reason);
                self.finished = true;
            }
            StreamEvent::Error { .. } => {
                self.finished = true;
            }
        }

        out.push(event);
    }
}

/// Pump `body` through a decoder for `format` and deliver the result to
/// `sink`.
///
/// Text fragments reach the sink as they are decoded. The call ends with
/// exactly one `on_complete` or `on_error`:
/// - `Done` → `on_complete` with the accumulated completion
/// - vendor `Error` → `on_error(ProviderError::Vendor)`
/// - body read failure → `on_error` with the converted transport error
/// - `cancel` fired → `on_error(ProviderError::Cancelled)`; fragments
///   already delivered are not retracted
pub async fn drive<B, T, E>(
    body: B,
    format: WireFormat,
    sink: &mut dyn StreamSink,
    cancel: &CancellationToken,
) where
    B: Stream<Item = std::result::Result<T, E>>,
    T: AsRef<[u8]>,
    E: Into<ProviderError>,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = StreamDecoder::new(format);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                sink.on_error(ProviderError::Cancelled);
                return;
            }
            item = body.next() => item,
        };

        match next {
            Some(Ok(chunk)) => {
                for event in decoder.feed(chunk.as_ref()) {
                    deliver(&decoder, event, sink);
                }
                if decoder.is_finished() {
                    return;
                }
            }
            Some(Err(err)) => {
                sink.on_error(err.into());
                return;
            }
            None => break,
        }
    }

    for event in decoder.finish() {
        deliver(&decoder, event, sink);
    }
}

fn deliver(decoder: &StreamDecoder, event: StreamEvent, sink: &mut dyn StreamSink) {
    trace!(event = ?event, "stream event");
    match event {
        StreamEvent::TextDelta { text } => sink.on_chunk(&text),
        StreamEvent::ToolCallStart { .. } | StreamEvent::ToolCallDelta { .. } => {}
        StreamEvent::Done { .. } => sink.on_complete(decoder.completion()),
        StreamEvent::Error { message } => sink.on_error(ProviderError::Vendor(message)),
    }
}
