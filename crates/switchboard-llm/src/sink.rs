//! Delivery targets for streaming completions.
//!
//! A [`StreamSink`] receives zero or more [`on_chunk`](StreamSink::on_chunk)
//! calls followed by exactly one of [`on_complete`](StreamSink::on_complete)
//! or [`on_error`](StreamSink::on_error). Nothing is delivered after the
//! terminal call.

use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::types::Completion;

/// Receiver of streamed output.
pub trait StreamSink: Send {
    /// An incremental text fragment.
    fn on_chunk(&mut self, text: &str);

    /// The stream finished; `completion` holds the full text and any tool
    /// invocations.
    fn on_complete(&mut self, completion: Completion);

    /// The stream failed. Fragments already delivered stay delivered.
    fn on_error(&mut self, error: ProviderError);
}

/// A sink that buffers everything it receives.
#[derive(Debug, Default)]
pub struct CollectSink {
    /// Fragments in arrival order.
    pub chunks: Vec<String>,
    /// The completion, once delivered.
    pub completion: Option<Completion>,
    /// The error, once delivered.
    pub error: Option<ProviderError>,
}

impl CollectSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal callback has been received.
    pub fn is_finished(&self) -> bool {
        self.completion.is_some() || self.error.is_some()
    }

    /// Convert into the terminal outcome.
    ///
    /// A stream that never reached a terminal callback is reported as
    /// [`ProviderError::InvalidResponse`].
    pub fn into_result(self) -> crate::Result<Completion> {
        match (self.completion, self.error) {
            (_, Some(err)) => Err(err),
            (Some(completion), None) => Ok(completion),
            (None, None) => Err(ProviderError::InvalidResponse(
                "stream ended without a terminal event".into(),
            )),
        }
    }
}

impl StreamSink for CollectSink {
    fn on_chunk(&mut self, text: &str) {
        self.chunks.push(text.to_owned());
    }

    fn on_complete(&mut self, completion: Completion) {
        self.completion = Some(completion);
    }

    fn on_error(&mut self, error: ProviderError) {
        self.error = Some(error);
    }
}

/// A message forwarded by [`ChannelSink`].
#[derive(Debug)]
pub enum SinkMessage {
    /// An incremental text fragment.
    Chunk(String),
    /// The stream finished.
    Complete(Completion),
    /// The stream failed.
    Error(ProviderError),
}

/// A sink that forwards every callback over a tokio channel, so the stream
/// can be consumed from another task.
///
/// A dropped receiver is not an error; remaining callbacks are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver paired with it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StreamSink for ChannelSink {
    fn on_chunk(&mut self, text: &str) {
        let _ = self.tx.send(SinkMessage::Chunk(text.to_owned()));
    }

    fn on_complete(&mut self, completion: Completion) {
        let _ = self.tx.send(SinkMessage::Complete(completion));
    }

    fn on_error(&mut self, error: ProviderError) {
        let _ = self.tx.send(SinkMessage::Error(error));
    }
}
