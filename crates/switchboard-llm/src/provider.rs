//! The [`Provider`] capability trait.
//!
//! Every vendor adapter implements this trait. Adapters differ only in the
//! request payload they build, where the credential goes, and which
//! [`WireFormat`](crate::decode::WireFormat) decodes their stream.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::sink::StreamSink;
use crate::types::{ChatMessage, Completion, ToolDefinition};

/// A chat model endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use switchboard_llm::{ChatMessage, CollectSink, Provider};
/// use tokio_util::sync::CancellationToken;
///
/// async fn ask(provider: &dyn Provider) -> switchboard_llm::Result<String> {
///     let messages = [ChatMessage::user("What is 2+2?")];
///     let mut sink = CollectSink::new();
///     provider
///         .stream_chat_completion(&messages, &mut sink, &CancellationToken::new())
///         .await;
///     Ok(sink.into_result()?.text)
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier from the config.
    fn id(&self) -> &str;

    /// Snapshot of the current configuration.
    fn config(&self) -> Arc<ProviderConfig>;

    /// Whether the provider can run: enabled, with a credential and a base
    /// endpoint. Never touches the network.
    fn is_ready(&self) -> bool {
        self.config().is_ready()
    }

    /// Run a non-streaming completion and return the response text.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotReady`] without a network call when the provider
    /// is not ready; [`ProviderError::HttpStatus`] with the response body on
    /// a non-2xx status.
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Run a streaming completion.
    ///
    /// Text fragments go to [`StreamSink::on_chunk`] as they arrive,
    /// followed by exactly one [`StreamSink::on_complete`] (with the full
    /// accumulated text) or [`StreamSink::on_error`].
    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    );

    /// Run a non-streaming completion with tools available to the model.
    async fn chat_completion_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<Completion> {
        Err(ProviderError::Unsupported(format!(
            "{} does not support tool calling",
            self.id()
        )))
    }

    /// Streaming variant of
    /// [`chat_completion_with_tools`](Provider::chat_completion_with_tools).
    /// Completed invocations arrive with the completion.
    async fn stream_chat_completion_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        sink: &mut dyn StreamSink,
        _cancel: &CancellationToken,
    ) {
        sink.on_error(ProviderError::Unsupported(format!(
            "{} does not support tool calling",
            self.id()
        )));
    }

    /// Ask the vendor for its model list.
    async fn list_models(&self) -> Result<Vec<String>> {
        Err(ProviderError::Unsupported(format!(
            "{} does not list models",
            self.id()
        )))
    }

    /// Live model list, falling back to the configured static list.
    async fn available_models(&self) -> Vec<String> {
        if self.is_ready()
            && let Ok(models) = self.list_models().await
            && !models.is_empty()
        {
            return models;
        }
        self.config().static_models()
    }

    /// Check that the endpoint answers with the configured credential.
    async fn test_connection(&self) -> bool {
        self.is_ready() && self.list_models().await.is_ok()
    }

    /// Replace the held configuration snapshot.
    fn update_config(&self, config: ProviderConfig);
}

/// Config snapshot holder for adapters.
///
/// Readers get an `Arc` to the current snapshot. Updates swap the whole
/// snapshot; a request already in flight keeps the one it started with.
#[derive(Debug)]
pub struct SharedConfig {
    inner: RwLock<Arc<ProviderConfig>>,
}

impl SharedConfig {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<ProviderConfig> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new snapshot.
    pub fn replace(&self, config: ProviderConfig) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }
}

/// Resolve the credential of a ready config, or explain why it is not ready.
pub(crate) fn ready_api_key(config: &ProviderConfig) -> Result<String> {
    if let Some(reason) = config.not_ready_reason() {
        return Err(ProviderError::NotReady(reason));
    }
    config
        .resolve_api_key()
        .ok_or_else(|| ProviderError::NotReady(format!("{}: no API key", config.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn shared_config_swaps_snapshot() {
        let shared = SharedConfig::new(ProviderConfig::new("a", ProviderKind::OpenAi));
        let before = shared.load();
        shared.replace(ProviderConfig::new("a", ProviderKind::OpenAi).with_model("gpt-4.1"));

        assert_eq!(before.model, "");
        assert_eq!(shared.load().model, "gpt-4.1");
    }

    #[test]
    fn ready_api_key_requires_ready_config() {
        let cfg = ProviderConfig::new("a", ProviderKind::Anthropic);
        assert!(matches!(ready_api_key(&cfg), Err(ProviderError::NotReady(_))));

        let cfg = cfg.with_api_key("k");
        assert_eq!(ready_api_key(&cfg).unwrap(), "k");
    }
}
