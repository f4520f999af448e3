//! Provider fallback: run an operation across an ordered chain of providers.
//!
//! [`build_chain`] derives the chain from a [`ProviderRegistry`]: the active
//! provider first, then the explicit fallback ranking (or, without one, every
//! other provider in registration order). Only ready providers are included.
//!
//! [`FallbackExecutor`] walks the chain. A retryable failure moves to the
//! next provider; a fatal failure stops immediately. `max_retries` caps the
//! total number of attempts, counting the first.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::is_retryable;
use crate::config::DEFAULT_MAX_RETRIES;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::registry::ProviderRegistry;
use crate::sink::StreamSink;
use crate::types::{ChatMessage, Completion, ToolDefinition};

/// Where an execution ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// No attempt was made.
    NotStarted,
    /// An attempt succeeded.
    Succeeded,
    /// A non-retryable failure stopped the chain.
    FailedFatal,
    /// The chain or the attempt budget ran out.
    Exhausted,
}

/// One entry of the attempt log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionAttempt {
    pub provider_id: String,
    /// 1-based position in the execution.
    pub attempt_number: u32,
    pub success: bool,
    pub error: Option<String>,
}

/// A switch from one provider to the next after a retryable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTransition {
    pub from: String,
    pub to: String,
    pub error: String,
}

/// Outcome of [`FallbackExecutor::execute_detailed`].
#[derive(Debug)]
pub struct FallbackReport<T> {
    pub result: Result<T>,
    pub attempts: Vec<ExecutionAttempt>,
    pub state: ExecutionState,
}

impl<T> FallbackReport<T> {
    fn new(result: Result<T>, attempts: Vec<ExecutionAttempt>, state: ExecutionState) -> Self {
        Self {
            result,
            attempts,
            state,
        }
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Callback invoked on every fallback transition.
pub type TransitionObserver = Arc<dyn Fn(&FallbackTransition) + Send + Sync>;

/// Derive the fallback chain from a registry.
///
/// Order: the active provider (if ready), then the explicit fallback ranking
/// or, when the ranking is empty, every registered provider in registration
/// order. Providers that are not ready, unknown ids and duplicates are
/// dropped.
pub fn build_chain(registry: &ProviderRegistry) -> Vec<Arc<dyn Provider>> {
    let mut ids: Vec<&str> = Vec::new();

    if let Some(active) = registry.active_id()
        && registry.is_ready(active)
    {
        ids.push(active);
    }

    let ranking: Vec<&str> = if registry.fallback().fallback_provider_ids.is_empty() {
        registry.ids().collect()
    } else {
        registry
            .fallback()
            .fallback_provider_ids
            .iter()
            .map(String::as_str)
            .collect()
    };

    for id in ranking {
        if !ids.contains(&id) && registry.is_ready(id) {
            ids.push(id);
        }
    }

    ids.into_iter().filter_map(|id| registry.get(id)).collect()
}

/// Runs operations across a provider chain.
pub struct FallbackExecutor {
    chain: Vec<Arc<dyn Provider>>,
    max_retries: u32,
    observer: Option<TransitionObserver>,
    cancel: CancellationToken,
}

impl FallbackExecutor {
    /// Create an executor over an explicit chain.
    ///
    /// A `max_retries` of zero is treated as one attempt.
    pub fn new(chain: Vec<Arc<dyn Provider>>, max_retries: u32) -> Self {
        Self {
            chain,
            max_retries: max_retries.max(1),
            observer: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Create an executor using [`build_chain`] and the registry's
    /// fallback config.
    pub fn from_registry(registry: &ProviderRegistry) -> Self {
        Self::new(build_chain(registry), registry.fallback().max_retries)
    }

    /// Register a callback for fallback transitions.
    pub fn with_observer(mut self, observer: impl Fn(&FallbackTransition) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Use `cancel` to stop the execution between attempts.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Provider ids in chain order.
    pub fn chain_ids(&self) -> Vec<&str> {
        self.chain.iter().map(|p| p.id()).collect()
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` and return only its result.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_detailed(operation).await.result
    }

    /// Run `operation` against each provider in turn until one succeeds, a
    /// failure is fatal, or the attempt budget is spent.
    ///
    /// Providers that are not ready are skipped without consuming an
    /// attempt.
    pub async fn execute_detailed<T, F, Fut>(&self, mut operation: F) -> FallbackReport<T>
    where
        F: FnMut(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = Vec::new();
        let mut last_error = None;

        if self.chain.is_empty() {
            return FallbackReport::new(
                Err(ProviderError::NoProviders),
                attempts,
                ExecutionState::NotStarted,
            );
        }

        for (index, provider) in self.chain.iter().enumerate() {
            if attempts.len() as u32 >= self.max_retries {
                break;
            }
            if self.cancel.is_cancelled() {
                return FallbackReport::new(
                    Err(ProviderError::Cancelled),
                    attempts,
                    ExecutionState::FailedFatal,
                );
            }
            if !provider.is_ready() {
                debug!(provider = %provider.id(), "skipping provider that is not ready");
                continue;
            }

            let attempt_number = attempts.len() as u32 + 1;
            debug!(provider = %provider.id(), attempt = attempt_number, "trying provider");

            match operation(Arc::clone(provider)).await {
                Ok(value) => {
                    attempts.push(ExecutionAttempt {
                        provider_id: provider.id().to_string(),
                        attempt_number,
                        success: true,
                        error: None,
                    });
                    return FallbackReport::new(Ok(value), attempts, ExecutionState::Succeeded);
                }
                Err(err) => {
                    attempts.push(ExecutionAttempt {
                        provider_id: provider.id().to_string(),
                        attempt_number,
                        success: false,
                        error: Some(err.to_string()),
                    });

                    if !is_retryable(&err) {
                        warn!(
                            provider = %provider.id(),
                            attempt = attempt_number,
                            error = %err,
                            "provider failed with non-retryable error"
                        );
                        return FallbackReport::new(Err(err), attempts, ExecutionState::FailedFatal);
                    }

                    if attempt_number < self.max_retries {
                        self.notify_next(index, provider.id(), &err);
                    }
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.unwrap_or(ProviderError::NoProviders);
        warn!(attempts = attempts.len(), error = %err, "fallback chain exhausted");
        FallbackReport::new(Err(err), attempts, ExecutionState::Exhausted)
    }

    /// Non-streaming completion across the chain.
    pub async fn chat_completion(&self, messages: &[ChatMessage]) -> FallbackReport<String> {
        self.execute_detailed(|provider| async move { provider.chat_completion(messages).await })
            .await
    }

    /// Non-streaming completion with tools across the chain.
    pub async fn chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> FallbackReport<Completion> {
        self.execute_detailed(|provider| async move {
            provider.chat_completion_with_tools(messages, tools).await
        })
        .await
    }

    /// Streaming completion across the chain.
    ///
    /// A failed attempt may fail over only while nothing has been delivered
    /// to `sink`. Once a fragment has reached the caller, the error is
    /// delivered instead. The sink always sees exactly one terminal
    /// callback.
    pub async fn stream(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        sink: &mut dyn StreamSink,
    ) -> FallbackReport<()> {
        let mut attempts = Vec::new();
        let mut last_error = None;

        if self.chain.is_empty() {
            sink.on_error(ProviderError::NoProviders);
            return FallbackReport::new(
                Err(ProviderError::NoProviders),
                attempts,
                ExecutionState::NotStarted,
            );
        }

        for (index, provider) in self.chain.iter().enumerate() {
            if attempts.len() as u32 >= self.max_retries {
                break;
            }
            if self.cancel.is_cancelled() {
                sink.on_error(ProviderError::Cancelled);
                return FallbackReport::new(
                    Err(ProviderError::Cancelled),
                    attempts,
                    ExecutionState::FailedFatal,
                );
            }
            if !provider.is_ready() {
                debug!(provider = %provider.id(), "skipping provider that is not ready");
                continue;
            }

            let attempt_number = attempts.len() as u32 + 1;
            debug!(provider = %provider.id(), attempt = attempt_number, "trying provider (streaming)");

            let mut guard = GuardSink::new(sink);
            match tools {
                Some(tools) => {
                    provider
                        .stream_chat_completion_with_tools(messages, tools, &mut guard, &self.cancel)
                        .await
                }
                None => {
                    provider
                        .stream_chat_completion(messages, &mut guard, &self.cancel)
                        .await
                }
            }
            let delivered = guard.delivered;
            let outcome = guard.outcome.take().unwrap_or_else(|| {
                Err(ProviderError::InvalidResponse(
                    "stream ended without a terminal callback".into(),
                ))
            });

            match outcome {
                Ok(completion) => {
                    sink.on_complete(completion);
                    attempts.push(ExecutionAttempt {
                        provider_id: provider.id().to_string(),
                        attempt_number,
                        success: true,
                        error: None,
                    });
                    return FallbackReport::new(Ok(()), attempts, ExecutionState::Succeeded);
                }
                Err(err) => {
                    attempts.push(ExecutionAttempt {
                        provider_id: provider.id().to_string(),
                        attempt_number,
                        success: false,
                        error: Some(err.to_string()),
                    });

                    if delivered || !is_retryable(&err) {
                        warn!(
                            provider = %provider.id(),
                            attempt = attempt_number,
                            delivered,
                            error = %err,
                            "streaming attempt failed, not failing over"
                        );
                        sink.on_error(err.replicate());
                        return FallbackReport::new(Err(err), attempts, ExecutionState::FailedFatal);
                    }

                    if attempt_number < self.max_retries {
                        self.notify_next(index, provider.id(), &err);
                    }
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.unwrap_or(ProviderError::NoProviders);
        warn!(attempts = attempts.len(), error = %err, "fallback chain exhausted");
        sink.on_error(err.replicate());
        FallbackReport::new(Err(err), attempts, ExecutionState::Exhausted)
    }

    /// Announce the move from `from` to the next ready provider after
    /// `index`, if there is one.
    fn notify_next(&self, index: usize, from: &str, err: &ProviderError) {
        let Some(next) = self.chain[index + 1..].iter().find(|p| p.is_ready()) else {
            return;
        };
        let transition = FallbackTransition {
            from: from.to_string(),
            to: next.id().to_string(),
            error: err.to_string(),
        };
        warn!(
            from = %transition.from,
            to = %transition.to,
            error = %transition.error,
            "provider failed, falling back"
        );
        if let Some(observer) = &self.observer {
            observer(&transition);
        }
    }
}

impl fmt::Debug for FallbackExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("chain", &self.chain_ids())
            .field("max_retries", &self.max_retries)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for FallbackExecutor {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_MAX_RETRIES)
    }
}

/// Forwards fragments to the caller's sink but holds back the terminal
/// callback, so the executor can decide whether to fail over.
struct GuardSink<'a> {
    inner: &'a mut dyn StreamSink,
    delivered: bool,
    outcome: Option<Result<Completion>>,
}

impl<'a> GuardSink<'a> {
    fn new(inner: &'a mut dyn StreamSink) -> Self {
        Self {
            inner,
            delivered: false,
            outcome: None,
        }
    }
}

impl StreamSink for GuardSink<'_> {
    fn on_chunk(&mut self, text: &str) {
        if self.outcome.is_some() {
            return;
        }
        self.delivered = true;
        self.inner.on_chunk(text);
    }

    fn on_complete(&mut self, completion: Completion) {
        if self.outcome.is_none() {
            self.outcome = Some(Ok(completion));
        }
    }

    fn on_error(&mut self, error: ProviderError) {
        if self.outcome.is_none() {
            self.outcome = Some(Err(error));
        }
    }
}
