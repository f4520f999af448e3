//! Multi-vendor LLM streaming and provider fallback.
//!
//! This crate turns three incompatible vendor streaming protocols into one
//! event model, and runs requests across an ordered chain of providers with
//! classified failover.
//!
//! # Architecture
//!
//! - [`sse::LineReassembler`] turns arbitrary body chunks into complete lines
//! - [`decode`] holds one pure decoder per vendor grammar ([`WireFormat`])
//! - [`StreamDecoder`] accumulates text and tool calls and guarantees a
//!   single terminal event per stream
//! - [`Provider`] is the capability trait; [`providers`] holds the OpenAI,
//!   Anthropic and Gemini adapters
//! - [`ProviderRegistry`] owns configs and cached adapter instances
//! - [`FallbackExecutor`] walks the provider chain, deciding failover with
//!   [`classify::is_retryable`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchboard_llm::{load_config, ChatMessage, FallbackExecutor, ProviderRegistry};
//!
//! let registry = ProviderRegistry::from_config(load_config(None)?);
//! let executor = FallbackExecutor::from_registry(&registry)
//!     .with_observer(|t| eprintln!("{} failed, trying {}", t.from, t.to));
//!
//! let report = executor
//!     .chat_completion(&[ChatMessage::user("What is Rust?")])
//!     .await;
//! println!("{}", report.result?);
//! ```

pub mod accumulator;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod event;
pub mod failover;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod sink;
pub mod sse;
pub mod stream;
pub mod transport;
pub mod types;

pub use accumulator::ToolCallAccumulator;
pub use config::{
    FallbackConfig, ProviderConfig, ProviderKind, SwitchboardConfig, discover_config_path,
    load_config,
};
pub use decode::WireFormat;
pub use error::{ProviderError, Result};
pub use event::StreamEvent;
pub use failover::{
    ExecutionAttempt, ExecutionState, FallbackExecutor, FallbackReport, FallbackTransition,
    build_chain,
};
pub use provider::Provider;
pub use providers::{AnthropicProvider, GeminiProvider, OpenAiProvider, build_provider};
pub use registry::ProviderRegistry;
pub use sink::{ChannelSink, CollectSink, SinkMessage, StreamSink};
pub use stream::StreamDecoder;
pub use types::{ChatMessage, Completion, StopReason, ToolDefinition, ToolInvocation};

/// Re-exported so callers can cancel streams without depending on
/// `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
