//! Vendor adapters implementing [`Provider`].

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderKind};
use crate::provider::Provider;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Construct the adapter matching `config.kind`.
pub fn build_provider(config: ProviderConfig) -> Arc<dyn Provider> {
    match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config)),
    }
}
