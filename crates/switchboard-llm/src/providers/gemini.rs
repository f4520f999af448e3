//! Gemini `generateContent` adapter.
//!
//! The model and stream mode live in the URL path, and the credential goes
//! in the `key` query parameter. Tool calling is not offered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::decode::WireFormat;
use crate::error::{ProviderError, Result};
use crate::provider::{Provider, SharedConfig, ready_api_key};
use crate::sink::StreamSink;
use crate::transport;
use crate::types::ChatMessage;

/// Adapter for the Gemini API.
pub struct GeminiProvider {
    id: String,
    config: SharedConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            id: config.id.clone(),
            config: SharedConfig::new(config),
        }
    }

    fn model_url(config: &ProviderConfig, method: &str) -> String {
        let model = config.effective_model();
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", config.effective_base_url())
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn config(&self) -> Arc<ProviderConfig> {
        self.config.load()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String> {
        let config = self.config.load();
        let api_key = ready_api_key(&config)?;
        let body = GenerateBody::new(&config, messages);

        debug!(
            provider = %self.id,
            model = %config.effective_model(),
            contents = body.contents.len(),
            "sending generateContent request"
        );

        let req = transport::http_client()?
            .post(Self::model_url(&config, "generateContent"))
            .query(&[("key", api_key.as_str())]);
        let req = transport::apply_config(req, &config).json(&body);

        let response: GenerateResponse = transport::send_json(req).await?;
        response.text().ok_or_else(|| {
            ProviderError::InvalidResponse("response has no candidates".into())
        })
    }

    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) {
        let config = self.config.load();
        let api_key = match ready_api_key(&config) {
            Ok(key) => key,
            Err(err) => return sink.on_error(err),
        };
        let body = GenerateBody::new(&config, messages);

        debug!(
            provider = %self.id,
            model = %config.effective_model(),
            contents = body.contents.len(),
            "sending streamGenerateContent request"
        );

        let http = match transport::http_client() {
            Ok(http) => http,
            Err(err) => return sink.on_error(err),
        };
        let req = http
            .post(Self::model_url(&config, "streamGenerateContent"))
            .query(&[("alt", "sse"), ("key", api_key.as_str())]);
        let req = transport::apply_headers(req, &config).json(&body);
        transport::stream_response(req, WireFormat::Gemini, config.timeout(), sink, cancel)
            .await;
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let config = self.config.load();
        let api_key = ready_api_key(&config)?;
        let url = format!("{}/models", config.effective_base_url());
        let req = transport::http_client()?.get(url).query(&[("key", api_key.as_str())]);
        let req = transport::apply_config(req, &config);

        let list: ModelList = transport::send_json(req).await?;
        Ok(list
            .models
            .into_iter()
            .map(|m| match m.name.strip_prefix("models/") {
                Some(short) => short.to_string(),
                None => m.name,
            })
            .collect())
    }

    fn update_config(&self, config: ProviderConfig) {
        self.config.replace(config);
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
}

impl<'a> GenerateBody<'a> {
    fn new(config: &ProviderConfig, messages: &'a [ChatMessage]) -> Self {
        let system_parts: Vec<&str> = config
            .system_prompt
            .as_deref()
            .into_iter()
            .chain(messages.iter().filter(|m| m.is_system()).map(|m| m.content.as_str()))
            .filter(|s| !s.is_empty())
            .collect();
        let system_instruction = (!system_parts.is_empty()).then(|| SystemInstruction {
            parts: vec![OwnedPart {
                text: system_parts.join("\n\n"),
            }],
        });

        let contents = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| Content {
                role: if m.role == "assistant" { "model" } else { "user" },
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        Self {
            contents,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
            system_instruction,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct OwnedPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<OwnedPart>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        Some(
            candidate
                .content
                .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
                .unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}
