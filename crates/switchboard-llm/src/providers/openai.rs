//! OpenAI chat-completions adapter.
//!
//! Works against `api.openai.com` and any endpoint that speaks the same
//! protocol (set `baseUrl`). Credential goes in `Authorization: Bearer`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::decode::WireFormat;
use crate::error::{ProviderError, Result};
use crate::provider::{Provider, SharedConfig, ready_api_key};
use crate::sink::StreamSink;
use crate::transport;
use crate::types::{ChatMessage, Completion, StopReason, ToolDefinition, ToolInvocation};

/// Adapter for OpenAI-compatible endpoints.
pub struct OpenAiProvider {
    id: String,
    config: SharedConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            id: config.id.clone(),
            config: SharedConfig::new(config),
        }
    }

    fn request(
        &self,
        config: &ProviderConfig,
        api_key: &str,
        body: &ChatBody<'_>,
    ) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}/chat/completions", config.effective_base_url());
        let req = transport::http_client()?
            .post(url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json");
        // Streams carry no total deadline; see `transport::stream_response`.
        let req = if body.stream {
            transport::apply_headers(req.header("Accept", "text/event-stream"), config)
        } else {
            transport::apply_config(req, config)
        };
        Ok(req.json(body))
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        let config = self.config.load();
        let api_key = ready_api_key(&config)?;
        let body = ChatBody::new(&config, messages, tools, false);

        debug!(
            provider = %self.id,
            model = %body.model,
            messages = body.messages.len(),
            tools = tools.len(),
            "sending chat completion request"
        );

        let response: ChatResponse =
            transport::send_json(self.request(&config, &api_key, &body)?).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolInvocation {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason: choice
                .finish_reason
                .as_deref()
                .map(StopReason::from_vendor)
                .unwrap_or_default(),
        })
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) {
        let config = self.config.load();
        let api_key = match ready_api_key(&config) {
            Ok(key) => key,
            Err(err) => return sink.on_error(err),
        };
        let body = ChatBody::new(&config, messages, tools, true);

        debug!(
            provider = %self.id,
            model = %body.model,
            messages = body.messages.len(),
            "sending streaming chat completion request"
        );

        let req = match self.request(&config, &api_key, &body) {
            Ok(req) => req,
            Err(err) => return sink.on_error(err),
        };
        transport::stream_response(req, WireFormat::OpenAi, config.timeout(), sink, cancel)
            .await;
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn config(&self) -> Arc<ProviderConfig> {
        self.config.load()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(self.complete(messages, &[]).await?.text)
    }

    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) {
        self.stream(messages, &[], sink, cancel).await;
    }

    async fn chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        self.complete(messages, tools).await
    }

    async fn stream_chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) {
        self.stream(messages, tools, sink, cancel).await;
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let config = self.config.load();
        let api_key = ready_api_key(&config)?;
        let url = format!("{}/models", config.effective_base_url());
        let req = transport::apply_config(
            transport::http_client()?.get(url).bearer_auth(api_key),
            &config,
        );

        let list: ModelList = transport::send_json(req).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    fn update_config(&self, config: ProviderConfig) {
        self.config.replace(config);
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> ChatBody<'a> {
    fn new(
        config: &'a ProviderConfig,
        messages: &'a [ChatMessage],
        tools: &'a [ToolDefinition],
        stream: bool,
    ) -> Self {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if let Some(prompt) = config.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            wire.push(WireMessage {
                role: "system",
                content: prompt,
            });
        }
        wire.extend(messages.iter().map(|m| WireMessage {
            role: &m.role,
            content: &m.content,
        }));

        let tools: Vec<WireTool<'a>> = tools
            .iter()
            .map(|t| WireTool {
                kind: "function",
                function: WireFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");

        Self {
            model: config.effective_model(),
            messages: wire,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream,
            tools,
            tool_choice,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
