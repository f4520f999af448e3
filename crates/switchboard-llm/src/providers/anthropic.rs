//! Anthropic Messages API adapter.
//!
//! Credential goes in `x-api-key`, alongside the `anthropic-version`
//! protocol header. System text travels in the top-level `system` field,
//! never as a message.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::decode::WireFormat;
use crate::error::Result;
use crate::provider::{Provider, SharedConfig, ready_api_key};
use crate::sink::StreamSink;
use crate::transport;
use crate::types::{ChatMessage, Completion, StopReason, ToolDefinition, ToolInvocation};

/// Output token limit sent when the config sets none; the API requires one.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Adapter for the Anthropic Messages API.
pub struct AnthropicProvider {
    id: String,
    config: SharedConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            id: config.id.clone(),
            config: SharedConfig::new(config),
        }
    }

    fn authorized(
        req: reqwest::RequestBuilder,
        config: &ProviderConfig,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        let version = config.kind.protocol_version().unwrap_or("2023-06-01");
        req.header("x-api-key", api_key)
            .header("anthropic-version", version)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        let config = self.config.load();
        let api_key = ready_api_key(&config)?;
        let body = MessagesBody::new(&config, messages, tools, false);

        debug!(
            provider = %self.id,
            model = %body.model,
            messages = body.messages.len(),
            tools = tools.len(),
            "sending messages request"
        );

        let url = format!("{}/messages", config.effective_base_url());
        let req = Self::authorized(transport::http_client()?.post(url), &config, &api_key);
        let req = transport::apply_config(req, &config).json(&body);
        let response: MessagesResponse = transport::send_json(req).await?;
        Ok(response.into_completion())
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
        let body = MessagesBody::new(&config, messages, tools, true);

        debug!(
            provider = %self.id,
            model = %body.model,
            messages = body.messages.len(),
            "sending streaming messages request"
        );

        let url = format!("{}/messages", config.effective_base_url());
        let http = match transport::http_client() {
            Ok(http) => http,
            Err(err) => return sink.on_error(err),
        };
        let req = Self::authorized(http.post(url), &config, &api_key)
            .header("Accept", "text/event-stream");
        let req = transport::apply_headers(req, &config).json(&body);
        transport::stream_response(req, WireFormat::Anthropic, config.timeout(), sink, cancel)
            .await;
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
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
        let req = Self::authorized(transport::http_client()?.get(url), &config, &api_key);
        let req = transport::apply_config(req, &config);

        let list: ModelList = transport::send_json(req).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    fn update_config(&self, config: ProviderConfig) {
        self.config.replace(config);
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

impl<'a> MessagesBody<'a> {
    fn new(
        config: &'a ProviderConfig,
        messages: &'a [ChatMessage],
        tools: &'a [ToolDefinition],
        stream: bool,
    ) -> Self {
        let system_parts: Vec<&str> = config
            .system_prompt
            .as_deref()
            .into_iter()
            .chain(messages.iter().filter(|m| m.is_system()).map(|m| m.content.as_str()))
            .filter(|s| !s.is_empty())
            .collect();
        let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

        let tools: Vec<WireTool<'a>> = tools
            .iter()
            .map(|t| WireTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.parameters,
            })
            .collect();
        let tool_choice = (!tools.is_empty()).then(|| serde_json::json!({"type": "auto"}));

        Self {
            model: config.effective_model(),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: messages
                .iter()
                .filter(|m| !m.is_system())
                .map(|m| WireMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
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
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn into_completion(self) -> Completion {
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in self.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolInvocation {
                    id,
                    name,
                    arguments: input.to_string(),
                }),
                ContentBlock::Other => {}
            }
        }
        Completion {
            text,
            tool_calls,
            stop_reason: self
                .stop_reason
                .as_deref()
                .map(StopReason::from_vendor)
                .unwrap_or_default(),
        }
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use serde_json::json;

    #[test]
    fn system_text_moves_to_top_level() {
        let config = ProviderConfig::new("a", ProviderKind::Anthropic)
            .with_model("claude-sonnet-4-5")
            .with_system_prompt("You are helpful.");
        let messages = [
            ChatMessage::system("Answer in French."),
            ChatMessage::user("hello"),
        ];
        let body = serde_json::to_value(MessagesBody::new(&config, &messages, &[], true)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "claude-sonnet-4-5",
                "max_tokens": 4096,
                "system": "You are helpful.\n\nAnswer in French.",
                "messages": [{"role": "user", "content": "hello"}],
                "temperature": 0.7,
                "stream": true
            })
        );
    }

    #[test]
    fn tools_use_input_schema() {
        let mut config = ProviderConfig::new("a", ProviderKind::Anthropic);
        config.max_tokens = Some(512);
        let tools = [ToolDefinition::new("search", "Web search", json!({"type": "object"}))];
        let body = serde_json::to_value(MessagesBody::new(
            &config,
            &[ChatMessage::user("q")],
            &tools,
            false,
        ))
        .unwrap();

        assert_eq!(body["max_tokens"], 512);
        assert!(body.get("system").is_none());
        assert_eq!(body["tools"][0]["name"], "search");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["tool_choice"]["type"], "auto");
    }

    #[test]
    fn response_blocks_become_completion() {
        let raw = json!({
            "id": "msg_1",
            "type": "message",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Searching."},
                {"type": "tool_use", "id": "toolu_1", "name": "search", "input": {"q": "rust"}}
            ],
            "stop_reason": "tool_use"
        });
        let completion = serde_json::from_value::<MessagesResponse>(raw)
            .unwrap()
            .into_completion();

        assert_eq!(completion.text, "Searching.");
        assert_eq!(completion.stop_reason, StopReason::ToolCalls);
        assert_eq!(completion.tool_calls[0].id, "toolu_1");
        assert_eq!(completion.tool_calls[0].arguments, r#"{"q":"rust"}"#);
    }
}
