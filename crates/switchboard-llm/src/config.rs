//! Provider and fallback configuration.
//!
//! Configuration is plain serde data, camelCase on disk:
//!
//! ```json
//! {
//!   "activeProviderId": "openai",
//!   "providers": [
//!     { "id": "openai", "name": "OpenAI", "type": "openai",
//!       "apiKeyEnv": "OPENAI_API_KEY", "model": "gpt-4o-mini", "order": 0 }
//!   ],
//!   "fallback": { "fallbackProviderIds": ["anthropic"], "maxRetries": 3 }
//! }
//! ```
//!
//! Configs are snapshots. A running provider only sees a new config through
//! [`Provider::update_config`](crate::provider::Provider::update_config).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decode::WireFormat;
use crate::error::{ProviderError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SWITCHBOARD_CONFIG";

/// Request timeout applied when a provider sets none.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Attempt ceiling applied when the fallback config sets none.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Vendor protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions and compatible endpoints.
    #[serde(rename = "openai", alias = "openai-compatible")]
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Gemini `generateContent`.
    #[serde(alias = "google")]
    Gemini,
}

impl ProviderKind {
    /// Stream encoding used by this vendor.
    pub fn wire_format(self) -> WireFormat {
        match self {
            Self::OpenAi => WireFormat::OpenAi,
            Self::Anthropic => WireFormat::Anthropic,
            Self::Gemini => WireFormat::Gemini,
        }
    }

    /// Public API endpoint used when the config leaves `baseUrl` empty.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Model used when the config leaves `model` empty.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-5",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    /// Static model list reported when live listing is unavailable.
    pub fn default_models(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini", "o3-mini"],
            Self::Anthropic => &[
                "claude-opus-4-1",
                "claude-sonnet-4-5",
                "claude-3-5-haiku-latest",
            ],
            Self::Gemini => &["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"],
        }
    }

    /// Protocol version header value, for vendors that require one.
    pub fn protocol_version(self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("2023-06-01"),
            Self::OpenAi | Self::Gemini => None,
        }
    }

    /// Lowercase name as written in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f64 {
    0.7
}

/// Configuration for a single provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Unique identifier, referenced by `activeProviderId` and the fallback
    /// ranking.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Vendor protocol.
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base endpoint. Empty means the vendor default.
    #[serde(default)]
    pub base_url: String,

    /// Explicit credential. Takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Default model. Empty means the vendor default.
    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Position in the registration order. Lower runs first.
    #[serde(default)]
    pub order: i32,

    /// Statically configured model list. Empty means the vendor list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,

    /// Request timeout in seconds. Defaults to 120.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Extra HTTP headers sent with every request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create an enabled config with vendor defaults and no credential.
    pub fn new(id: impl Into<String>, kind: ProviderKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            enabled: true,
            base_url: String::new(),
            api_key: None,
            api_key_env: None,
            model: String::new(),
            max_tokens: None,
            temperature: default_temperature(),
            system_prompt: None,
            order: 0,
            models: Vec::new(),
            timeout_secs: None,
            headers: HashMap::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Resolve the credential: explicit key, then the named env var.
    ///
    /// Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim)
            && !key.is_empty()
        {
            return Some(key.to_string());
        }
        let var = self.api_key_env.as_deref()?;
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Base URL without a trailing slash, falling back to the vendor default.
    pub fn effective_base_url(&self) -> &str {
        let base = self.base_url.trim();
        if base.is_empty() {
            self.kind.default_base_url()
        } else {
            base.trim_end_matches('/')
        }
    }

    /// Configured model, falling back to the vendor default.
    pub fn effective_model(&self) -> &str {
        if self.model.trim().is_empty() {
            self.kind.default_model()
        } else {
            self.model.trim()
        }
    }

    /// Configured model list, falling back to the vendor list.
    pub fn static_models(&self) -> Vec<String> {
        if self.models.is_empty() {
            self.kind
                .default_models()
                .iter()
                .map(|m| (*m).to_string())
                .collect()
        } else {
            self.models.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Enabled, with a credential and a usable endpoint.
    pub fn is_ready(&self) -> bool {
        self.not_ready_reason().is_none()
    }

    /// Why the provider cannot run, or `None` when it can.
    pub fn not_ready_reason(&self) -> Option<String> {
        if !self.enabled {
            return Some(format!("{} is disabled", self.id));
        }
        if self.resolve_api_key().is_none() {
            return Some(match &self.api_key_env {
                Some(var) => format!("{}: no API key (set {var})", self.id),
                None => format!("{}: no API key", self.id),
            });
        }
        if !self.effective_base_url().starts_with("http") {
            return Some(format!("{}: invalid base URL", self.id));
        }
        None
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_key_env", &self.api_key_env)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt)
            .field("order", &self.order)
            .field("models", &self.models)
            .field("timeout_secs", &self.timeout_secs)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Fallback ranking and attempt ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackConfig {
    /// Explicit ranking after the active provider. Empty means every other
    /// ready provider in registration order.
    #[serde(default)]
    pub fallback_provider_ids: Vec<String>,

    /// Maximum attempts, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            fallback_provider_ids: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchboardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_provider_id: Option<String>,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub fallback: FallbackConfig,
}

impl SwitchboardConfig {
    /// Parse a config document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProviderError::Config(e.to_string()))
    }

    /// Look up a provider config by id.
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }
}

/// Locate the config file.
///
/// Order:
/// 1. Path from the `SWITCHBOARD_CONFIG` environment variable.
/// 2. `~/.switchboard/config.json`, if it exists.
pub fn discover_config_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR)
        && !env_path.trim().is_empty()
    {
        return Some(PathBuf::from(env_path));
    }

    let path = dirs::home_dir()?.join(".switchboard").join("config.json");
    path.exists().then_some(path)
}

/// Load configuration.
///
/// An explicit `path` must exist. A discovered path that does not exist, or
/// no path at all, yields the default (empty) config.
pub fn load_config(path: Option<&Path>) -> Result<SwitchboardConfig> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match discover_config_path() {
            Some(p) => (p, false),
            None => {
                debug!("no config file found, using defaults");
                return Ok(SwitchboardConfig::default());
            }
        },
    };

    if !path.exists() {
        if required {
            return Err(ProviderError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), "config file missing, using defaults");
        return Ok(SwitchboardConfig::default());
    }

    let text = std::fs::read_to_string(&path)
        .map_err(|e| ProviderError::Config(format!("{}: {e}", path.display())))?;
    let config = SwitchboardConfig::from_json(&text)
        .map_err(|e| ProviderError::Config(format!("{}: {e}", path.display())))?;

    debug!(
        path = %path.display(),
        providers = config.providers.len(),
        "loaded config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_document() {
        let json = r#"{
            "activeProviderId": "claude",
            "providers": [
                {"id": "claude", "name": "Claude", "type": "anthropic",
                 "apiKey": "sk-ant", "maxTokens": 1024, "systemPrompt": "be brief",
                 "order": 2, "timeoutSecs": 30},
                {"id": "compat", "type": "openai-compatible",
                 "baseUrl": "http://localhost:8080/v1/", "apiKeyEnv": "COMPAT_KEY"},
                {"id": "g", "type": "google", "enabled": false}
            ],
            "fallback": {"fallbackProviderIds": ["compat"], "maxRetries": 2}
        }"#;
        let config = SwitchboardConfig::from_json(json).unwrap();

        assert_eq!(config.active_provider_id.as_deref(), Some("claude"));
        assert_eq!(config.providers.len(), 3);

        let claude = config.provider("claude").unwrap();
        assert_eq!(claude.kind, ProviderKind::Anthropic);
        assert_eq!(claude.max_tokens, Some(1024));
        assert_eq!(claude.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(claude.timeout(), Duration::from_secs(30));
        assert!(claude.enabled);
        assert!((claude.temperature - 0.7).abs() < f64::EPSILON);

        let compat = config.provider("compat").unwrap();
        assert_eq!(compat.kind, ProviderKind::OpenAi);
        assert_eq!(compat.effective_base_url(), "http://localhost:8080/v1");
        assert_eq!(compat.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let g = config.provider("g").unwrap();
        assert_eq!(g.kind, ProviderKind::Gemini);
        assert!(!g.enabled);

        assert_eq!(config.fallback.fallback_provider_ids, vec!["compat"]);
        assert_eq!(config.fallback.max_retries, 2);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = SwitchboardConfig::from_json("{}").unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(config.fallback.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn unknown_kind_is_config_error() {
        let err = SwitchboardConfig::from_json(r#"{"providers":[{"id":"x","type":"cohere"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[test]
    fn vendor_defaults_fill_blanks() {
        let cfg = ProviderConfig::new("g", ProviderKind::Gemini);
        assert_eq!(
            cfg.effective_base_url(),
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(cfg.effective_model(), "gemini-2.0-flash");
        assert!(cfg.static_models().contains(&"gemini-2.5-pro".to_string()));
        assert_eq!(ProviderKind::Anthropic.protocol_version(), Some("2023-06-01"));
    }

    #[test]
    fn configured_models_override_vendor_list() {
        let mut cfg = ProviderConfig::new("o", ProviderKind::OpenAi);
        cfg.models = vec!["local-7b".into()];
        assert_eq!(cfg.static_models(), vec!["local-7b"]);
    }

    #[test]
    fn explicit_key_wins_over_env() {
        temp_env::with_var("SWB_TEST_KEY_A", Some("from-env"), || {
            let mut cfg = ProviderConfig::new("o", ProviderKind::OpenAi).with_api_key("explicit");
            cfg.api_key_env = Some("SWB_TEST_KEY_A".into());
            assert_eq!(cfg.resolve_api_key().as_deref(), Some("explicit"));

            cfg.api_key = Some("   ".into());
            assert_eq!(cfg.resolve_api_key().as_deref(), Some("from-env"));
        });
    }

    #[test]
    fn readiness() {
        temp_env::with_var_unset("SWB_TEST_KEY_B", || {
            let mut cfg = ProviderConfig::new("o", ProviderKind::OpenAi);
            cfg.api_key_env = Some("SWB_TEST_KEY_B".into());
            assert!(!cfg.is_ready());
            assert!(cfg.not_ready_reason().unwrap().contains("SWB_TEST_KEY_B"));

            let cfg = cfg.with_api_key("k");
            assert!(cfg.is_ready());

            let disabled = cfg.clone().with_enabled(false);
            assert!(!disabled.is_ready());

            let bad_url = cfg.with_base_url("localhost:1234");
            assert!(!bad_url.is_ready());
        });
    }

    #[test]
    fn debug_masks_api_key() {
        let cfg = ProviderConfig::new("o", ProviderKind::OpenAi).with_api_key("sk-secret-123");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-secret-123"));
        assert!(dbg.contains("***"));
    }

    #[test]
    fn serializes_type_field() {
        let cfg = ProviderConfig::new("a", ProviderKind::Anthropic);
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["type"], "anthropic");
        assert_eq!(json["enabled"], true);
        assert!(json.get("apiKey").is_none());
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"providers":[{"id":"o","type":"openai","apiKey":"k"}]}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.providers[0].id, "o");
    }

    #[test]
    fn load_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn discovery_prefers_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{"activeProviderId":"x"}"#).unwrap();

        temp_env::with_var(CONFIG_ENV_VAR, Some(path.as_os_str()), || {
            assert_eq!(discover_config_path(), Some(path.clone()));
            let config = load_config(None).unwrap();
            assert_eq!(config.active_provider_id.as_deref(), Some("x"));
        });
    }

    #[test]
    fn discovered_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        temp_env::with_var(CONFIG_ENV_VAR, Some(path.as_os_str()), || {
            assert_eq!(load_config(None).unwrap(), SwitchboardConfig::default());
        });
    }

    #[cfg(unix)]
    #[test]
    fn discovery_falls_back_to_home() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join(".switchboard");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();

        temp_env::with_vars(
            [
                (CONFIG_ENV_VAR, None),
                ("HOME", Some(home.path().as_os_str())),
            ],
            || {
                assert_eq!(discover_config_path(), Some(dir.join("config.json")));
            },
        );
    }
}
