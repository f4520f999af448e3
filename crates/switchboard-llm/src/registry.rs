//! Explicit provider registry.
//!
//! The registry owns provider configs in registration order, the active
//! provider id, and the fallback config. Adapter instances are built lazily
//! on first use and cached until their config is replaced.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::config::{FallbackConfig, ProviderConfig, SwitchboardConfig};
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::providers::build_provider;

enum Instance {
    /// Adapter built from the config on first use.
    Built(OnceLock<Arc<dyn Provider>>),
    /// Caller-supplied implementation.
    Custom(Arc<dyn Provider>),
}

struct Entry {
    config: ProviderConfig,
    instance: Instance,
    seq: usize,
}

impl Entry {
    fn provider(&self) -> Arc<dyn Provider> {
        match &self.instance {
            Instance::Built(cell) => cell
                .get_or_init(|| build_provider(self.config.clone()))
                .clone(),
            Instance::Custom(provider) => provider.clone(),
        }
    }

    fn is_ready(&self) -> bool {
        match &self.instance {
            Instance::Built(_) => self.config.is_ready(),
            Instance::Custom(provider) => provider.is_ready(),
        }
    }
}

/// Provider configs, cached instances, active id and fallback settings.
///
/// Providers are ordered by their `order` field, ties broken by
/// registration sequence.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<Entry>,
    active: Option<String>,
    fallback: FallbackConfig,
    next_seq: usize,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a loaded config document.
    ///
    /// Later entries with a duplicate id replace earlier ones.
    pub fn from_config(config: SwitchboardConfig) -> Self {
        let mut registry = Self {
            fallback: config.fallback,
            ..Self::default()
        };
        for provider in config.providers {
            registry.register(provider);
        }
        registry.active = config.active_provider_id;
        registry
    }

    /// Add a provider config, replacing any existing one with the same id.
    pub fn register(&mut self, config: ProviderConfig) {
        if self.position(&config.id).is_some() {
            // Same id: keep its sequence, drop the cached instance.
            let _ = self.update_provider(config);
            return;
        }
        debug!(provider = %config.id, kind = %config.kind, "registering provider");
        let seq = self.bump_seq();
        self.entries.push(Entry {
            config,
            instance: Instance::Built(OnceLock::new()),
            seq,
        });
        self.sort();
    }

    /// Add a caller-supplied provider implementation.
    ///
    /// Replaces any entry with the same id.
    pub fn insert(&mut self, provider: Arc<dyn Provider>) {
        let config = (*provider.config()).clone();
        let seq = match self.position(provider.id()) {
            Some(pos) => self.entries.remove(pos).seq,
            None => self.bump_seq(),
        };
        debug!(provider = %provider.id(), "registering custom provider");
        self.entries.push(Entry {
            config,
            instance: Instance::Custom(provider),
            seq,
        });
        self.sort();
    }

    /// Replace a provider's config.
    ///
    /// A cached adapter is discarded and rebuilt on next use; a custom
    /// provider receives the new snapshot through
    /// [`Provider::update_config`].
    pub fn update_provider(&mut self, config: ProviderConfig) -> Result<()> {
        let pos = self
            .position(&config.id)
            .ok_or_else(|| ProviderError::Config(format!("unknown provider: {}", config.id)))?;
        let entry = &mut self.entries[pos];

        let custom = match &entry.instance {
            Instance::Custom(provider) => Some(provider.clone()),
            Instance::Built(_) => None,
        };
        match custom {
            Some(provider) => provider.update_config(config.clone()),
            None => entry.instance = Instance::Built(OnceLock::new()),
        }
        debug!(provider = %config.id, "provider config updated");
        entry.config = config;
        self.sort();
        Ok(())
    }

    /// Provider instance by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.entry(id).map(Entry::provider)
    }

    /// Provider config by id.
    pub fn config(&self, id: &str) -> Option<&ProviderConfig> {
        self.entry(id).map(|e| &e.config)
    }

    /// Every config in registration order.
    pub fn configs(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.entries.iter().map(|e| &e.config)
    }

    /// Every id in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.config.id.as_str())
    }

    /// Whether the provider exists and is ready. Never builds an adapter.
    pub fn is_ready(&self, id: &str) -> bool {
        self.entry(id).is_some_and(Entry::is_ready)
    }

    /// Ready providers in registration order.
    pub fn ready_providers(&self) -> Vec<Arc<dyn Provider>> {
        self.entries
            .iter()
            .filter(|e| e.is_ready())
            .map(Entry::provider)
            .collect()
    }

    /// Select the provider tried first.
    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if self.position(id).is_none() {
            return Err(ProviderError::Config(format!("unknown provider: {id}")));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn fallback(&self) -> &FallbackConfig {
        &self.fallback
    }

    pub fn set_fallback(&mut self, fallback: FallbackConfig) {
        self.fallback = fallback;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.config.id == id)
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.config.id == id)
    }

    fn bump_seq(&mut self) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| (e.config.order, e.seq));
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids().collect::<Vec<_>>())
            .field("active", &self.active)
            .field("fallback", &self.fallback)
            .finish()
    }
}
