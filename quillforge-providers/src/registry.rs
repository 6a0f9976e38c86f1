//! ABOUTME: Provider factory registry and multi-instance manager
//! ABOUTME: Mirrors the registry/manager split used for agents (§4.4), applied to providers

use crate::config::ProviderConfig;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::provider::LlmProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type ProviderFactory = Box<dyn Fn(ProviderConfig) -> Arc<dyn LlmProvider> + Send + Sync>;

/// Maps a provider name (e.g. `"openai"`) to the constructor for it.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(ProviderConfig) -> Arc<dyn LlmProvider> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn create(&self, config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        let factory = self
            .factories
            .get(&config.name)
            .ok_or_else(|| PipelineError::not_found(format!("unknown provider: {}", config.name)))?;
        Ok(factory(config))
    }

    #[must_use]
    pub fn available_providers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds live provider instances alongside the registry that can construct
/// more of them, with a notion of "the default provider" for callers that
/// don't care which vendor serves a request.
pub struct ProviderManager {
    registry: RwLock<ProviderRegistry>,
    instances: RwLock<HashMap<String, Arc<dyn LlmProvider>>>,
    default_provider: RwLock<Option<String>>,
}

impl ProviderManager {
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            instances: RwLock::new(HashMap::new()),
            default_provider: RwLock::new(None),
        }
    }

    pub async fn init_provider(&self, config: ProviderConfig, make_default: bool) -> Result<()> {
        let name = config.name.clone();
        let instance = self.registry.read().await.create(config)?;
        self.instances.write().await.insert(name.clone(), instance);
        if make_default {
            *self.default_provider.write().await = Some(name);
        }
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Arc<dyn LlmProvider>> {
        self.instances
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(format!("provider not initialized: {name}")))
    }

    pub async fn default_provider(&self) -> Result<Arc<dyn LlmProvider>> {
        let name = self
            .default_provider
            .read()
            .await
            .clone()
            .ok_or_else(|| PipelineError::internal("no default provider configured"))?;
        self.get(&name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_provider::HttpLlmProvider;

    #[tokio::test]
    async fn registers_and_resolves_default_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register("openai", |config| Arc::new(HttpLlmProvider::new(config)));
        let manager = ProviderManager::new(registry);

        manager
            .init_provider(ProviderConfig::new("openai", "gpt-4o-mini"), true)
            .await
            .unwrap();

        let provider = manager.default_provider().await.unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[tokio::test]
    async fn unknown_provider_name_is_not_found() {
        let registry = ProviderRegistry::new();
        let manager = ProviderManager::new(registry);
        let err = manager
            .init_provider(ProviderConfig::new("nope", "x"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}
