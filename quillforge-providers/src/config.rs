//! ABOUTME: Provider instance configuration and environment-variable loading

use std::collections::HashMap;

/// Configuration for one provider instance (§4.1, §6.4 Environment).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider name (e.g. "openai", "anthropic") — also the registry key.
    pub name: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub custom_config: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            endpoint: None,
            api_key: None,
            timeout_secs: 60,
            max_retries: 3,
            custom_config: HashMap::new(),
        }
    }

    /// Load from `QUILLFORGE_<NAME>_{API_KEY,ENDPOINT,MODEL,TIMEOUT,MAX_RETRIES}` (§6.4).
    #[must_use]
    pub fn from_env(name: &str) -> Self {
        let prefix = format!("QUILLFORGE_{}_", name.to_uppercase());
        let model = std::env::var(format!("{prefix}MODEL")).unwrap_or_else(|_| "default".into());
        Self {
            name: name.to_string(),
            endpoint: std::env::var(format!("{prefix}ENDPOINT")).ok(),
            api_key: std::env::var(format!("{prefix}API_KEY")).ok(),
            model,
            timeout_secs: std::env::var(format!("{prefix}TIMEOUT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            max_retries: std::env::var(format!("{prefix}MAX_RETRIES"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            custom_config: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fills_in_sane_defaults() {
        let config = ProviderConfig::new("openai", "gpt-4o-mini");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 3);
        assert!(config.api_key.is_none());
    }
}
