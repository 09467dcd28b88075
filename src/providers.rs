//! Generation backend configuration.
//!
//! Single source of truth for backend tiers and their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Default OpenAI-compatible chat completion endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Role a backend plays in an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendTier {
    /// Quick, cheap model whose options usually arrive first
    #[default]
    Fast,
    /// Slower model that produces more considered options
    Deep,
}

impl BackendTier {
    pub const ALL: &'static [BackendTier] = &[BackendTier::Fast, BackendTier::Deep];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Deep => "deep",
        }
    }

    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::Fast => "gpt-4o-mini",
            Self::Deep => "gpt-4.1",
        }
    }
}

impl FromStr for BackendTier {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .find(|t| t.name() == lower)
            .copied()
            .ok_or_else(|| ProviderError::UnknownTier(s.to_string()))
    }
}

impl fmt::Display for BackendTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Backend configuration error
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown backend tier: {0}. Supported: fast, deep")]
    UnknownTier(String),
    #[error("Backend '{id}' has an invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        id: String,
        endpoint: String,
        reason: String,
    },
    #[error("Duplicate backend id: {0}")]
    DuplicateId(String),
    #[error("No enabled backend with tier 'fast' is configured")]
    NoFastBackend,
}

/// One chat-completion backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Identifier used in logs and per-branch records
    pub id: String,
    #[serde(default)]
    pub tier: BackendTier,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// API key; takes precedence over `api_key_env`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_enabled() -> bool {
    true
}

impl BackendConfig {
    /// Create config with defaults for a tier
    pub fn with_defaults(id: &str, tier: BackendTier) -> Self {
        Self {
            id: id.to_string(),
            tier,
            endpoint: default_endpoint(),
            model: tier.default_model().to_string(),
            api_key: String::new(),
            api_key_env: default_api_key_env(),
            temperature: None,
            enabled: true,
        }
    }

    /// Configured model, or the tier default
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.tier.default_model()
        } else {
            &self.model
        }
    }

    /// API key from the config, then from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        let invalid = |reason: String| ProviderError::InvalidEndpoint {
            id: self.id.clone(),
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        Ok(())
    }
}

/// The stock pair: one fast and one deep backend against the same endpoint
pub fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::with_defaults("fast", BackendTier::Fast),
        BackendConfig::with_defaults("deep", BackendTier::Deep),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_str() {
        assert_eq!("fast".parse::<BackendTier>().ok(), Some(BackendTier::Fast));
        assert_eq!("DEEP".parse::<BackendTier>().ok(), Some(BackendTier::Deep));
        assert!("medium".parse::<BackendTier>().is_err());
    }

    #[test]
    fn test_backend_defaults() {
        let config = BackendConfig::with_defaults("fast", BackendTier::Fast);
        assert_eq!(config.effective_model(), "gpt-4o-mini");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_key_wins_over_env() {
        let mut config = BackendConfig::with_defaults("fast", BackendTier::Fast);
        config.api_key = "sk-inline".to_string();
        config.api_key_env = "GIT_QUILL_TEST_UNSET_VARIABLE".to_string();
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-inline"));

        config.api_key.clear();
        assert!(config.resolve_api_key().is_none());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = BackendConfig::with_defaults("deep", BackendTier::Deep);
        config.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
        config.endpoint = "ftp://example.com/v1".to_string();
        assert!(config.validate().is_err());
    }
}
