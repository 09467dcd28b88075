//! Boundary to text-generation backends

mod chat;

pub use chat::ChatCompletionBackend;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::commit::prompt::AssembledPrompt;
use crate::config::Config;
use crate::providers::BackendTier;

/// Log target for backend and transport failures
pub const GENERATION_LOG_TARGET: &str = "git_quill::generation";

/// One branch's failure. Never escapes the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No API key for backend '{backend}': set `api_key` or the {env} environment variable")]
    MissingApiKey { backend: String, env: String },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend responded with HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Unexpected response envelope: {0}")]
    Envelope(String),
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("Branch aborted: {0}")]
    Aborted(String),
}

/// Immutable input for one branch. The prompt is shared by every branch of
/// an invocation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: Arc<AssembledPrompt>,
    pub backend_id: String,
}

impl GenerationRequest {
    pub fn new(prompt: Arc<AssembledPrompt>, backend_id: &str) -> Self {
        Self {
            prompt,
            backend_id: backend_id.to_string(),
        }
    }

    /// Project metadata block carried by the prompt
    pub fn project_metadata(&self) -> &str {
        &self.prompt.metadata
    }
}

/// A backend that turns a prompt into raw response text
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn id(&self) -> &str;

    fn tier(&self) -> BackendTier;

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Builds one chat-completion backend per enabled config entry, in order
pub fn backends_from_config(config: &Config) -> Vec<Arc<dyn GenerationBackend>> {
    config
        .enabled_backends()
        .map(|backend| {
            Arc::new(ChatCompletionBackend::new(backend.clone())) as Arc<dyn GenerationBackend>
        })
        .collect()
}
