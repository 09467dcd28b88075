use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationBackend, GenerationError, GenerationRequest};
use crate::log_debug;
use crate::providers::{BackendConfig, BackendTier};

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completion backend
pub struct ChatCompletionBackend {
    config: BackendConfig,
    client: Client,
}

impl ChatCompletionBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: self.config.effective_model(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt.user,
                },
            ],
            stream: false,
            temperature: self.config.temperature,
        }
    }
}

/// Reads `choices[0].message.content` from a response body
fn extract_content(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Envelope(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::Envelope("missing choices[0].message.content".to_string()))
}

#[async_trait]
impl GenerationBackend for ChatCompletionBackend {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn tier(&self) -> BackendTier {
        self.config.tier
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key =
            self.config
                .resolve_api_key()
                .ok_or_else(|| GenerationError::MissingApiKey {
                    backend: self.config.id.clone(),
                    env: self.config.api_key_env.clone(),
                })?;

        log_debug!(
            "Sending {} + {} chars to {} ({})",
            request.prompt.system.len(),
            request.prompt.user.len(),
            self.config.id,
            self.config.effective_model()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        extract_content(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::prompt::AssembledPrompt;
    use std::sync::Arc;

    #[test]
    fn test_request_shape() {
        let backend = ChatCompletionBackend::new(BackendConfig::with_defaults(
            "fast",
            BackendTier::Fast,
        ));
        let prompt = Arc::new(AssembledPrompt {
            system: "sys".to_string(),
            user: "diff".to_string(),
            metadata: String::new(),
        });
        let request = GenerationRequest::new(prompt, "fast");
        let json = serde_json::to_value(backend.body(&request)).expect("serialize");

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "diff");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"[]"}}]}"#;
        assert_eq!(extract_content(body).expect("content"), "[]");

        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(GenerationError::Envelope(_))
        ));
        assert!(matches!(
            extract_content("<html>bad gateway</html>"),
            Err(GenerationError::Envelope(_))
        ));
    }
}
