//! Ollama /api/generate client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::llm::{CompletionError, CompletionOptions, TextCompletion};

pub struct OllamaCompletion {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaCompletion {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextCompletion for OllamaCompletion {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": options.temperature,
                    "num_predict": options.max_tokens,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|_| CompletionError::EmptyResponse)?;
        if payload.response.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(payload.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"model": "llama3", "stream": false})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": "## 1. Summary\nok"})),
            )
            .mount(&server)
            .await;

        let client = OllamaCompletion::new(&server.uri(), "llama3", Duration::from_secs(5)).unwrap();
        let text = client
            .complete("prompt", CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "## 1. Summary\nok");
    }

    #[tokio::test]
    async fn test_blank_response_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "  "})))
            .mount(&server)
            .await;

        let client = OllamaCompletion::new(&server.uri(), "llama3", Duration::from_secs(5)).unwrap();
        let err = client
            .complete("prompt", CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }
}
