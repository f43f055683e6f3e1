//! OpenAI-compatible chat completions provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TipProvider, TipRequest};
use crate::error::{Error, Result};

const SERVICE: &str = "openai";

const SYSTEM_PROMPT: &str =
    "You are a friendly sustainability coach. Answer with a single concrete tip.";

/// Calls a chat completions endpoint with a bearer key.
#[derive(Debug, Clone)]
pub struct OpenAiTipProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiTipProvider {
    /// Provider for `endpoint` using `model`.
    #[must_use]
    pub fn new(endpoint: &str, model: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TipProvider for OpenAiTipProvider {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn fetch(&self, request: &TipRequest) -> Result<String> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: 120,
            temperature: 0.7,
        };

        debug!("Requesting tip from {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external_service(SERVICE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::external_service(SERVICE, format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::external_service(SERVICE, format!("bad response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::external_service(SERVICE, "response has no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityRecord;
    use crate::calculator::calculate;
    use crate::coefficients::CoefficientTable;
    use crate::history::fixtures::day;
    use crate::tips::{TipGenerator, TipSource};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> TipRequest {
        let record = ActivityRecord::new().with("bus_km", 10.0).with("meat_kg", 0.2);
        let breakdown = calculate(&record, &CoefficientTable::standard()).unwrap();
        TipRequest::new(day(2024, 4, 2), record, breakdown)
    }

    fn provider(server: &MockServer) -> OpenAiTipProvider {
        OpenAiTipProvider::new(
            &format!("{}/v1/chat/completions", server.uri()),
            "test-model",
            "sk-test".to_string(),
        )
    }

    #[tokio::test]
    async fn test_fetch_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Eat one meat-free meal."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&server).fetch(&request()).await.unwrap();
        assert_eq!(text, "Eat one meat-free meal.");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(&request()).await.unwrap_err();
        assert!(err.is_external_service());
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_fetch_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = provider(&server).fetch(&request()).await.unwrap_err();
        assert!(err.is_external_service());
    }

    #[tokio::test]
    async fn test_generator_falls_back_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let generator = TipGenerator::new(Box::new(provider(&server)), Duration::from_secs(5), 1);
        let tip = generator.generate(&request()).await;
        assert_eq!(tip.source, TipSource::Fallback);
    }
}
