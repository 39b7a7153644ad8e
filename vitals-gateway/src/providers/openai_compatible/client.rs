//! OpenAI-compatible API client.

use std::time::Duration;

use futures::TryStreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vitals_core::CompletionSettings;

use super::sse::content_stream;
use crate::providers::provider::{CompletionProvider, CompletionStream, ProviderError};

/// OpenAI-compatible API client.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

/// Request body for the Chat Completions API
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    /// Create a new OpenAI-compatible client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        settings: &CompletionSettings,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model: settings.model.clone(),
            base_url: base_url.into(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Build request headers with optional auth.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            let auth_value = format!("Bearer {}", api_key);
            if let Ok(header_value) = HeaderValue::from_str(&auth_value) {
                headers.insert(AUTHORIZATION, header_value);
            }
        }
        headers
    }

    fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn request_body<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        stream: bool,
    ) -> ChatCompletionsRequest<'a> {
        ChatCompletionsRequest {
            model: &self.model,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: system,
                },
                OpenAiMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        body: &ChatCompletionsRequest<'_>,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http_client
            .post(self.chat_completions_url())
            .headers(self.build_headers())
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }
        Ok(response)
    }
}

fn map_request_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::HttpError(err)
    }
}

fn parse_completion(response_text: &str) -> Result<String, ProviderError> {
    let parsed: ChatCompletionsResponse = serde_json::from_str(response_text).map_err(|e| {
        let preview: String = response_text.chars().take(500).collect();
        ProviderError::InvalidFormat(format!(
            "Failed to parse OpenAI-compatible response: {e}\nBody preview: {preview}"
        ))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::NoContent)
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = self.request_body(system, user, false);
        let response = self.send(&body).await?;
        let response_text = response.text().await.map_err(map_request_error)?;
        debug!(bytes = response_text.len(), "completion received");
        parse_completion(&response_text)
    }

    async fn complete_stream(
        &self,
        system: &str,
        user: &str,
    ) -> Result<CompletionStream, ProviderError> {
        let body = self.request_body(system, user, true);
        let response = self.send(&body).await?;
        Ok(content_stream(
            response.bytes_stream().map_err(map_request_error),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(base_url, None, &CompletionSettings::default()).unwrap()
    }

    #[test]
    fn test_chat_completions_url_without_v1_suffix() {
        assert_eq!(
            client("http://127.0.0.1:8080/").chat_completions_url(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_chat_completions_url_with_v1_suffix() {
        assert_eq!(
            client("http://127.0.0.1:8080/v1").chat_completions_url(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_uses_settings() {
        let settings = CompletionSettings {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.5,
            max_tokens: 256,
            ..CompletionSettings::default()
        };
        let client = OpenAiCompatibleClient::new("http://localhost", None, &settings).unwrap();
        let value = serde_json::to_value(client.request_body("sys", "hi", false)).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["max_tokens"], 256);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert!(value.get("stream").is_none());

        let streaming = serde_json::to_value(client.request_body("sys", "hi", true)).unwrap();
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn test_parse_completion() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"保持规律作息"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(raw).unwrap(), "保持规律作息");

        let empty = r#"{"choices":[]}"#;
        assert!(matches!(parse_completion(empty), Err(ProviderError::NoContent)));

        assert!(matches!(
            parse_completion("not json"),
            Err(ProviderError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let client = client("http://127.0.0.1:1");
        let err = client.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::HttpError(_) | ProviderError::Timeout
        ));
    }
}
