use async_trait::async_trait;
use serde::Deserialize;

use crate::RetrievalSettings;
use crate::errors::{KnowledgeError, KnowledgeResult};

/// Text-to-vector service consumed by the retrievers.
///
/// Implementations make a single attempt; retry and fallback policy belongs
/// to the caller.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> KnowledgeResult<Vec<f32>>;
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    expected_dim: Option<usize>,
    client: reqwest::Client,
}

impl EmbeddingClient {
    pub fn new(settings: &RetrievalSettings) -> KnowledgeResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            base_url: normalize_base_url(&settings.base_url),
            model: settings.embedding_model.clone(),
            api_key: settings.api_key.clone(),
            expected_dim: settings.embedding_dim,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    pub async fn embed_batch(&self, inputs: &[String]) -> KnowledgeResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbedRequest {
            model: self.model.clone(),
            input: inputs.to_vec(),
        };

        let mut request = self.client.post(self.embeddings_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Embedding(format!(
                "embedding request failed: {status} {text}"
            )));
        }

        let payload: EmbedResponse = response.json().await.map_err(map_send_error)?;
        let mut data = payload.data;
        if data.len() != inputs.len() {
            return Err(KnowledgeError::Embedding(format!(
                "embedding response has {} vectors for {} inputs",
                data.len(),
                inputs.len()
            )));
        }
        data.sort_by_key(|item| item.index);

        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();
        for vector in &vectors {
            self.check_dim(vector)?;
        }
        Ok(vectors)
    }

    fn check_dim(&self, vector: &[f32]) -> KnowledgeResult<()> {
        if vector.is_empty() {
            return Err(KnowledgeError::Embedding(
                "embedding response missing vectors".to_string(),
            ));
        }
        match self.expected_dim {
            Some(expected) if expected != vector.len() => {
                Err(KnowledgeError::EmbeddingDimMismatch {
                    expected,
                    actual: vector.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> KnowledgeResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            KnowledgeError::Embedding("embedding response missing vectors".to_string())
        })
    }
}

/// Trim trailing slashes and make sure the URL ends in `/v1`.
pub fn normalize_base_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1") {
        base.to_string()
    } else {
        format!("{base}/v1")
    }
}

fn map_send_error(err: reqwest::Error) -> KnowledgeError {
    if err.is_timeout() {
        KnowledgeError::EmbeddingTimeout
    } else {
        KnowledgeError::Http(err)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_v1_suffix() {
        assert_eq!(
            normalize_base_url("https://api.openai.com"),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_base_url("https://api.openai.com/"),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_base_url("https://proxy.example.com/v1/"),
            "https://proxy.example.com/v1"
        );
    }

    #[test]
    fn response_payload_parses_out_of_order() {
        let raw = r#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[0.5,0.5]},
            {"object":"embedding","index":0,"embedding":[1.0,0.0]}
        ],"model":"text-embedding-ada-002"}"#;
        let mut payload: EmbedResponse = serde_json::from_str(raw).unwrap();
        payload.data.sort_by_key(|item| item.index);
        assert_eq!(payload.data[0].embedding, vec![1.0, 0.0]);
        assert_eq!(payload.data[1].embedding, vec![0.5, 0.5]);
    }

    #[test]
    fn dimension_check() {
        let settings = RetrievalSettings {
            embedding_dim: Some(3),
            ..Default::default()
        };
        let client = EmbeddingClient::new(&settings).unwrap();
        assert!(client.check_dim(&[0.1, 0.2, 0.3]).is_ok());
        assert!(matches!(
            client.check_dim(&[0.1, 0.2]),
            Err(KnowledgeError::EmbeddingDimMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(client.check_dim(&[]).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient() {
        let settings = RetrievalSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            connect_timeout_secs: 1,
            timeout_secs: 2,
            ..Default::default()
        };
        let client = EmbeddingClient::new(&settings).unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
