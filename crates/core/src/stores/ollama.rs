use crate::embeddings::Embedder;
use crate::error::BackendError;
use crate::traits::ChatModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_CHAT_MODEL: &str = "llama3";

const BACKEND: &str = "ollama";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    client: Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url.clone()).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{url} returned {status}: {}", body.trim()),
            });
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            prompt: text,
        };
        let response: EmbeddingsResponse =
            self.client.post_json("/api/embeddings", &request).await?;

        if response.embedding.is_empty() {
            return Err(BackendError::EmptyResponse {
                backend: BACKEND.to_string(),
            });
        }

        Ok(response.embedding)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct OllamaChatModel {
    client: OllamaClient,
    model: String,
}

impl OllamaChatModel {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };
        debug!(model = %self.model, prompt_chars = prompt.len(), "calling chat model");
        let response: GenerateResponse = self.client.post_json("/api/generate", &request).await?;

        if response.response.trim().is_empty() {
            return Err(BackendError::EmptyResponse {
                backend: BACKEND.to_string(),
            });
        }

        Ok(response.response)
    }
}
