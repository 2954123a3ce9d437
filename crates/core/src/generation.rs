use crate::error::ProviderError;
use crate::traits::GenerationProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaGenerateOptions,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: Option<String>,
}

/// Generation client for an Ollama-compatible endpoint. Generation is not
/// retried; a failed call aborts the request that needed it.
pub struct OllamaGenerator {
    client: Client,
    endpoint: Url,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl OllamaGenerator {
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            temperature: 0.7,
            top_p: 0.9,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = self.endpoint.join("api/generate")?;
        let response = self
            .client
            .post(url)
            .json(&OllamaGenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
                options: OllamaGenerateOptions {
                    temperature: self.temperature,
                    top_p: self.top_p,
                },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, details });
        }

        let payload: OllamaGenerateResponse = response.json().await?;
        payload.response.ok_or_else(|| {
            ProviderError::MalformedResponse("response missing the answer field".to_string())
        })
    }
}
