use crate::error::{EmbeddingUnavailable, ProviderError};
use crate::models::RetryPolicy;
use crate::traits::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

/// Embedding client for an Ollama-compatible endpoint.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
}

impl OllamaEmbedder {
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
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = self.endpoint.join("api/embeddings")?;
        let response = self
            .client
            .post(url)
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, details });
        }

        let payload: OllamaEmbeddingResponse = response.json().await?;
        payload
            .embedding
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "response missing a non-empty embedding field".to_string(),
                )
            })
    }
}

/// Wraps any provider with the bounded retry loop. Transient failures are
/// retried with `attempt x base_delay` backoff; exhaustion is terminal for
/// the text being embedded.
pub struct EmbeddingEngine<P> {
    provider: P,
    policy: RetryPolicy,
}

impl<P> EmbeddingEngine<P>
where
    P: EmbeddingProvider + Send + Sync,
{
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingUnavailable> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=max_attempts {
            match self.provider.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(error) => {
                    warn!(attempt, max_attempts, %error, "embedding attempt failed");
                    last = Some(error);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(EmbeddingUnavailable {
            attempts: max_attempts,
            last: last.unwrap_or_else(|| {
                ProviderError::MalformedResponse("no embedding attempt was made".to_string())
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: AtomicU32,
        succeed_on: u32,
    }

    impl FlakyProvider {
        fn new(succeed_on: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_on,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                Ok(vec![0.1, 0.2, 0.3])
            } else {
                Err(ProviderError::MalformedResponse("flaky".to_string()))
            }
        }
    }

    fn immediate_retries(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn third_attempt_succeeds_after_two_failures() {
        let provider = FlakyProvider::new(3);
        let engine = EmbeddingEngine::new(provider, immediate_retries(3));

        let vector = engine.embed("hello").await.expect("embed should succeed");
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(engine.provider.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_become_terminal() {
        let provider = FlakyProvider::new(u32::MAX);
        let engine = EmbeddingEngine::new(provider, immediate_retries(2));

        let error = engine.embed("hello").await.expect_err("embed should fail");
        assert_eq!(error.attempts, 2);
        assert_eq!(engine.provider.calls(), 2);
    }

    #[tokio::test]
    async fn first_success_makes_exactly_one_call() {
        let provider = FlakyProvider::new(1);
        let engine = EmbeddingEngine::new(provider, immediate_retries(3));

        engine.embed("hello").await.expect("embed should succeed");
        assert_eq!(engine.provider.calls(), 1);
    }
}
