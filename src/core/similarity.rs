use crate::domain::ports::SimilarityProvider;
use crate::utils::error::{CopilotError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Offline provider: cosine similarity over padded character trigrams.
///
/// Deterministic and free of I/O; the default when no embedding endpoint is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct LexicalSimilarity;

impl LexicalSimilarity {
    pub fn new() -> Self {
        Self
    }

    fn trigrams(text: &str) -> HashMap<String, f32> {
        let padded: Vec<char> = format!("  {} ", text.trim().to_lowercase())
            .chars()
            .collect();
        let mut counts = HashMap::new();
        for window in padded.windows(3) {
            *counts.entry(window.iter().collect::<String>()).or_insert(0.0) += 1.0;
        }
        counts
    }
}

#[async_trait]
impl SimilarityProvider for LexicalSimilarity {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        if a.trim().eq_ignore_ascii_case(b.trim()) {
            return Ok(1.0);
        }
        let left = Self::trigrams(a);
        let right = Self::trigrams(b);

        let dot: f32 = left
            .iter()
            .filter_map(|(gram, count)| right.get(gram).map(|other| count * other))
            .sum();
        let norm = |v: &HashMap<String, f32>| v.values().map(|c| c * c).sum::<f32>().sqrt();
        let denominator = norm(&left) * norm(&right);
        if denominator == 0.0 {
            return Ok(0.0);
        }
        Ok((dot / denominator).clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Vectors are cached per input text for the lifetime of the provider, so a
/// batch run embeds each distinct skill once.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    cache: Arc<Mutex<HashMap<String, Arc<Vec<f32>>>>>,
}

impl HttpEmbeddingProvider {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        validate_url("similarity.endpoint", endpoint)?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CopilotError::embedding_unavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    async fn embed(&self, text: &str) -> Result<Arc<Vec<f32>>> {
        let key = text.trim().to_lowercase();
        if let Some(vector) = self.cache.lock().await.get(&key) {
            return Ok(Arc::clone(vector));
        }

        tracing::debug!("Requesting embedding for '{}' from {}", key, self.endpoint);
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: [&key],
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CopilotError::embedding_unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CopilotError::embedding_unavailable(format!(
                "endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            CopilotError::embedding_unavailable(format!("malformed response: {}", e))
        })?;
        let vector = body
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| CopilotError::embedding_unavailable("response contained no embedding"))?;

        let vector = Arc::new(vector);
        self.cache.lock().await.insert(key, Arc::clone(&vector));
        Ok(vector)
    }
}

#[async_trait]
impl SimilarityProvider for HttpEmbeddingProvider {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let left = self.embed(a).await?;
        let right = self.embed(b).await?;
        cosine_similarity(&left, &right)
    }

    fn name(&self) -> &str {
        "http"
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(CopilotError::embedding_unavailable(format!(
            "embedding dimensions differ ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a * norm_b)).clamp(0.0, 1.0))
}
