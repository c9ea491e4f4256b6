//! Hosted model access over the Gemini REST API: text generation for the
//! answer and validation passes, batch embeddings for chunks and queries.
//!
//! The key travels as the `?key=` query parameter. Response parsing is kept
//! in free functions so it can be checked without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use docqa_core::config::LlmConfig;
use docqa_core::traits::{Embedder, Generator};
use docqa_core::{Error, Result};
use docqa_embed::l2_normalize;

/// `batchEmbedContents` accepts at most this many requests per call.
pub const EMBED_BATCH_LIMIT: usize = 100;

const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
    embedding_dim: usize,
    temperature: f32,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("generation_model", &self.generation_model)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client, taking the key from `config.api_key` or the
    /// environment variable named by `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(config, |name| std::env::var(name).ok())?;
        Self::new_with_key(config, api_key)
    }

    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dim: config.embedding_dim,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint_url(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}?key={}", self.base_url, model_path(model), method, self.api_key)
    }

    /// POST a JSON body and return the parsed JSON reply. Transport and
    /// HTTP failures are reported through `wrap`.
    async fn post(&self, url: &str, body: &Value, wrap: fn(String) -> Error) -> Result<Value> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                wrap(format!("Gemini request timed out after {}s", self.timeout_secs))
            } else {
                wrap(format!("request to Gemini API failed: {}", e.without_url()))
            }
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| wrap(format!("failed to read Gemini response body: {}", e.without_url())))?;
        if !status.is_success() {
            return Err(wrap(http_error_message(status.as_u16(), &text)));
        }
        serde_json::from_str(&text).map_err(|e| wrap(format!("invalid JSON in Gemini response: {e}")))
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = model_path(&self.embedding_model);
        let requests: Vec<Value> = texts
            .iter()
            .map(|t| json!({ "model": model, "content": { "parts": [{ "text": t }] } }))
            .collect();
        let url = self.endpoint_url(&self.embedding_model, "batchEmbedContents");
        let body = self.post(&url, &json!({ "requests": requests }), Error::Embedding).await?;
        let mut vectors = parse_embedding_response(&body)?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!("expected {} embeddings, got {}", texts.len(), vectors.len())));
        }
        for v in &mut vectors {
            if v.len() != self.embedding_dim {
                return Err(Error::Embedding(format!(
                    "embedding dimension {} does not match configured {}",
                    v.len(),
                    self.embedding_dim
                )));
            }
            l2_normalize(v);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.generation_model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });
        let url = self.endpoint_url(&self.generation_model, "generateContent");
        debug!(model = self.generation_model.as_str(), prompt_chars = prompt.chars().count(), "sending Gemini generation request");
        let reply = self.post(&url, &body, Error::Generation).await?;
        parse_generation_response(&reply)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    fn dim(&self) -> usize {
        self.embedding_dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_LIMIT) {
            debug!(batch = batch.len(), model = self.embedding_model.as_str(), "embedding batch");
            out.extend(self.embed_chunk(batch).await?);
        }
        Ok(out)
    }
}

/// Pick the API key: explicit config first, then the named environment variable.
pub fn resolve_api_key(config: &LlmConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    config
        .api_key
        .clone()
        .or_else(|| lookup(&config.api_key_env))
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::InvalidConfig(format!("Gemini API key missing (set {} or llm.api_key)", config.api_key_env)))
}

/// `gemini-2.5-pro` and `models/gemini-2.5-pro` name the same resource.
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Concatenate the text parts of the first candidate.
///
/// A prompt blocked by safety settings or a candidate without text is an
/// error; an empty string is returned as-is for the caller to judge.
pub fn parse_generation_response(body: &Value) -> Result<String> {
    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        return Err(Error::Generation(format!("prompt blocked: {reason}")));
    }
    let candidate = body["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| Error::Generation("missing 'candidates' in response".to_string()))?;
    let Some(parts) = candidate["content"]["parts"].as_array() else {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        return Err(Error::Generation(format!("candidate has no content (finish reason: {reason})")));
    };
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if let Some(reason) = candidate["finishReason"].as_str() {
        if reason != "STOP" {
            warn!(finish_reason = reason, "generation finished early");
        }
    }
    Ok(text)
}

/// Extract `embeddings[*].values` in request order.
pub fn parse_embedding_response(body: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = body["embeddings"]
        .as_array()
        .ok_or_else(|| Error::Embedding("missing 'embeddings' in response".to_string()))?;
    embeddings
        .iter()
        .map(|e| {
            let values = e["values"]
                .as_array()
                .ok_or_else(|| Error::Embedding("embedding without 'values'".to_string()))?;
            values
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32).ok_or_else(|| Error::Embedding("non-numeric embedding value".to_string())))
                .collect()
        })
        .collect()
}

/// Human-readable summary of a failed HTTP call.
pub fn http_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());
    match status {
        401 | 403 => format!("Gemini rejected the API key (HTTP {status}): {detail}"),
        429 => format!("Gemini rate limit exceeded (HTTP 429): {detail}"),
        _ => format!("HTTP {status} from Gemini API: {detail}"),
    }
}
