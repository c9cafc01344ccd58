//! Streaming chat client for an Ollama-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vicinity_core::{Error, Result};

use crate::provider::{GenerationClient, GenerationRequest};
use crate::stream::StreamAccumulator;

/// Generation service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds; none means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Retries for transport failures; 0 disables the retry wrapper.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_endpoint() -> String {
    "http://localhost:11434/api/chat".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_max_retries() -> u32 {
    2
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: None,
            max_retries: default_max_retries(),
        }
    }
}

/// Client for the `/api/chat` streaming endpoint.
///
/// The response body is newline-delimited JSON; it is read chunk by chunk
/// into a [`StreamAccumulator`] and the concatenated text is returned.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for `endpoint` with no request timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from configuration.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    /// The chat endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body(request: &GenerationRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "messages": request.messages(),
        })
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        log::debug!("POST {} (model {})", self.endpoint, request.model);

        let mut response = self
            .client
            .post(&self.endpoint)
            .json(&Self::body(&request))
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Failed to reach {}: {e}", self.endpoint)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::upstream(format!(
                "Chat endpoint returned {status}: {error_text}"
            )));
        }

        let mut acc = StreamAccumulator::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::upstream(format!("Stream interrupted: {e}")))?
        {
            acc.push(&chunk);
        }
        Ok(acc.finish())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
