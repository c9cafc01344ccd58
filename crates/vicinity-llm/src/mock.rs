//! Mock generation client for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use vicinity_core::{Error, Result};

use crate::provider::{GenerationClient, GenerationRequest};

/// Generation client that returns canned responses.
///
/// Responses are returned in order and cycle once exhausted. Every request
/// is recorded so tests can inspect the prompts the pipeline built.
#[derive(Clone, Default)]
pub struct MockGenerationClient {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    canned: Vec<String>,
    index: usize,
    requests: Vec<GenerationRequest>,
}

impl MockGenerationClient {
    /// Creates a mock with canned responses.
    ///
    /// # Examples
    ///
    /// ```
    /// use vicinity_llm::MockGenerationClient;
    ///
    /// let client = MockGenerationClient::new(vec![
    ///     "First response".to_string(),
    ///     "Second response".to_string(),
    /// ]);
    /// ```
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                canned: responses,
                ..Default::default()
            })),
        }
    }

    /// Creates a mock with a single response.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Prompts received so far, in order.
    pub async fn prompts(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let mut state = self.state.lock().await;
        state.requests.push(request);

        if state.canned.is_empty() {
            return Err(Error::operation("mock generation client has no responses"));
        }
        let content = state.canned[state.index].clone();
        state.index = (state.index + 1) % state.canned.len();
        Ok(content)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
