//! Retry wrapper for generation clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use vicinity_core::{Error, Result};

use crate::provider::{GenerationClient, GenerationRequest};

/// Wraps a generation client with exponential-backoff retries.
///
/// Only retryable errors (`UpstreamUnavailable`) are retried; everything
/// else is returned on the first failure.
pub struct RetryWrapper {
    inner: Arc<dyn GenerationClient>,
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryWrapper {
    /// Creates a new retry wrapper with default settings.
    ///
    /// Default settings:
    /// - Max retries: 3
    /// - Initial delay: 1 second
    /// - Max delay: 10 seconds
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            inner: client,
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Sets the maximum number of retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the initial delay between retries.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn should_retry(error: &Error) -> bool {
        let retry = error.is_retryable();
        if retry {
            log::warn!("Generation failed, retrying: {error}");
        }
        retry
    }
}

#[async_trait]
impl GenerationClient for RetryWrapper {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize);

        let client = self.inner.clone();
        (|| async { client.generate(request.clone()).await })
            .retry(backoff)
            .when(Self::should_retry)
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
