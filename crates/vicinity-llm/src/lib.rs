//! Generation client abstraction and implementations for Vicinity.
//!
//! - [`GenerationClient`]: "prompt → text" behind an async trait
//! - [`OllamaClient`]: streaming NDJSON chat endpoint client
//! - [`StreamAccumulator`]: reassembles the streamed answer
//! - [`RetryWrapper`]: exponential backoff for transport failures
//! - [`MockGenerationClient`]: canned answers for tests

mod mock;
mod ollama;
mod provider;
mod retry;
mod stream;

pub use mock::MockGenerationClient;
pub use ollama::{GenerationConfig, OllamaClient};
pub use provider::{GenerationClient, GenerationRequest, Message, Role};
pub use retry::RetryWrapper;
pub use stream::StreamAccumulator;

use std::sync::Arc;
use std::time::Duration;

use vicinity_core::Result;

/// Build the configured client, wrapped in retries when enabled.
pub fn create_generation_client(config: &GenerationConfig) -> Result<Arc<dyn GenerationClient>> {
    let client: Arc<dyn GenerationClient> = Arc::new(OllamaClient::from_config(config)?);
    if config.max_retries == 0 {
        return Ok(client);
    }
    Ok(Arc::new(
        RetryWrapper::new(client)
            .with_max_retries(config.max_retries)
            .with_initial_delay(Duration::from_millis(500)),
    ))
}
