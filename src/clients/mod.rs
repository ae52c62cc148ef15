pub mod gemini;

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation backend. One prompt in, the model's reply text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}
