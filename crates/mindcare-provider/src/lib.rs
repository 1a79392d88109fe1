pub mod error;
pub mod generator;
pub mod ollama;
pub mod prompt;

use async_trait::async_trait;

pub use error::InsightError;
pub use generator::InsightGenerator;
pub use ollama::OllamaProvider;
pub use prompt::{build_prompt, parse_completion, Completion};

/// Text-generation backend for insight enrichment.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, InsightError>;
    async fn health(&self) -> Result<(), InsightError> {
        Ok(())
    }
}

// ============================================================
// Stub Provider
// ============================================================

/// Returns a fixed completion, or a fixed error when built with [`StubProvider::failing`].
#[derive(Debug, Clone)]
pub struct StubProvider {
    response: Option<String>,
}

impl StubProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl InsightProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, InsightError> {
        self.response
            .clone()
            .ok_or_else(|| InsightError::Connect("stub provider is offline".to_string()))
    }

    async fn health(&self) -> Result<(), InsightError> {
        match self.response {
            Some(_) => Ok(()),
            None => Err(InsightError::Connect("stub provider is offline".to_string())),
        }
    }
}
