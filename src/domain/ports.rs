use crate::adapters::openai::api::{ChatRequest, ChatResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// An OpenAI-compatible chat completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Produces the two map screenshots the vision model compares.
#[async_trait]
pub trait ScreenshotProvider: Send + Sync {
    /// Map centered on `address` with a marker on it.
    async fn capture_pin_map(&self, address: &str) -> Result<PathBuf>;
    /// Color-coded neighborhood map with its legend.
    async fn capture_region_map(&self) -> Result<PathBuf>;
}
