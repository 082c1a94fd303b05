use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Error Types ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ImageGenError {
    GenerationFailed(String),
    Timeout(String),
    ConfigError(String),
    Unavailable(String),
}

impl fmt::Display for ImageGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageGenError::GenerationFailed(msg) => write!(f, "Generation failed: {}", msg),
            ImageGenError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ImageGenError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            ImageGenError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ImageGenError {}

impl From<ImageGenError> for String {
    fn from(e: ImageGenError) -> String {
        e.to_string()
    }
}

// ── Request / Response ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    /// Either a remote URL or a locally-owned reference (see
    /// [`crate::resource::is_local_ref`]).
    pub image_url: String,
}

// ── Provider Trait ─────────────────────────────────────

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Unique identifier for this provider instance (e.g. "sd_local").
    fn id(&self) -> String;

    /// Model/checkpoint name, when the provider knows it. Used by the
    /// negative-prompt capability gate.
    fn model(&self) -> Option<String>;

    /// Check if the provider is reachable/configured.
    async fn is_available(&self) -> bool;

    /// Generate one avatar image.
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResult, ImageGenError>;
}
