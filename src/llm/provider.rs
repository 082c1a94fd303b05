//! Text Provider trait — common interface for language-model backends
//! used to author creative image prompts.

use async_trait::async_trait;

// ── Common Parameters ──────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TextGenOptions {
    /// System message prepended to the request.
    pub system_message: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Common interface for text providers (OpenAI-compatible backends,
/// local runtimes, test fakes).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// One-shot completion: `input` is the user-role content.
    async fn generate_text(&self, input: &str, options: TextGenOptions)
        -> Result<String, String>;

    /// Provider identifier (e.g. "openai").
    fn id(&self) -> &str;
}
