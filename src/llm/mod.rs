pub mod openai;
pub mod provider;

pub use openai::OpenAITextProvider;
pub use provider::{TextGenOptions, TextProvider};
