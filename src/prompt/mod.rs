pub mod composer;
pub mod meta;

pub use composer::{
    compose, negative_prompt_allowed, ComposedPrompt, GenerationParameters, PromptComponents,
};
pub use meta::{author_prompt, MetaPromptContext, CREATIVE_DIRECTOR_BRIEF};
