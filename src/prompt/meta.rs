//! Meta-Prompt Delegator — hands creative prompt authorship to a
//! language-model provider.
//!
//! The delegation is strictly best-effort: any provider failure falls
//! back to local composition upstream. No retry is attempted.

use crate::llm::{TextGenOptions, TextProvider};
use crate::personality::Personality;

/// Fixed creative brief sent as the system message. The 7-part
/// structure keeps authored prompts usable across image backends.
pub const CREATIVE_DIRECTOR_BRIEF: &str = r#"You are a creative director writing prompts for an image-generation model.
Write ONE prompt describing a single portrait of the character. Output the prompt text only — no preamble, no quotes, no markdown.

The prompt must cover, in order:
1. Subject — who the character is, physical identity.
2. Pose and expression.
3. Setting — where the scene takes place.
4. Atmosphere and artistic style.
5. Lighting.
6. Camera and composition.
7. Realism details — texture, material, rendering quality.

Keep it under 120 words. Comma-separated phrases, no full sentences required."#;

/// Maximum conversation-context characters carried in the request.
const MAX_CONTEXT_CHARS: usize = 600;

const META_TEMPERATURE: f32 = 0.9;
const META_MAX_TOKENS: u32 = 350;

/// Everything the delegator knows about the current request.
pub struct MetaPromptContext<'a> {
    pub expression: &'a str,
    pub pose: &'a str,
    pub action: &'a str,
    pub ai_description: Option<&'a str>,
    pub conversation_context: Option<&'a str>,
    pub personality: Option<&'a Personality>,
}

/// Ask the text provider to author a prompt. Returns the authored text
/// verbatim (trimmed); the caller decides what a failure falls back to.
pub async fn author_prompt(
    provider: &dyn TextProvider,
    context: &MetaPromptContext<'_>,
) -> Result<String, String> {
    let input = build_context_block(context);

    let authored = provider
        .generate_text(
            &input,
            TextGenOptions {
                system_message: Some(CREATIVE_DIRECTOR_BRIEF.to_string()),
                temperature: Some(META_TEMPERATURE),
                max_tokens: Some(META_MAX_TOKENS),
            },
        )
        .await?;

    let authored = authored.trim();
    if authored.is_empty() {
        return Err("Provider returned an empty prompt".to_string());
    }
    Ok(authored.to_string())
}

fn build_context_block(context: &MetaPromptContext<'_>) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Current avatar state: expression={}, pose={}, action={}",
        context.expression, context.pose, context.action
    ));

    if let Some(description) = context.ai_description {
        lines.push(format!("Explicit scene request: {}", description));
    }

    if let Some(personality) = context.personality {
        if let Some(identity) = &personality.base_character_identity {
            lines.push(format!("Character identity: {}", identity));
        }
        if let Some(clothing) = &personality.preferred_clothing_style {
            lines.push(format!("Typical clothing: {}", clothing));
        }
        if let Some(environment) = &personality.typical_environment_keywords {
            lines.push(format!("Typical environment: {}", environment));
        }
        if let Some(style) = &personality.art_style_modifiers {
            lines.push(format!("Art style: {}", style));
        }
    }

    if let Some(conversation) = context.conversation_context {
        lines.push(format!(
            "Recent conversation:\n{}",
            truncate_tail(conversation, MAX_CONTEXT_CHARS)
        ));
    }

    lines.push("Write the image prompt now.".to_string());
    lines.join("\n")
}

/// Keep the most recent `max_chars` characters, cutting on a char
/// boundary. The tail carries the freshest conversational signal.
fn truncate_tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let (idx, _) = text.char_indices().nth(skip).unwrap_or((0, ' '));
    &text[idx..]
}
