//! Prompt Composer — turns generation parameters into structured
//! components, then a compiled prompt and negative prompt.
//!
//! Composition is deterministic: the same parameters (including the
//! variation seed) always produce the same prompt, so dedup hashing
//! upstream stays meaningful.

use crate::personality::Personality;
use serde::{Deserialize, Serialize};

// ── Generation Parameters ──────────────────────────────

/// Canonical description of one desired avatar image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub expression: String,
    pub pose: String,
    pub action: String,
    pub style: String,
    pub background: String,
    pub lighting: String,
    pub quality: String,
    /// Explicit creative brief authored by the AI, when present.
    pub ai_description: Option<String>,
    pub variation_seed: Option<u64>,
    #[serde(default)]
    pub contextual_keywords: Vec<String>,
    /// Prompt already authored by a meta-prompting pass, when present.
    pub meta_generated_image_prompt: Option<String>,
}

// ── Prompt Components ──────────────────────────────────

/// Structured decomposition of a prompt before compilation. Carries the
/// variation seed and contextual keywords through for traceability.
#[derive(Debug, Clone, Serialize)]
pub struct PromptComponents {
    pub character_identity: String,
    pub style_keywords: String,
    pub quality_keywords: String,
    pub expression_phrase: String,
    pub pose_phrase: String,
    pub action_phrase: String,
    pub lighting: String,
    pub setting: String,
    pub negative_exclusions: Vec<String>,
    pub variation_seed: Option<u64>,
    pub contextual_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub final_prompt: String,
    pub negative_prompt: String,
    pub components: PromptComponents,
}

// ── Lookup Tables ──────────────────────────────────────

const DEFAULT_CHARACTER_IDENTITY: &str =
    "1girl, young woman with long silver hair and violet eyes, solo";

const NEUTRAL_PHRASE: &str = "calm neutral expression";

const EXPRESSION_PHRASES: &[(&str, &str)] = &[
    ("neutral", "calm neutral expression"),
    ("happy", "bright smile, cheerful expression"),
    ("excited", "sparkling eyes, excited open-mouth smile"),
    ("curious", "head tilted, curious wide eyes"),
    ("thinking", "thoughtful look, finger on chin"),
    ("sad", "downcast eyes, melancholy expression"),
    ("surprised", "wide eyes, parted lips, surprised"),
    ("shy", "blushing, averted gaze"),
    ("smug", "confident smirk"),
    ("worried", "furrowed brow, uneasy expression"),
    ("angry", "sharp glare, frowning"),
    ("sleepy", "half-closed eyes, drowsy expression"),
];

const POSE_PHRASES: &[(&str, &str)] = &[
    ("standing", "standing upright, relaxed posture"),
    ("sitting", "sitting comfortably"),
    ("leaning", "leaning forward slightly"),
    ("lying", "lying down, relaxed"),
    ("kneeling", "kneeling gracefully"),
    ("walking", "mid-stride, walking"),
    ("jumping", "jumping with energy"),
    ("crossed_arms", "arms crossed"),
];

const ACTION_PHRASES: &[(&str, &str)] = &[
    ("none", ""),
    ("wave", "waving at the viewer"),
    ("dance", "dancing playfully"),
    ("point", "pointing forward"),
    ("nod", "nodding"),
    ("stretch", "stretching arms overhead"),
    ("reading", "holding an open book"),
    ("drinking", "holding a steaming mug"),
];

const NEGATIVE_EXCLUSIONS: &[&str] = &[
    "blurry",
    "low quality",
    "bad anatomy",
    "deformed hands",
    "extra fingers",
    "extra limbs",
    "watermark",
    "text",
    "signature",
];

/// Flourishes picked deterministically by the variation seed so repeat
/// requests with the same seed compile identically.
const VARIATION_FLOURISHES: &[&str] = &[
    "subtle depth of field",
    "dynamic angle",
    "gentle bloom",
    "wind-swept hair",
    "soft bokeh background",
    "slight low-angle shot",
];

/// Scene words the composer is allowed to lift from conversation
/// context into contextual keywords.
const CONTEXT_SCENE_WORDS: &[&str] = &[
    "rain", "snow", "sunset", "sunrise", "night", "beach", "park", "forest", "city", "coffee",
    "tea", "stars", "storm", "autumn", "spring", "winter", "summer",
];

fn phrase_for(table: &[(&str, &str)], key: &str, fallback: &str) -> String {
    let lower = key.trim().to_lowercase();
    table
        .iter()
        .find(|(k, _)| *k == lower)
        .map(|(_, phrase)| phrase.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn quality_keywords_for(tier: &str) -> String {
    match tier.trim().to_lowercase().as_str() {
        "high" | "hd" | "best" => "masterpiece, best quality, ultra detailed".to_string(),
        "draft" | "fast" => "simple shading, sketch quality".to_string(),
        _ => "high quality, detailed".to_string(),
    }
}

// ── Composition ────────────────────────────────────────

/// Compose a prompt from parameters, optionally modified by the active
/// personality and recent conversation context.
pub fn compose(
    params: &GenerationParameters,
    personality: Option<&Personality>,
    conversation_context: Option<&str>,
) -> ComposedPrompt {
    // Personality identity/style/quality overrides replace the defaults
    // before any component is generated.
    let identity = personality
        .and_then(|p| p.base_character_identity.clone())
        .unwrap_or_else(|| DEFAULT_CHARACTER_IDENTITY.to_string());
    let style = personality
        .and_then(|p| p.style_keywords.clone())
        .unwrap_or_else(|| params.style.clone());
    let quality = personality
        .and_then(|p| p.quality_keywords.clone())
        .unwrap_or_else(|| quality_keywords_for(&params.quality));

    let mut components = PromptComponents {
        character_identity: identity,
        style_keywords: style,
        quality_keywords: quality,
        expression_phrase: phrase_for(EXPRESSION_PHRASES, &params.expression, NEUTRAL_PHRASE),
        pose_phrase: phrase_for(POSE_PHRASES, &params.pose, "standing upright, relaxed posture"),
        action_phrase: phrase_for(ACTION_PHRASES, &params.action, ""),
        lighting: params.lighting.clone(),
        setting: params.background.clone(),
        negative_exclusions: NEGATIVE_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        variation_seed: params.variation_seed,
        contextual_keywords: params.contextual_keywords.clone(),
    };

    if let Some(personality) = personality {
        modify_components(
            &mut components,
            personality,
            conversation_context,
            params.ai_description.is_some(),
            params.meta_generated_image_prompt.is_some(),
        );
    }

    let final_prompt = match &params.meta_generated_image_prompt {
        // A meta-authored prompt replaces local compilation wholesale.
        Some(meta) => meta.clone(),
        None => compile(&components, params.ai_description.as_deref()),
    };
    let negative_prompt = components.negative_exclusions.join(", ");

    ComposedPrompt {
        final_prompt,
        negative_prompt,
        components,
    }
}

/// Personality-aware modification pass over freshly generated
/// components. Deterministic for a fixed variation seed.
fn modify_components(
    components: &mut PromptComponents,
    personality: &Personality,
    conversation_context: Option<&str>,
    has_ai_description: bool,
    meta_active: bool,
) {
    if let Some(clothing) = &personality.preferred_clothing_style {
        components.character_identity =
            format!("{}, wearing {}", components.character_identity, clothing);
    }
    if let Some(environment) = &personality.typical_environment_keywords {
        // An explicit AI description owns the scene; don't fight it.
        if !has_ai_description {
            components.setting = environment.clone();
        }
    }
    if let Some(modifiers) = &personality.art_style_modifiers {
        components.style_keywords = format!("{}, {}", components.style_keywords, modifiers);
    }

    if let Some(context) = conversation_context {
        let lower = context.to_lowercase();
        for word in CONTEXT_SCENE_WORDS {
            if lower.contains(word) && !components.contextual_keywords.iter().any(|k| k == word) {
                components.contextual_keywords.push(word.to_string());
            }
        }
    }

    // Seeded flourish, skipped when a meta pass will author the prompt.
    if !meta_active {
        if let Some(seed) = components.variation_seed {
            let flourish = VARIATION_FLOURISHES[(seed as usize) % VARIATION_FLOURISHES.len()];
            components.style_keywords = format!("{}, {}", components.style_keywords, flourish);
        }
    }
}

/// Concatenate components in fixed order. An explicit AI description is
/// prefixed verbatim and the compiled remainder is reduced to the
/// styling phrase (identity, style, quality, lighting).
fn compile(components: &PromptComponents, ai_description: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(description) = ai_description {
        parts.push(description.to_string());
        parts.push(components.character_identity.clone());
        parts.push(components.style_keywords.clone());
        parts.push(components.quality_keywords.clone());
        parts.push(components.lighting.clone());
    } else {
        parts.push(components.character_identity.clone());
        parts.push(components.expression_phrase.clone());
        parts.push(components.pose_phrase.clone());
        parts.push(components.action_phrase.clone());
        parts.push(components.style_keywords.clone());
        parts.push(components.quality_keywords.clone());
        parts.push(components.lighting.clone());
        parts.push(components.setting.clone());
        parts.extend(components.contextual_keywords.iter().cloned());
    }

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Negative-Prompt Capability Gate ────────────────────

const NEGATIVE_ALLOW: &[&str] = &["replicate", "stability", "runpod"];
const NEGATIVE_DENY: &[&str] = &[
    "flux",
    "midjourney",
    "dalle",
    "imagen",
    "minimax/video-01",
    "minimax/image-01",
];

/// Whether the active provider/model accepts a negative prompt.
/// Deny rules take precedence; a name matching neither list is denied.
pub fn negative_prompt_allowed(provider_id: &str, model: Option<&str>) -> bool {
    let haystack = format!("{} {}", provider_id, model.unwrap_or("")).to_lowercase();
    if NEGATIVE_DENY.iter().any(|needle| haystack.contains(needle)) {
        return false;
    }
    NEGATIVE_ALLOW
        .iter()
        .any(|needle| haystack.contains(needle))
}
