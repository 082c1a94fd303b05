//! Emotion/Intent Analyzer — keyword heuristics mapping AI response
//! text to avatar expression, pose, action and a show/hide decision.
//!
//! Deliberately simple: the tables are tuned to one character's fixed
//! vocabulary, not a general sentiment engine. The analyzer sits behind
//! a strategy trait so a smarter classifier can replace it without
//! touching the orchestration pipeline.

use lazy_static::lazy_static;
use regex::Regex;

// ── Types ──────────────────────────────────────────────

/// What the avatar should convey after an AI response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionalContext {
    pub expression: Option<String>,
    pub action: Option<String>,
    pub pose: Option<String>,
    pub should_show: bool,
}

/// Complete, defaulted scene parameters derived from an explicit
/// AI-authored description. Never partial.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePresets {
    pub expression: String,
    pub pose: String,
    pub action: String,
    pub lighting: String,
    pub background: String,
}

impl Default for ScenePresets {
    fn default() -> Self {
        Self {
            expression: "neutral".to_string(),
            pose: "standing".to_string(),
            action: "none".to_string(),
            lighting: "soft ambient lighting".to_string(),
            background: "cozy room interior".to_string(),
        }
    }
}

/// Swappable analysis strategy.
pub trait IntentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> EmotionalContext;
    fn params_from_description(&self, description: &str) -> ScenePresets;
}

// ── Keyword Tables ─────────────────────────────────────

lazy_static! {
    static ref RE_ROLEPLAY_SPAN: Regex = Regex::new(r"\*([^*]+)\*").unwrap();
}

// Ordered: the first matching keyword wins per category.
const EXPRESSION_CUES: &[(&str, &str)] = &[
    ("laugh", "happy"),
    ("giggle", "happy"),
    ("grin", "happy"),
    ("smile", "happy"),
    ("beam", "happy"),
    ("blush", "shy"),
    ("cry", "sad"),
    ("sob", "sad"),
    ("sigh", "sad"),
    ("frown", "sad"),
    ("gasp", "surprised"),
    ("bounce", "excited"),
    ("sparkle", "excited"),
    ("ponder", "thinking"),
    ("think", "thinking"),
    ("tilt", "curious"),
    ("pout", "angry"),
    ("glare", "angry"),
    ("yawn", "sleepy"),
    ("fidget", "worried"),
    ("smirk", "smug"),
];

const POSE_CUES: &[(&str, &str)] = &[
    ("sit", "sitting"),
    ("lean", "leaning"),
    ("kneel", "kneeling"),
    ("lie", "lying"),
    ("walk", "walking"),
    ("jump", "jumping"),
    ("stand", "standing"),
];

const ACTION_CUES: &[(&str, &str)] = &[
    ("wave", "wave"),
    ("dance", "dance"),
    ("point", "point"),
    ("nod", "nod"),
    ("stretch", "stretch"),
    ("read", "reading"),
    ("sip", "drinking"),
    ("drink", "drinking"),
];

const POSITIVE_ADJECTIVES: &[&str] = &[
    "great",
    "awesome",
    "amazing",
    "wonderful",
    "fantastic",
    "excellent",
    "love",
    "perfect",
    "cool",
    "brilliant",
];

const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who", "which"];

const REFLECTIVE_PHRASES: &[&str] = &[
    "let me think",
    "hmm",
    "i wonder",
    "thinking about",
    "let's see",
    "that's a tough one",
];

const GREETINGS: &[&str] = &[
    "hello",
    "hi there",
    "hey there",
    "good morning",
    "good evening",
    "welcome back",
];

// Description tables are separate from the roleplay-span tables: an
// AI-authored scene brief uses scene vocabulary, not stage directions.
const DESC_EXPRESSION: &[(&str, &str)] = &[
    ("smil", "happy"),
    ("laugh", "happy"),
    ("happy", "happy"),
    ("cheer", "happy"),
    ("excit", "excited"),
    ("surpris", "surprised"),
    ("blush", "shy"),
    ("shy", "shy"),
    ("sad", "sad"),
    ("tear", "sad"),
    ("curious", "curious"),
    ("thought", "thinking"),
    ("think", "thinking"),
    ("angry", "angry"),
    ("sleep", "sleepy"),
    ("drowsy", "sleepy"),
];

const DESC_POSE: &[(&str, &str)] = &[
    ("sitting", "sitting"),
    ("seated", "sitting"),
    ("leaning", "leaning"),
    ("lying", "lying"),
    ("kneeling", "kneeling"),
    ("walking", "walking"),
    ("jumping", "jumping"),
    ("standing", "standing"),
];

const DESC_ACTION: &[(&str, &str)] = &[
    ("waving", "wave"),
    ("dancing", "dance"),
    ("pointing", "point"),
    ("stretching", "stretch"),
    ("reading", "reading"),
    ("book", "reading"),
    ("coffee", "drinking"),
    ("tea", "drinking"),
    ("drinking", "drinking"),
];

const DESC_LIGHTING: &[(&str, &str)] = &[
    ("sunset", "golden hour sunlight"),
    ("sunrise", "soft dawn light"),
    ("night", "dim moonlight"),
    ("moonlit", "dim moonlight"),
    ("rain", "overcast diffused light"),
    ("storm", "overcast diffused light"),
    ("neon", "neon glow"),
    ("candle", "warm candlelight"),
    ("morning", "bright morning light"),
];

const DESC_BACKGROUND: &[(&str, &str)] = &[
    ("rain", "rainy city street"),
    ("beach", "sunny beach"),
    ("forest", "forest clearing"),
    ("park", "green park"),
    ("cafe", "cozy cafe interior"),
    ("coffee shop", "cozy cafe interior"),
    ("library", "library interior"),
    ("city", "city street"),
    ("snow", "snowy field"),
    ("office", "tidy office"),
    ("kitchen", "bright kitchen"),
    ("garden", "flower garden"),
];

fn first_cue(content: &str, cues: &[(&str, &str)]) -> Option<String> {
    cues.iter()
        .find(|(keyword, _)| content.contains(keyword))
        .map(|(_, mapped)| mapped.to_string())
}

// ── Keyword Analyzer ───────────────────────────────────

#[derive(Debug, Default)]
pub struct KeywordIntentAnalyzer;

impl IntentAnalyzer for KeywordIntentAnalyzer {
    fn analyze(&self, text: &str) -> EmotionalContext {
        let mut context = EmotionalContext::default();

        // Pass 1: *roleplay spans* are explicit stage directions. Any
        // span shows the avatar; later spans overwrite earlier matches
        // per category.
        for captures in RE_ROLEPLAY_SPAN.captures_iter(text) {
            context.should_show = true;
            let content = captures[1].to_lowercase();
            if let Some(expression) = first_cue(&content, EXPRESSION_CUES) {
                context.expression = Some(expression);
            }
            if let Some(pose) = first_cue(&content, POSE_CUES) {
                context.pose = Some(pose);
            }
            if let Some(action) = first_cue(&content, ACTION_CUES) {
                context.action = Some(action);
            }
        }

        // Pass 2: whole-message fallback, only when pass 1 found no
        // expression. First matching branch applies.
        if context.expression.is_none() {
            let lower = text.to_lowercase();
            if lower.contains('!') && POSITIVE_ADJECTIVES.iter().any(|w| lower.contains(w)) {
                context.expression = Some("excited".to_string());
                context.should_show = true;
            } else if lower.contains('?') && QUESTION_WORDS.iter().any(|w| lower.contains(w)) {
                context.expression = Some("curious".to_string());
                context.should_show = true;
            } else if REFLECTIVE_PHRASES.iter().any(|p| lower.contains(p)) {
                context.expression = Some("thinking".to_string());
                context.should_show = true;
            } else if GREETINGS.iter().any(|g| lower.contains(g)) {
                context.expression = Some("happy".to_string());
                context.action = Some("wave".to_string());
                context.should_show = true;
            }
        }

        context
    }

    fn params_from_description(&self, description: &str) -> ScenePresets {
        let lower = description.to_lowercase();
        let mut presets = ScenePresets::default();

        if let Some(expression) = first_cue(&lower, DESC_EXPRESSION) {
            presets.expression = expression;
        }
        if let Some(pose) = first_cue(&lower, DESC_POSE) {
            presets.pose = pose;
        }
        if let Some(action) = first_cue(&lower, DESC_ACTION) {
            presets.action = action;
        }
        if let Some(lighting) = first_cue(&lower, DESC_LIGHTING) {
            presets.lighting = lighting;
        }
        if let Some(background) = first_cue(&lower, DESC_BACKGROUND) {
            presets.background = background;
        }

        presets
    }
}
