pub mod analyzer;
pub mod commands;
pub mod controller;
pub mod generation;
pub mod state;

#[cfg(test)]
mod tests;

pub use analyzer::{EmotionalContext, IntentAnalyzer, KeywordIntentAnalyzer, ScenePresets};
pub use commands::{
    parse_command_tags, parse_narrative_tags, AvatarCommand, CommandKey, CommandParse,
    NarrativeParse, PhotoRequest,
};
pub use controller::{AvatarController, StateCallback};
pub use generation::{dedup_hash, VariationOptions};
pub use state::{AvatarState, Position};
