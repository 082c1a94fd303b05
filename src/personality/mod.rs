//! Personality profiles — free-text styling hints attached to the
//! active character, supplied by the host's persistence layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Styling profile for the active character. All fields are free text
/// authored by the user; any of them may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personality {
    /// Display name, used only for logging.
    #[serde(default)]
    pub name: String,
    /// Replaces the composer's character-identity phrase when set.
    pub base_character_identity: Option<String>,
    /// Replaces the configured style keywords when set.
    pub style_keywords: Option<String>,
    /// Replaces the configured quality keywords when set.
    pub quality_keywords: Option<String>,
    pub preferred_clothing_style: Option<String>,
    pub typical_environment_keywords: Option<String>,
    pub art_style_modifiers: Option<String>,
}

/// Source of the active personality, owned by the host application.
///
/// Lookups are best-effort: the orchestrator treats an `Err` the same
/// as `Ok(None)` apart from a logged warning.
#[async_trait]
pub trait PersonalitySource: Send + Sync {
    async fn active_personality(&self) -> Result<Option<Personality>, String>;
}

/// Source with no personality, for hosts without a personality layer.
pub struct NoPersonality;

#[async_trait]
impl PersonalitySource for NoPersonality {
    async fn active_personality(&self) -> Result<Option<Personality>, String> {
        Ok(None)
    }
}

/// Fixed in-memory source, mainly useful in tests and simple hosts.
pub struct StaticPersonality(pub Personality);

#[async_trait]
impl PersonalitySource for StaticPersonality {
    async fn active_personality(&self) -> Result<Option<Personality>, String> {
        Ok(Some(self.0.clone()))
    }
}
