//! Avatar visual state — the single mutable record driving what the
//! presentation layer renders.

use serde::{Deserialize, Serialize};

// ── Position ───────────────────────────────────────────

/// Where the avatar is anchored on screen. Closed set; anything else in
/// a `[POSITION: ...]` token is ignored at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    Left,
    Right,
    Center,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "left" => Some(Position::Left),
            "right" => Some(Position::Right),
            "center" => Some(Position::Center),
            "bottom-left" | "bottom_left" => Some(Position::BottomLeft),
            "bottom-right" | "bottom_right" => Some(Position::BottomRight),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
            Position::Center => "center",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }
}

// ── Avatar State ───────────────────────────────────────

/// Externally observable avatar state. Owned by the controller and
/// mutated only through its command/generation methods; hosts may
/// persist it and restore via `set_state` (the image reference is
/// deliberately dropped on restore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarState {
    pub visible: bool,
    pub expression: String,
    pub pose: String,
    pub action: String,
    pub gesture: Option<String>,
    pub position: Position,
    pub scale: f32,
    pub opacity: f32,

    /// Transient; reset automatically after the animation window.
    pub is_animating: bool,
    pub is_generating: bool,
    pub has_error: bool,
    pub error_message: Option<String>,

    /// Remote URL or locally-owned reference to the current image.
    pub image_url: Option<String>,
    /// One-shot presentation hint; cleared by the next command.
    pub pulse: bool,
    /// Epoch millis, strictly increasing across mutations.
    pub last_update: i64,
}

impl Default for AvatarState {
    fn default() -> Self {
        Self {
            visible: false,
            expression: "neutral".to_string(),
            pose: "standing".to_string(),
            action: "none".to_string(),
            gesture: None,
            position: Position::BottomRight,
            scale: 1.0,
            opacity: 1.0,
            is_animating: false,
            is_generating: false,
            has_error: false,
            error_message: None,
            image_url: None,
            pulse: false,
            last_update: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl AvatarState {
    /// Refresh `last_update`, keeping it strictly increasing even when
    /// two mutations land within the same millisecond.
    pub fn touch(&mut self) {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_update = now.max(self.last_update + 1);
    }
}
