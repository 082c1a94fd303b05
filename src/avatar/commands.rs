//! Tag parsing — structured `[AVATAR:...]` commands and the narrative
//! `[IMAGE:]` / `[POSITION:]` / `[HIDE]` dialect embedded in AI output.
//!
//! Parsing is tolerant: malformed values never fail the parse, and
//! every recognized token is stripped from the returned text whether or
//! not its content was usable.

use super::state::Position;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_AVATAR_TAG: Regex = Regex::new(r"\[AVATAR:([^\]]+)\]").unwrap();
    static ref RE_HIDE_TAG: Regex = Regex::new(r"\[HIDE\]").unwrap();
    static ref RE_IMAGE_TAG: Regex = Regex::new(r"\[IMAGE:([^\]]*)\]").unwrap();
    static ref RE_POSITION_TAG: Regex = Regex::new(r"\[POSITION:([^\]]*)\]").unwrap();
}

// ── Avatar Command ─────────────────────────────────────

/// Sparse instruction extracted from one `[AVATAR:...]` tag. Fields are
/// applied to state in the controller's fixed order, not field order.
#[derive(Debug, Clone, Default)]
pub struct AvatarCommand {
    pub position: Option<Position>,
    pub expression: Option<String>,
    pub action: Option<String>,
    pub gesture: Option<String>,
    pub pose: Option<String>,
    pub hide: Option<bool>,
    pub show: Option<bool>,
    pub fade: Option<bool>,
    pub pulse: Option<bool>,
    /// Unvalidated; a malformed number parses to NaN rather than
    /// failing the whole tag.
    pub scale: Option<f32>,
    /// Animation window override in milliseconds.
    pub duration: Option<u64>,
}

impl AvatarCommand {
    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.expression.is_none()
            && self.action.is_none()
            && self.gesture.is_none()
            && self.pose.is_none()
            && self.hide.is_none()
            && self.show.is_none()
            && self.fade.is_none()
            && self.pulse.is_none()
            && self.scale.is_none()
            && self.duration.is_none()
    }
}

/// Closed set of recognized tag keys. Keys outside this set are flagged
/// at parse time instead of being silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKey {
    Position,
    Expression,
    Action,
    Gesture,
    Pose,
    Hide,
    Show,
    Fade,
    Pulse,
    Scale,
    Duration,
}

impl CommandKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "position" => Some(CommandKey::Position),
            "expression" => Some(CommandKey::Expression),
            "action" => Some(CommandKey::Action),
            "gesture" => Some(CommandKey::Gesture),
            "pose" => Some(CommandKey::Pose),
            "hide" => Some(CommandKey::Hide),
            "show" => Some(CommandKey::Show),
            "fade" => Some(CommandKey::Fade),
            "pulse" => Some(CommandKey::Pulse),
            "scale" => Some(CommandKey::Scale),
            "duration" => Some(CommandKey::Duration),
            _ => None,
        }
    }
}

// ── Command-Tag Parsing ────────────────────────────────

#[derive(Debug, Clone)]
pub struct CommandParse {
    /// Input with every well-formed tag removed, trimmed once.
    pub clean_text: String,
    /// One command per tag, in extraction order.
    pub commands: Vec<AvatarCommand>,
    /// Keys that matched no `CommandKey`, for host diagnostics.
    pub unknown_keys: Vec<String>,
}

/// Extract every `[AVATAR:key=value,key=value,...]` tag from `text`.
pub fn parse_command_tags(text: &str) -> CommandParse {
    let mut commands = Vec::new();
    let mut unknown_keys = Vec::new();

    for captures in RE_AVATAR_TAG.captures_iter(text) {
        let body = &captures[1];
        let mut command = AvatarCommand::default();

        for pair in body.split(',') {
            let Some((raw_key, raw_value)) = pair.split_once('=') else {
                continue; // malformed pair, tolerated
            };
            let value = raw_value.trim();
            let Some(key) = CommandKey::parse(raw_key) else {
                let key = raw_key.trim().to_string();
                tracing::warn!("[Avatar] Unknown command key '{}' in tag", key);
                unknown_keys.push(key);
                continue;
            };

            match key {
                CommandKey::Position => command.position = Position::parse(value),
                CommandKey::Expression => command.expression = Some(value.to_string()),
                CommandKey::Action => command.action = Some(value.to_string()),
                CommandKey::Gesture => command.gesture = Some(value.to_string()),
                CommandKey::Pose => command.pose = Some(value.to_string()),
                CommandKey::Hide => command.hide = Some(value == "true"),
                CommandKey::Show => command.show = Some(value == "true"),
                CommandKey::Fade => command.fade = Some(value == "true"),
                CommandKey::Pulse => command.pulse = Some(value == "true"),
                CommandKey::Scale => command.scale = Some(value.parse().unwrap_or(f32::NAN)),
                CommandKey::Duration => command.duration = value.parse().ok(),
            }
        }

        commands.push(command);
    }

    CommandParse {
        clean_text: RE_AVATAR_TAG.replace_all(text, "").trim().to_string(),
        commands,
        unknown_keys,
    }
}

// ── Narrative-Tag Parsing ──────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRequest {
    pub description: String,
    pub position: Option<Position>,
}

#[derive(Debug, Clone)]
pub struct NarrativeParse {
    pub clean_text: String,
    /// Set when an `[IMAGE: ...]` token was present. A `[POSITION:]`
    /// token alone never produces a request.
    pub photo_request: Option<PhotoRequest>,
    pub hide_request: bool,
}

/// Extract the narrative dialect: `[IMAGE: <text>]`,
/// `[POSITION: <value>]`, `[HIDE]`.
pub fn parse_narrative_tags(text: &str) -> NarrativeParse {
    let hide_request = RE_HIDE_TAG.is_match(text);

    // Only the first image token is honored; the rest are stripped.
    let photo_request = RE_IMAGE_TAG.captures(text).map(|captures| {
        let description = captures[1].trim().to_string();
        let position = RE_POSITION_TAG
            .captures(text)
            .and_then(|p| Position::parse(&p[1]));
        PhotoRequest {
            description,
            position,
        }
    });

    let mut clean = RE_IMAGE_TAG.replace_all(text, "").to_string();
    clean = RE_POSITION_TAG.replace_all(&clean, "").to_string();
    clean = RE_HIDE_TAG.replace_all(&clean, "").to_string();

    NarrativeParse {
        clean_text: clean.trim().to_string(),
        photo_request,
        hide_request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_expression_and_action() {
        let parse = parse_command_tags("Hi [AVATAR:expression=happy,action=wave]");
        assert_eq!(parse.clean_text, "Hi");
        assert_eq!(parse.commands.len(), 1);
        let cmd = &parse.commands[0];
        assert_eq!(cmd.expression.as_deref(), Some("happy"));
        assert_eq!(cmd.action.as_deref(), Some("wave"));
        assert!(parse.unknown_keys.is_empty());
    }

    #[test]
    fn keys_are_case_insensitive_and_trimmed() {
        let parse = parse_command_tags("[AVATAR: Expression = shy , SHOW = true ]");
        let cmd = &parse.commands[0];
        assert_eq!(cmd.expression.as_deref(), Some("shy"));
        assert_eq!(cmd.show, Some(true));
    }

    #[test]
    fn boolean_values_compare_to_literal_true() {
        let parse = parse_command_tags("[AVATAR:hide=true,show=True,fade=yes]");
        let cmd = &parse.commands[0];
        assert_eq!(cmd.hide, Some(true));
        assert_eq!(cmd.show, Some(false));
        assert_eq!(cmd.fade, Some(false));
    }

    #[test]
    fn malformed_scale_becomes_nan() {
        let parse = parse_command_tags("[AVATAR:scale=big]");
        assert!(parse.commands[0].scale.unwrap().is_nan());
    }

    #[test]
    fn malformed_duration_is_dropped() {
        let parse = parse_command_tags("[AVATAR:duration=soon,scale=1.5]");
        let cmd = &parse.commands[0];
        assert_eq!(cmd.duration, None);
        assert_eq!(cmd.scale, Some(1.5));
    }

    #[test]
    fn unknown_keys_are_flagged_not_dropped_silently() {
        let parse = parse_command_tags("[AVATAR:sparkle=true,expression=happy]");
        assert_eq!(parse.unknown_keys, vec!["sparkle".to_string()]);
        assert_eq!(parse.commands[0].expression.as_deref(), Some("happy"));
    }

    #[test]
    fn multiple_tags_yield_commands_in_order() {
        let parse =
            parse_command_tags("[AVATAR:expression=happy] middle [AVATAR:expression=sad]");
        assert_eq!(parse.commands.len(), 2);
        assert_eq!(parse.commands[0].expression.as_deref(), Some("happy"));
        assert_eq!(parse.commands[1].expression.as_deref(), Some("sad"));
        assert_eq!(parse.clean_text, "middle");
    }

    #[test]
    fn invalid_position_value_is_ignored() {
        let parse = parse_command_tags("[AVATAR:position=everywhere]");
        assert_eq!(parse.commands[0].position, None);
        assert!(parse.unknown_keys.is_empty());
    }

    #[test]
    fn narrative_image_with_position() {
        let parse = parse_narrative_tags("[IMAGE: standing in rain][POSITION: center]");
        assert_eq!(parse.clean_text, "");
        assert_eq!(
            parse.photo_request,
            Some(PhotoRequest {
                description: "standing in rain".to_string(),
                position: Some(Position::Center),
            })
        );
        assert!(!parse.hide_request);
    }

    #[test]
    fn position_alone_never_produces_a_request() {
        let parse = parse_narrative_tags("[POSITION: center]");
        assert_eq!(parse.photo_request, None);
        assert_eq!(parse.clean_text, "");
    }

    #[test]
    fn invalid_position_is_ignored_but_stripped() {
        let parse = parse_narrative_tags("[IMAGE: at the beach][POSITION: nowhere] see?");
        let photo = parse.photo_request.unwrap();
        assert_eq!(photo.description, "at the beach");
        assert_eq!(photo.position, None);
        assert_eq!(parse.clean_text, "see?");
    }

    #[test]
    fn only_first_image_token_is_honored() {
        let parse = parse_narrative_tags("[IMAGE: first][IMAGE: second]");
        assert_eq!(parse.photo_request.unwrap().description, "first");
        assert_eq!(parse.clean_text, "");
    }

    #[test]
    fn hide_token_sets_hide_request() {
        let parse = parse_narrative_tags("Goodbye! [HIDE]");
        assert!(parse.hide_request);
        assert_eq!(parse.clean_text, "Goodbye!");
    }

    proptest! {
        #[test]
        fn clean_text_never_contains_well_formed_tags(
            filler in "[a-zA-Z0-9 .,!?]{0,40}",
            pairs in proptest::collection::vec(("(expression|pose|action|bogus)", "[a-z]{1,8}"), 1..4),
            tag_count in 0usize..4,
        ) {
            let tag_body = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",");
            let tag = format!("[AVATAR:{}]", tag_body);
            let mut text = filler.clone();
            for _ in 0..tag_count {
                text.push_str(&tag);
                text.push_str(&filler);
            }

            let parse = parse_command_tags(&text);
            prop_assert_eq!(parse.commands.len(), tag_count);
            prop_assert!(!parse.clean_text.contains("[AVATAR:"));
        }
    }
}
