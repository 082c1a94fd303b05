use super::helpers::*;
use crate::avatar::commands::AvatarCommand;
use crate::avatar::state::Position;

fn cmd() -> AvatarCommand {
    AvatarCommand::default()
}

#[tokio::test]
async fn hide_and_show_together_end_visible() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let command = AvatarCommand {
        hide: Some(true),
        show: Some(true),
        ..cmd()
    };
    controller.apply_command(&command).await;
    assert!(controller.state().await.visible);
}

#[tokio::test]
async fn expression_change_triggers_generation_when_visible() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider.clone());

    let command = AvatarCommand {
        show: Some(true),
        expression: Some("happy".to_string()),
        ..cmd()
    };
    controller.apply_command(&command).await;

    assert_eq!(provider.request_count(), 1);
    let state = controller.state().await;
    assert_eq!(state.expression, "happy");
    assert_eq!(state.image_url.as_deref(), Some("blob:auto-0"));
}

#[tokio::test]
async fn unchanged_expression_does_not_regenerate() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider.clone());

    let command = AvatarCommand {
        show: Some(true),
        expression: Some("happy".to_string()),
        ..cmd()
    };
    controller.apply_command(&command).await;
    controller.apply_command(&command).await;

    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn hidden_avatar_never_generates() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider.clone());

    let command = AvatarCommand {
        expression: Some("happy".to_string()),
        ..cmd()
    };
    controller.apply_command(&command).await;

    assert_eq!(provider.request_count(), 0);
    assert_eq!(controller.state().await.expression, "happy");
}

#[tokio::test]
async fn action_and_gesture_update_without_regeneration() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider.clone());

    let command = AvatarCommand {
        show: Some(true),
        action: Some("wave".to_string()),
        gesture: Some("peace-sign".to_string()),
        scale: Some(1.3),
        ..cmd()
    };
    controller.apply_command(&command).await;

    assert_eq!(provider.request_count(), 0);
    let state = controller.state().await;
    assert_eq!(state.action, "wave");
    assert_eq!(state.gesture.as_deref(), Some("peace-sign"));
    assert!((state.scale - 1.3).abs() < f32::EPSILON);
}

#[tokio::test]
async fn fade_applies_configured_opacity() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let command = AvatarCommand {
        fade: Some(true),
        ..cmd()
    };
    controller.apply_command(&command).await;
    let state = controller.state().await;
    assert!((state.opacity - 0.4).abs() < f32::EPSILON);
}

#[tokio::test]
async fn nan_scale_is_applied_verbatim() {
    // Malformed tag numbers are a tolerated, defined edge case.
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let command = AvatarCommand {
        scale: Some(f32::NAN),
        ..cmd()
    };
    controller.apply_command(&command).await;
    assert!(controller.state().await.scale.is_nan());
}

#[tokio::test]
async fn pulse_is_cleared_by_the_next_command() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let pulse = AvatarCommand {
        pulse: Some(true),
        ..cmd()
    };
    controller.apply_command(&pulse).await;
    assert!(controller.state().await.pulse);

    controller.apply_command(&cmd()).await;
    assert!(!controller.state().await.pulse);
}

#[tokio::test]
async fn position_updates_without_regeneration() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider.clone());

    let command = AvatarCommand {
        position: Some(Position::Left),
        ..cmd()
    };
    controller.apply_command(&command).await;

    assert_eq!(provider.request_count(), 0);
    assert_eq!(controller.state().await.position, Position::Left);
}

#[tokio::test(start_paused = true)]
async fn animation_flag_resets_after_default_window() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    controller.apply_command(&cmd()).await;
    assert!(controller.state().await.is_animating);

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    assert!(!controller.state().await.is_animating);
}

#[tokio::test(start_paused = true)]
async fn command_duration_overrides_animation_window() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let command = AvatarCommand {
        duration: Some(1200),
        ..cmd()
    };
    controller.apply_command(&command).await;

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    assert!(controller.state().await.is_animating);

    tokio::time::sleep(std::time::Duration::from_millis(700)).await;
    assert!(!controller.state().await.is_animating);
}

#[tokio::test(start_paused = true)]
async fn stale_timer_cannot_clear_a_newer_commands_animation() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let short = AvatarCommand {
        duration: Some(100),
        ..cmd()
    };
    controller.apply_command(&short).await;

    let long = AvatarCommand {
        duration: Some(500),
        ..cmd()
    };
    controller.apply_command(&long).await;

    // The first command's timer has fired by now; it must not clear the
    // flag owned by the second command.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert!(controller.state().await.is_animating);

    tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    assert!(!controller.state().await.is_animating);
}

#[tokio::test]
async fn last_update_is_refreshed_by_every_command() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);

    let before = controller.state().await.last_update;
    controller.apply_command(&cmd()).await;
    let after = controller.state().await.last_update;
    assert!(after > before);
}

#[tokio::test]
async fn set_state_restores_snapshot_without_image_reference() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, resources) = controller_with(provider);

    // Hold a local image first.
    let show = AvatarCommand {
        show: Some(true),
        expression: Some("happy".to_string()),
        ..cmd()
    };
    controller.apply_command(&show).await;
    assert!(controller.state().await.image_url.is_some());

    let mut snapshot = controller.state().await;
    snapshot.expression = "sleepy".to_string();
    snapshot.image_url = Some("blob:stale-from-last-session".to_string());
    controller.set_state(snapshot).await;

    let state = controller.state().await;
    assert_eq!(state.expression, "sleepy");
    assert_eq!(state.image_url, None, "stored image reference must not be restored");
    assert_eq!(resources.revoked_urls(), vec!["blob:auto-0".to_string()]);
}

#[tokio::test]
async fn release_resources_revokes_held_local_reference() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, resources) = controller_with(provider);

    let show = AvatarCommand {
        show: Some(true),
        expression: Some("happy".to_string()),
        ..cmd()
    };
    controller.apply_command(&show).await;

    controller.release_resources().await;
    assert_eq!(resources.revoked_urls().len(), 1);
    assert_eq!(controller.state().await.image_url, None);

    // Releasing again is a no-op.
    controller.release_resources().await;
    assert_eq!(resources.revoked_urls().len(), 1);
}
