use super::helpers::*;
use crate::avatar::commands::AvatarCommand;

#[tokio::test(start_paused = true)]
async fn overlapping_generates_serialize_through_the_guard() {
    let provider = ScriptedImageProvider::with_delay("test", 50);
    provider.push_ok("blob:first");
    provider.push_ok("blob:second");
    let (controller, resources) = controller_with(provider.clone());

    let a = controller.clone();
    let b = controller.clone();
    tokio::join!(
        async move { a.generate(None, None, None).await },
        async move { b.generate(None, None, None).await },
    );

    assert_eq!(provider.request_count(), 2);
    let state = controller.state().await;
    assert!(!state.is_generating);
    assert_eq!(state.image_url.as_deref(), Some("blob:second"));
    // The first image was replaced exactly once; nothing double-freed.
    assert_eq!(resources.revoked_urls(), vec!["blob:first".to_string()]);
}

#[tokio::test]
async fn execute_commands_is_fifo_including_generation() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider.clone());

    let commands = vec![
        AvatarCommand {
            show: Some(true),
            expression: Some("happy".to_string()),
            ..AvatarCommand::default()
        },
        AvatarCommand {
            expression: Some("sad".to_string()),
            ..AvatarCommand::default()
        },
    ];
    controller.execute_commands(&commands).await;

    let prompts = provider.request_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("bright smile"));
    assert!(prompts[1].contains("melancholy"));
    assert_eq!(controller.state().await.expression, "sad");
}

#[tokio::test]
async fn subscribers_observe_generating_then_settled() {
    let provider = ScriptedImageProvider::new("test", None);
    let (controller, _) = controller_with(provider);
    let notifications = record_notifications(&controller);

    let command = AvatarCommand {
        show: Some(true),
        expression: Some("happy".to_string()),
        ..AvatarCommand::default()
    };
    controller.apply_command(&command).await;

    let recorded = notifications.lock().unwrap();
    // Command notification, generation start, generation end.
    assert_eq!(recorded.len(), 3);
    assert!(!recorded[0].is_generating);
    assert!(recorded[1].is_generating);
    assert!(!recorded[2].is_generating);
    assert!(recorded[2].image_url.is_some());
}
