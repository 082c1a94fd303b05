//! Avatar Controller — owns the single avatar state record, applies
//! commands, fans out state changes to subscribers, and triggers image
//! generation when the visual identity of the avatar changes.

use super::analyzer::{IntentAnalyzer, KeywordIntentAnalyzer};
use super::commands::{parse_command_tags, parse_narrative_tags, AvatarCommand};
use super::state::AvatarState;
use crate::config::EngineConfig;
use crate::imagegen::{ImageArchive, ImageProvider};
use crate::llm::TextProvider;
use crate::personality::PersonalitySource;
use crate::resource::{is_local_ref, ResourceManager};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub type StateCallback = Box<dyn Fn(&AvatarState) + Send + Sync>;

/// Orchestrates avatar state, generation, and subscriber notification.
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct AvatarController {
    pub(super) state: Arc<RwLock<AvatarState>>,
    pub(super) config: Arc<RwLock<EngineConfig>>,
    pub(super) image_provider: Arc<RwLock<Option<Arc<dyn ImageProvider>>>>,
    pub(super) text_provider: Option<Arc<dyn TextProvider>>,
    pub(super) personality_source: Arc<dyn PersonalitySource>,
    pub(super) resources: Arc<dyn ResourceManager>,
    pub(super) archive: Option<Arc<dyn ImageArchive>>,
    pub(super) analyzer: Arc<dyn IntentAnalyzer>,
    subscribers: Arc<std::sync::RwLock<Vec<StateCallback>>>,
    /// Monotonic counter keying animation-reset timers: a timer only
    /// fires if no newer command has superseded it.
    animation_epoch: Arc<AtomicU64>,
    /// Single-slot in-flight guard; overlapping generation triggers
    /// serialize instead of racing on `is_generating`.
    pub(super) generation_lock: Arc<Mutex<()>>,
    pub(super) last_generation_hash: Arc<std::sync::RwLock<Option<String>>>,
}

impl AvatarController {
    pub fn new(
        config: EngineConfig,
        image_provider: Option<Arc<dyn ImageProvider>>,
        personality_source: Arc<dyn PersonalitySource>,
        resources: Arc<dyn ResourceManager>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(AvatarState::default())),
            config: Arc::new(RwLock::new(config)),
            image_provider: Arc::new(RwLock::new(image_provider)),
            text_provider: None,
            personality_source,
            resources,
            archive: None,
            analyzer: Arc::new(KeywordIntentAnalyzer),
            subscribers: Arc::new(std::sync::RwLock::new(Vec::new())),
            animation_epoch: Arc::new(AtomicU64::new(0)),
            generation_lock: Arc::new(Mutex::new(())),
            last_generation_hash: Arc::new(std::sync::RwLock::new(None)),
        }
    }

    /// Enable meta-prompting by attaching a text provider.
    pub fn with_text_provider(mut self, provider: Arc<dyn TextProvider>) -> Self {
        self.text_provider = Some(provider);
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn ImageArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Replace the keyword analyzer with another strategy.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn IntentAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    // ── Observation ────────────────────────────────────

    pub fn subscribe(&self, callback: StateCallback) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push(callback);
        }
    }

    pub async fn state(&self) -> AvatarState {
        self.state.read().await.clone()
    }

    pub(super) async fn notify(&self) {
        let snapshot = self.state.read().await.clone();
        if let Ok(subscribers) = self.subscribers.read() {
            for callback in subscribers.iter() {
                callback(&snapshot);
            }
        }
    }

    // ── Provider / Config Management ───────────────────

    pub async fn set_image_provider(&self, provider: Option<Arc<dyn ImageProvider>>) {
        *self.image_provider.write().await = provider;
    }

    pub async fn update_config(&self, config: EngineConfig) {
        *self.config.write().await = config;
    }

    // ── State Machine ──────────────────────────────────

    /// Apply one command. Field updates run in a fixed order; a changed
    /// expression or pose triggers regeneration when the avatar ends up
    /// visible. The generation side effect is awaited so callers get
    /// FIFO semantics.
    pub async fn apply_command(&self, command: &AvatarCommand) {
        let faded_opacity = self.config.read().await.faded_opacity;

        let (needs_image, visible) = {
            let mut state = self.state.write().await;
            let mut needs_image = false;

            if command.hide == Some(true) {
                state.visible = false;
            }
            // Evaluated after hide: a command carrying both ends visible.
            if command.show == Some(true) {
                state.visible = true;
            }
            if let Some(expression) = &command.expression {
                if *expression != state.expression {
                    state.expression = expression.clone();
                    needs_image = true;
                }
            }
            if let Some(pose) = &command.pose {
                if *pose != state.pose {
                    state.pose = pose.clone();
                    needs_image = true;
                }
            }
            if let Some(action) = &command.action {
                state.action = action.clone();
            }
            if let Some(gesture) = &command.gesture {
                state.gesture = Some(gesture.clone());
            }
            if let Some(scale) = command.scale {
                state.scale = scale;
            }
            if let Some(position) = command.position {
                state.position = position;
            }
            if command.fade == Some(true) {
                state.opacity = faded_opacity;
            }
            state.pulse = command.pulse == Some(true);

            state.is_animating = true;
            state.touch();
            (needs_image, state.visible)
        };

        self.notify().await;
        self.schedule_animation_reset(command.duration).await;

        if needs_image && visible {
            self.generate(None, None, None).await;
        }
    }

    /// Apply commands strictly sequentially, awaiting each command's
    /// full generation side effect before starting the next.
    pub async fn execute_commands(&self, commands: &[AvatarCommand]) {
        for command in commands {
            self.apply_command(command).await;
        }
    }

    async fn schedule_animation_reset(&self, duration: Option<u64>) {
        let default_ms = self.config.read().await.animation_reset_ms;
        let delay = duration.unwrap_or(default_ms);
        let epoch = self.animation_epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            // A newer command owns the animation flag now.
            if controller.animation_epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            {
                let mut state = controller.state.write().await;
                state.is_animating = false;
                state.touch();
            }
            controller.notify().await;
        });
    }

    // ── Response Pipeline ──────────────────────────────

    /// Run a raw AI response through the full pipeline: structured
    /// command tags, the narrative dialect, and (when neither issued an
    /// explicit visual instruction) the emotion heuristics.
    /// Returns the cleaned text for display.
    pub async fn process_response(&self, text: &str) -> String {
        let parse = parse_command_tags(text);
        if !parse.commands.is_empty() {
            self.execute_commands(&parse.commands).await;
        }

        let narrative = parse_narrative_tags(&parse.clean_text);
        if narrative.hide_request {
            let hide = AvatarCommand {
                hide: Some(true),
                ..AvatarCommand::default()
            };
            self.apply_command(&hide).await;
        }

        if let Some(photo) = &narrative.photo_request {
            self.generate_from_description(&photo.description, photo.position)
                .await;
        } else if parse.commands.is_empty() && !narrative.hide_request {
            let context = self.analyzer.analyze(&narrative.clean_text);
            let command = AvatarCommand {
                expression: context.expression,
                pose: context.pose,
                action: context.action,
                show: if context.should_show { Some(true) } else { None },
                ..AvatarCommand::default()
            };
            if !command.is_empty() {
                self.apply_command(&command).await;
            }
        }

        narrative.clean_text
    }

    // ── Snapshot / Teardown ────────────────────────────

    /// Replace the whole state, e.g. when restoring a persisted
    /// snapshot. The snapshot's image reference is deliberately dropped
    /// (stale provider URLs must not be resurrected) and the currently
    /// held local reference is released.
    pub async fn set_state(&self, mut snapshot: AvatarState) {
        snapshot.image_url = None;
        {
            let mut state = self.state.write().await;
            if let Some(previous) = state.image_url.take() {
                if is_local_ref(&previous) {
                    self.resources.revoke_local_reference(&previous);
                }
            }
            snapshot.last_update = snapshot.last_update.max(state.last_update);
            *state = snapshot;
            state.touch();
        }
        self.notify().await;
    }

    /// Explicit teardown: release the held local image reference.
    pub async fn release_resources(&self) {
        let mut state = self.state.write().await;
        if let Some(previous) = state.image_url.take() {
            if is_local_ref(&previous) {
                self.resources.revoke_local_reference(&previous);
            }
        }
        state.touch();
    }
}
