use crate::avatar::controller::AvatarController;
use crate::avatar::state::AvatarState;
use crate::config::EngineConfig;
use crate::imagegen::{
    ImageArchive, ImageGenError, ImageMetadata, ImageProvider, ImageRequest, ImageResult,
};
use crate::llm::{TextGenOptions, TextProvider};
use crate::personality::{NoPersonality, PersonalitySource};
use crate::resource::ResourceManager;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Scripted Image Provider ─────────────────────────────

/// Returns scripted responses in order; once the script is exhausted,
/// produces unique `blob:auto-N` references. Records every request.
pub struct ScriptedImageProvider {
    id: String,
    model: Option<String>,
    script: Mutex<VecDeque<Result<String, String>>>,
    pub requests: Mutex<Vec<ImageRequest>>,
    counter: AtomicUsize,
    pub delay_ms: u64,
}

impl ScriptedImageProvider {
    pub fn new(id: &str, model: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            model: model.map(str::to_string),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            delay_ms: 0,
        })
    }

    pub fn with_delay(id: &str, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            model: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            delay_ms,
        })
    }

    pub fn push_ok(&self, url: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(url.to_string()));
    }

    pub fn push_err(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl ImageProvider for ScriptedImageProvider {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn model(&self) -> Option<String> {
        self.model.clone()
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResult, ImageGenError> {
        self.requests.lock().unwrap().push(request);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(url)) => Ok(ImageResult { image_url: url }),
            Some(Err(message)) => Err(ImageGenError::GenerationFailed(message)),
            None => Ok(ImageResult {
                image_url: format!("blob:auto-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            }),
        }
    }
}

// ── Recording Resource Manager ──────────────────────────

pub struct RecordingResources {
    pub revoked: Mutex<Vec<String>>,
}

impl RecordingResources {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            revoked: Mutex::new(Vec::new()),
        })
    }

    pub fn revoked_urls(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

impl ResourceManager for RecordingResources {
    fn revoke_local_reference(&self, url: &str) {
        self.revoked.lock().unwrap().push(url.to_string());
    }
}

// ── Recording Archive ───────────────────────────────────

pub struct RecordingArchive {
    pub saved: Mutex<Vec<(String, ImageMetadata)>>,
}

impl RecordingArchive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            saved: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ImageArchive for RecordingArchive {
    async fn save_image(&self, url: &str, metadata: &ImageMetadata) -> Result<(), String> {
        self.saved
            .lock()
            .unwrap()
            .push((url.to_string(), metadata.clone()));
        Ok(())
    }

    async fn cleanup_old_images(&self, _keep: usize) -> Result<usize, String> {
        Ok(0)
    }
}

// ── Text Provider Fakes ─────────────────────────────────

pub struct FixedTextProvider(pub Result<String, String>);

#[async_trait]
impl TextProvider for FixedTextProvider {
    async fn generate_text(
        &self,
        _input: &str,
        _options: TextGenOptions,
    ) -> Result<String, String> {
        self.0.clone()
    }

    fn id(&self) -> &str {
        "fixed"
    }
}

// ── Failing Personality Source ──────────────────────────

pub struct FailingPersonality;

#[async_trait]
impl PersonalitySource for FailingPersonality {
    async fn active_personality(
        &self,
    ) -> Result<Option<crate::personality::Personality>, String> {
        Err("store offline".to_string())
    }
}

// ── Controller Setup ────────────────────────────────────

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
}

pub fn controller_with(
    provider: Arc<ScriptedImageProvider>,
) -> (AvatarController, Arc<RecordingResources>) {
    let resources = RecordingResources::new();
    let controller = AvatarController::new(
        test_config(),
        Some(provider),
        Arc::new(NoPersonality),
        resources.clone(),
    );
    (controller, resources)
}

/// Subscribe a counting observer; returns a handle to the recorded
/// state snapshots.
pub fn record_notifications(controller: &AvatarController) -> Arc<Mutex<Vec<AvatarState>>> {
    let snapshots: Arc<Mutex<Vec<AvatarState>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = snapshots.clone();
    controller.subscribe(Box::new(move |state| {
        sink.lock().unwrap().push(state.clone());
    }));
    snapshots
}
