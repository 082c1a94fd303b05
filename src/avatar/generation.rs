//! Generation Orchestrator — builds parameters from avatar state,
//! composes (or delegates) the prompt, dedup-hashes the request, calls
//! the image provider, and manages the image resource lifecycle.

use super::analyzer::ScenePresets;
use super::controller::AvatarController;
use super::state::Position;
use crate::imagegen::{ImageMetadata, ImageProvider, ImageRequest};
use crate::prompt::{author_prompt, compose, negative_prompt_allowed};
use crate::prompt::{GenerationParameters, MetaPromptContext};
use crate::resource::is_local_ref;
use sha2::{Digest, Sha256};

/// Per-request variation knobs, typically supplied by a "new photo"
/// style command in the host.
#[derive(Debug, Clone, Default)]
pub struct VariationOptions {
    pub variation_seed: Option<u64>,
    pub contextual_keywords: Vec<String>,
}

impl AvatarController {
    /// Generate a fresh avatar image for the current state.
    ///
    /// Transactional with respect to state: `is_generating` is set
    /// before any I/O and always cleared afterwards, with exactly one
    /// trailing subscriber notification regardless of outcome. Without
    /// an active image provider this is a logged no-op.
    pub async fn generate(
        &self,
        conversation_context: Option<&str>,
        variation: Option<VariationOptions>,
        ai_description: Option<&str>,
    ) {
        self.generate_internal(conversation_context, variation, ai_description, None)
            .await;
    }

    /// Generate from an explicit AI-authored scene description: derives
    /// expression/pose/action/scene defaults from the description,
    /// makes the avatar visible, and runs the hybrid prompt path.
    pub async fn generate_from_description(&self, description: &str, position: Option<Position>) {
        let presets = self.analyzer.params_from_description(description);
        {
            let mut state = self.state.write().await;
            state.visible = true;
            state.expression = presets.expression.clone();
            state.pose = presets.pose.clone();
            state.action = presets.action.clone();
            if let Some(position) = position {
                state.position = position;
            }
            state.touch();
        }
        self.notify().await;

        self.generate_internal(None, None, Some(description), Some(presets))
            .await;
    }

    /// Most recent dedup hash, for host diagnostics. Identical logical
    /// requests always hash identically; the engine does not reuse
    /// provider URLs based on it (see DESIGN.md).
    pub fn last_generation_hash(&self) -> Option<String> {
        self.last_generation_hash
            .read()
            .ok()
            .and_then(|hash| hash.clone())
    }

    async fn generate_internal(
        &self,
        conversation_context: Option<&str>,
        variation: Option<VariationOptions>,
        ai_description: Option<&str>,
        scene: Option<ScenePresets>,
    ) {
        // Single-slot guard: overlapping triggers serialize.
        let _guard = self.generation_lock.lock().await;

        let provider = { self.image_provider.read().await.clone() };
        let Some(provider) = provider else {
            tracing::info!("[Avatar] No image provider configured — skipping generation");
            return;
        };

        {
            let mut state = self.state.write().await;
            state.is_generating = true;
            state.has_error = false;
            state.error_message = None;
            state.touch();
        }
        self.notify().await;

        let outcome = self
            .run_generation(
                provider.as_ref(),
                conversation_context,
                variation.unwrap_or_default(),
                ai_description,
                scene,
            )
            .await;

        {
            let mut state = self.state.write().await;
            match outcome {
                Ok(image_url) => {
                    // Single-owner lifecycle: the previous local
                    // reference is released exactly once, then replaced.
                    if let Some(previous) = state.image_url.take() {
                        if is_local_ref(&previous) {
                            self.resources.revoke_local_reference(&previous);
                        }
                    }
                    state.image_url = Some(image_url);
                }
                Err(message) => {
                    tracing::warn!("[Avatar] Generation failed: {}", message);
                    state.has_error = true;
                    state.error_message = Some(message);
                    // The previous image stays displayable.
                }
            }
            state.is_generating = false;
            state.touch();
        }
        self.notify().await;
    }

    async fn run_generation(
        &self,
        provider: &dyn ImageProvider,
        conversation_context: Option<&str>,
        variation: VariationOptions,
        ai_description: Option<&str>,
        scene: Option<ScenePresets>,
    ) -> Result<String, String> {
        let config = self.config.read().await.clone();
        let snapshot = self.state.read().await.clone();

        let (background, lighting) = match &scene {
            Some(presets) => (presets.background.clone(), presets.lighting.clone()),
            None => (config.background.clone(), config.lighting.clone()),
        };

        let mut params = GenerationParameters {
            expression: snapshot.expression.clone(),
            pose: snapshot.pose.clone(),
            action: snapshot.action.clone(),
            style: config.style.clone(),
            background,
            lighting,
            quality: config.quality.clone(),
            ai_description: ai_description.map(str::to_string),
            variation_seed: variation.variation_seed,
            contextual_keywords: variation.contextual_keywords,
            meta_generated_image_prompt: None,
        };

        // Personality lookup is best-effort.
        let personality = match self.personality_source.active_personality().await {
            Ok(personality) => personality,
            Err(e) => {
                tracing::warn!(
                    "[Avatar] Personality lookup failed: {} — continuing without",
                    e
                );
                None
            }
        };

        // Optional meta-prompting pass; any failure degrades to local
        // composition with no retry.
        if config.meta_prompting {
            if let Some(text_provider) = &self.text_provider {
                let meta_context = MetaPromptContext {
                    expression: &snapshot.expression,
                    pose: &snapshot.pose,
                    action: &snapshot.action,
                    ai_description,
                    conversation_context,
                    personality: personality.as_ref(),
                };
                match author_prompt(text_provider.as_ref(), &meta_context).await {
                    Ok(authored) => params.meta_generated_image_prompt = Some(authored),
                    Err(e) => tracing::warn!(
                        "[Avatar] Meta-prompting failed: {} — using local composition",
                        e
                    ),
                }
            }
        }

        let composed = compose(&params, personality.as_ref(), conversation_context);

        let hash = dedup_hash(&params, &composed.final_prompt, &composed.negative_prompt)?;
        tracing::debug!("[Avatar] Generation request hash: {}", hash);
        if let Ok(mut last) = self.last_generation_hash.write() {
            *last = Some(hash);
        }

        let negative_prompt = if negative_prompt_allowed(
            &provider.id(),
            provider.model().as_deref(),
        ) {
            Some(composed.negative_prompt.clone())
        } else {
            None
        };

        let result = provider
            .generate_image(ImageRequest {
                prompt: composed.final_prompt.clone(),
                negative_prompt,
                width: config.image_width,
                height: config.image_height,
                steps: config.steps,
                guidance: config.guidance,
            })
            .await
            .map_err(|e| e.to_string())?;

        if config.archive.enabled {
            if let Some(archive) = &self.archive {
                let metadata = ImageMetadata {
                    prompt: composed.final_prompt.clone(),
                    style: params.style.clone(),
                    model: provider.model(),
                    provider: provider.id(),
                    tags: vec![snapshot.expression.clone(), snapshot.pose.clone()],
                };
                if let Err(e) = archive.save_image(&result.image_url, &metadata).await {
                    tracing::warn!("[Avatar] Archive save failed: {}", e);
                }
                // Occasional housekeeping, off the request path.
                if rand::random::<f64>() < config.archive.cleanup_chance {
                    let archive = archive.clone();
                    let keep = config.archive.keep_count;
                    tokio::spawn(async move {
                        if let Err(e) = archive.cleanup_old_images(keep).await {
                            tracing::warn!("[Avatar] Archive cleanup failed: {}", e);
                        }
                    });
                }
            }
        }

        Ok(result.image_url)
    }
}

/// Stable digest over canonicalized generation parameters plus the
/// compiled prompts. Keys are serialized in sorted order, so two
/// requests with the same logical content hash identically no matter
/// how the parameter object was constructed.
pub fn dedup_hash(
    params: &GenerationParameters,
    final_prompt: &str,
    negative_prompt: &str,
) -> Result<String, String> {
    let mut value =
        serde_json::to_value(params).map_err(|e| format!("Hash serialization failed: {}", e))?;
    if let serde_json::Value::Object(ref mut map) = value {
        map.insert(
            "final_prompt".to_string(),
            serde_json::Value::String(final_prompt.to_string()),
        );
        map.insert(
            "negative_prompt".to_string(),
            serde_json::Value::String(negative_prompt.to_string()),
        );
    }
    // serde_json object maps iterate in key order, which makes this
    // serialization canonical.
    let canonical =
        serde_json::to_string(&value).map_err(|e| format!("Hash serialization failed: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
