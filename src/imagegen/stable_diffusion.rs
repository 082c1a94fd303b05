use super::interface::{ImageGenError, ImageProvider, ImageRequest, ImageResult};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Stable Diffusion WebUI txt2img provider.
///
/// Decoded images are written into `output_dir` and returned as
/// `file://` references, which makes them locally-owned and subject to
/// release by the resource manager.
pub struct StableDiffusionProvider {
    id: String,
    base_url: String, // Defaults to "http://127.0.0.1:7860"
    model: Option<String>,
    output_dir: PathBuf,
    client: Client,
}

impl StableDiffusionProvider {
    pub fn new(
        id: String,
        base_url: Option<String>,
        model: Option<String>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:7860".to_string()),
            model,
            output_dir,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .no_proxy()
                .build()
                .unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Clone)]
struct SdTxt2ImgRequest {
    prompt: String,
    negative_prompt: String,
    seed: i64,
    width: u32,
    height: u32,
    steps: u32,
    cfg_scale: f32,
    sampler_name: Option<String>,
    batch_size: usize,
}

#[async_trait]
impl ImageProvider for StableDiffusionProvider {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn model(&self) -> Option<String> {
        self.model.clone()
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/sdapi/v1/progress", self.base_url.trim_end_matches('/'));
        self.client.get(&url).send().await.is_ok()
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResult, ImageGenError> {
        let url = format!("{}/sdapi/v1/txt2img", self.base_url.trim_end_matches('/'));

        let body = SdTxt2ImgRequest {
            prompt: request.prompt,
            negative_prompt: request.negative_prompt.unwrap_or_default(),
            seed: -1,
            width: request.width,
            height: request.height,
            steps: request.steps,
            cfg_scale: request.guidance,
            sampler_name: Some("Euler a".to_string()),
            batch_size: 1,
        };

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ImageGenError::GenerationFailed(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ImageGenError::GenerationFailed(format!(
                "SD WebUI API Error {}: {}",
                status, text
            )));
        }

        let json: Value = res
            .json()
            .await
            .map_err(|e| ImageGenError::GenerationFailed(format!("Invalid JSON: {}", e)))?;

        // Response format: { "images": [ "base64..." ], "parameters": {...}, "info": "..." }
        let first = json
            .get("images")
            .and_then(|v| v.as_array())
            .and_then(|images| images.first())
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ImageGenError::GenerationFailed("Response missing 'images[0]'".to_string())
            })?;

        let bytes = general_purpose::STANDARD
            .decode(first)
            .map_err(|e| ImageGenError::GenerationFailed(format!("Base64 decode error: {}", e)))?;

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            ImageGenError::GenerationFailed(format!("Failed to create output directory: {}", e))
        })?;
        let filename = format!(
            "{}_{}.png",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            uuid::Uuid::new_v4()
        );
        let path = self.output_dir.join(&filename);
        std::fs::write(&path, &bytes)
            .map_err(|e| ImageGenError::GenerationFailed(format!("Failed to save image: {}", e)))?;

        Ok(ImageResult {
            image_url: format!("file://{}", path.display()),
        })
    }
}
