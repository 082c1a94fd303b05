//! Image archive — best-effort persistence of generated avatar images
//! with descriptive metadata, plus housekeeping of old files.
//!
//! Everything here is advisory: a failed save or cleanup is logged and
//! swallowed, never surfaced to the generation pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub prompt: String,
    pub style: String,
    pub model: Option<String>,
    pub provider: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait]
pub trait ImageArchive: Send + Sync {
    /// Persist one generated image together with its metadata.
    async fn save_image(&self, url: &str, metadata: &ImageMetadata) -> Result<(), String>;

    /// Delete archived images beyond the newest `keep`. Returns how
    /// many were removed.
    async fn cleanup_old_images(&self, keep: usize) -> Result<usize, String>;
}

// ── Filesystem Archive ─────────────────────────────────

/// Archives images under a directory with timestamped filenames and a
/// JSON metadata sidecar per image.
pub struct FsImageArchive {
    dir: PathBuf,
    client: reqwest::Client,
}

impl FsImageArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Archive under the platform data directory, mirroring where the
    /// host application keeps its other generated assets.
    pub fn in_data_dir(app_id: &str) -> Self {
        let dir = dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(app_id)
            .join("avatar_archive");
        Self::new(dir)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, String> {
        if let Some(path) = url.strip_prefix("file://") {
            return std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path, e));
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            let res = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| format!("Download failed: {}", e))?;
            if !res.status().is_success() {
                return Err(format!("Download failed with status {}", res.status()));
            }
            return res
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| format!("Download failed: {}", e));
        }
        Err(format!("Unsupported image reference: {}", url))
    }
}

#[async_trait]
impl ImageArchive for FsImageArchive {
    async fn save_image(&self, url: &str, metadata: &ImageMetadata) -> Result<(), String> {
        let bytes = self.fetch_bytes(url).await?;

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create archive directory: {}", e))?;

        let stem = format!(
            "{}_{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            uuid::Uuid::new_v4()
        );
        let image_path = self.dir.join(format!("{}.png", stem));
        std::fs::write(&image_path, &bytes)
            .map_err(|e| format!("Failed to write archive image: {}", e))?;

        let sidecar = self.dir.join(format!("{}.json", stem));
        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        std::fs::write(&sidecar, json)
            .map_err(|e| format!("Failed to write metadata sidecar: {}", e))?;

        tracing::debug!("[Archive] Saved {} -> {}", url, image_path.display());
        Ok(())
    }

    async fn cleanup_old_images(&self, keep: usize) -> Result<usize, String> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(0), // nothing archived yet
        };

        let mut images: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            images.push((modified, path));
        }

        // Newest first; everything past `keep` goes.
        images.sort_by(|a, b| b.0.cmp(&a.0));

        let mut removed = 0;
        for (_, path) in images.into_iter().skip(keep) {
            if std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
            let sidecar = path.with_extension("json");
            let _ = std::fs::remove_file(sidecar);
        }

        if removed > 0 {
            tracing::info!("[Archive] Cleaned up {} old images", removed);
        }
        Ok(removed)
    }
}
