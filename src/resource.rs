//! Local image-reference ownership.
//!
//! Generated images may be handed to the engine as locally-owned
//! references (blob handles, temp files) that the host must release
//! explicitly, or as plain remote URLs that need no cleanup. The
//! controller holds at most one current reference and releases the
//! previous one on every successful replacement and on teardown.

/// URL schemes that denote a locally-owned reference requiring release.
const LOCAL_SCHEMES: &[&str] = &["blob:", "file://", "memory://"];

/// Returns true when `url` is a locally-owned reference the engine is
/// responsible for releasing.
pub fn is_local_ref(url: &str) -> bool {
    LOCAL_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Releases locally-owned image references.
///
/// The host supplies the implementation (revoking a blob handle,
/// deleting a temp file). Release is advisory: implementations must
/// not fail loudly.
pub trait ResourceManager: Send + Sync {
    fn revoke_local_reference(&self, url: &str);
}

/// No-op manager for hosts whose references need no explicit release.
pub struct NullResourceManager;

impl ResourceManager for NullResourceManager {
    fn revoke_local_reference(&self, _url: &str) {}
}

/// Deletes `file://` references from disk. Suitable for hosts that
/// store generated images as temp files.
pub struct FileResourceManager;

impl ResourceManager for FileResourceManager {
    fn revoke_local_reference(&self, url: &str) {
        if let Some(path) = url.strip_prefix("file://") {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("[Resource] Failed to remove {}: {}", path, e);
            }
        }
    }
}
