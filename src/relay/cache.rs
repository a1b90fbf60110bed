use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::relay::mime::classify;

/// On-disk cache of static assets from the proxied site, keyed by request path.
///
/// There is no eviction and no invalidation: delete files under `root` to refresh.
#[derive(Debug, Clone)]
pub struct AssetCache {
    root: PathBuf,
}

/// A cached asset ready to serve.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    pub body: Bytes,
    pub content_type: &'static str,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        AssetCache { root: root.into() }
    }

    /// File backing `request_path`, or `None` if the path is not cacheable.
    pub fn file_for(&self, request_path: &str) -> Option<PathBuf> {
        cache_key(request_path).map(|key| self.root.join(key))
    }

    pub async fn lookup(&self, request_path: &str) -> Option<CachedAsset> {
        let file = self.file_for(request_path)?;
        let (_, content_type) = classify(request_path)?;
        match tokio::fs::read(&file).await {
            Ok(body) => Some(CachedAsset {
                body: Bytes::from(body),
                content_type,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", file.display(), e);
                None
            }
        }
    }

    /// Write a fetched asset. Failures are logged and otherwise ignored.
    ///
    /// The body goes to a temporary sibling first and is renamed into place, so
    /// `lookup` only ever sees complete files.
    pub async fn store(&self, request_path: &str, body: &[u8]) {
        let Some(file) = self.file_for(request_path) else {
            return;
        };
        if let Some(parent) = file.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Cache directory {} not writable: {}", parent.display(), e);
                return;
            }
        }

        let staging = staging_path(&file);
        let written = match tokio::fs::write(&staging, body).await {
            Ok(()) => tokio::fs::rename(&staging, &file).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => tracing::debug!("Cached {} ({} bytes)", request_path, body.len()),
            Err(e) => {
                tracing::warn!("Cache write failed for {}: {}", file.display(), e);
                let _ = tokio::fs::remove_file(&staging).await;
            }
        }
    }
}

/// Unique hidden sibling of `file`. Its `.tmp` extension is never a cache key.
fn staging_path(file: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = NEXT.fetch_add(1, Ordering::Relaxed);
    file.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

/// Relative cache file path for a request path.
///
/// Only cacheable asset extensions qualify. Paths containing `..`, empty segments
/// or a trailing slash are rejected so keys can never escape the cache root.
pub fn cache_key(request_path: &str) -> Option<PathBuf> {
    let (kind, _) = classify(request_path)?;
    if !kind.cacheable() {
        return None;
    }
    let trimmed = request_path.strip_prefix('/')?;
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }

    let mut key = PathBuf::new();
    for segment in trimmed.split('/') {
        let mut parts = Path::new(segment).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(part)), None) => key.push(part),
            _ => return None,
        }
    }
    Some(key)
}
