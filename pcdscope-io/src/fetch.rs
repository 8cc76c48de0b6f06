//! Asset fetching: sources for paths and URLs plus an in-memory cache
//!
//! Frame files may be rewritten in place by whatever produces them, so the
//! viewer switches the cache off and re-fetches on every load.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::IoError;

/// Whether intermediaries may answer from their caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Default,
    /// Always go back to the origin
    Reload,
}

/// Something that can resolve a location to bytes
pub trait AssetSource: Send + Sync {
    /// Whether this source understands the location's scheme
    fn handles(&self, location: &str) -> bool;

    fn fetch(&self, location: &str, policy: CachePolicy) -> Result<Vec<u8>, IoError>;

    fn name(&self) -> &'static str;
}

/// Reads plain paths and `file://` URLs from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl AssetSource for FileSource {
    fn handles(&self, location: &str) -> bool {
        !location.contains("://") || location.starts_with("file://")
    }

    fn fetch(&self, location: &str, _policy: CachePolicy) -> Result<Vec<u8>, IoError> {
        let path = Path::new(location.strip_prefix("file://").unwrap_or(location));
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => IoError::Io(e),
        })
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Upper bound on a single HTTP response body
#[cfg(feature = "http")]
pub const MAX_HTTP_ASSET_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Fetches `http://` and `https://` locations
#[cfg(feature = "http")]
pub struct HttpSource {
    agent: ureq::Agent,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
impl AssetSource for HttpSource {
    fn handles(&self, location: &str) -> bool {
        location.starts_with("http://") || location.starts_with("https://")
    }

    fn fetch(&self, location: &str, policy: CachePolicy) -> Result<Vec<u8>, IoError> {
        let http_error = |e: ureq::Error| IoError::Http {
            location: location.to_string(),
            message: e.to_string(),
        };

        let mut request = self.agent.get(location);
        if policy == CachePolicy::Reload {
            request = request
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache");
        }
        let response = request.call().map_err(http_error)?;
        response
            .into_body()
            .with_config()
            .limit(MAX_HTTP_ASSET_BYTES)
            .read_to_vec()
            .map_err(http_error)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Shared location → bytes cache with an on/off switch.
///
/// While disabled it neither serves nor stores entries. Clones share state.
#[derive(Clone, Default)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    disabled: AtomicBool,
    entries: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.inner.disabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.disabled.store(!enabled, Ordering::SeqCst);
    }

    pub fn get(&self, location: &str) -> Option<Arc<[u8]>> {
        if !self.is_enabled() {
            return None;
        }
        self.lock().get(location).cloned()
    }

    pub fn insert(&self, location: &str, bytes: Arc<[u8]>) {
        if !self.is_enabled() {
            return;
        }
        self.lock().insert(location.to_string(), bytes);
    }

    pub fn remove(&self, location: &str) -> Option<Arc<[u8]>> {
        self.lock().remove(location)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Routes a location to the first source that handles it, consulting the
/// cache first
#[derive(Clone)]
pub struct AssetFetcher {
    sources: Vec<Arc<dyn AssetSource>>,
    cache: AssetCache,
}

impl AssetFetcher {
    /// Fetcher without any source
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
            cache: AssetCache::new(),
        }
    }

    /// Fetcher for local files and, with the `http` feature, URLs
    pub fn new() -> Self {
        let fetcher = Self::empty().with_source(Arc::new(FileSource));
        #[cfg(feature = "http")]
        let fetcher = fetcher.with_source(Arc::new(HttpSource::new()));
        fetcher
    }

    pub fn with_source(mut self, source: Arc<dyn AssetSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn fetch(&self, location: &str) -> Result<Arc<[u8]>, IoError> {
        if let Some(bytes) = self.cache.get(location) {
            log::debug!("Serving {} from the asset cache", location);
            return Ok(bytes);
        }

        let source = self
            .sources
            .iter()
            .find(|s| s.handles(location))
            .ok_or_else(|| IoError::UnsupportedLocation {
                location: location.to_string(),
            })?;

        let policy = if self.cache.is_enabled() {
            CachePolicy::Default
        } else {
            CachePolicy::Reload
        };
        log::debug!("Fetching {} via {} source ({:?})", location, source.name(), policy);
        let bytes: Arc<[u8]> = source.fetch(location, policy)?.into();
        self.cache.insert(location, bytes.clone());
        Ok(bytes)
    }
}

impl Default for AssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}
