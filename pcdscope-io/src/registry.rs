//! Decoder registry keyed by file extension
//!
//! The viewer never names a concrete decoder; it asks the registry for the
//! one matching a frame location and falls back to PCD.

use std::collections::HashMap;
use std::sync::Arc;

use pcdscope_core::{Error, PointGeometry, Result};

use crate::pcd::PcdDecoder;
use crate::PointCloudDecoder;

/// Maps lowercase extensions to decoders
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn PointCloudDecoder>>,
    fallback: Option<Arc<dyn PointCloudDecoder>>,
}

impl DecoderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            fallback: None,
        }
    }

    /// Create a registry with all built-in decoders, PCD as the fallback
    pub fn with_default_decoders() -> Self {
        let mut registry = Self::new();
        let pcd: Arc<dyn PointCloudDecoder> = Arc::new(PcdDecoder);
        registry.register("pcd", pcd.clone());
        registry.fallback = Some(pcd);
        registry
    }

    /// Register a decoder for an extension, replacing any previous one
    pub fn register(&mut self, extension: &str, decoder: Arc<dyn PointCloudDecoder>) {
        self.decoders.insert(extension.to_lowercase(), decoder);
    }

    /// Decoder used when a location has no registered extension
    pub fn set_fallback(&mut self, decoder: Option<Arc<dyn PointCloudDecoder>>) {
        self.fallback = decoder;
    }

    /// Find the decoder for a path or URL
    pub fn decoder_for(&self, location: &str) -> Result<Arc<dyn PointCloudDecoder>> {
        extension_of(location)
            .and_then(|ext| self.decoders.get(&ext).cloned())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("No decoder registered for {}", location))
            })
    }

    /// Decode `bytes` with the decoder matching `location`
    pub fn decode(&self, location: &str, bytes: &[u8]) -> Result<PointGeometry> {
        self.decoder_for(location)?.decode(bytes)
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_default_decoders()
    }
}

/// Lowercase extension of the last path segment, ignoring query and fragment
fn extension_of(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcdscope_core::Point3f;

    struct FixedDecoder(usize);

    impl PointCloudDecoder for FixedDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<PointGeometry> {
            Ok(PointGeometry::from_positions(vec![Point3f::origin(); self.0]))
        }

        fn format_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_extension_parsing() {
        assert_eq!(extension_of("/models/frame1.pcd").as_deref(), Some("pcd"));
        assert_eq!(extension_of("https://host/a/b.PCD?v=2#x").as_deref(), Some("pcd"));
        assert_eq!(extension_of("C:\\data\\scan.xyz").as_deref(), Some("xyz"));
        assert_eq!(extension_of("https://host.example/frames/latest"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_default_registry_falls_back_to_pcd() {
        let registry = DecoderRegistry::default();
        assert_eq!(registry.decoder_for("frame.pcd").unwrap().format_name(), "pcd");
        assert_eq!(registry.decoder_for("no_extension").unwrap().format_name(), "pcd");
        assert_eq!(registry.supported_extensions(), vec!["pcd"]);
    }

    #[test]
    fn test_registered_decoder_wins() {
        let mut registry = DecoderRegistry::with_default_decoders();
        registry.register("XYZ", Arc::new(FixedDecoder(4)));
        let geometry = registry.decode("scan.xyz", b"").unwrap();
        assert_eq!(geometry.len(), 4);
    }

    #[test]
    fn test_no_fallback_is_an_error() {
        let mut registry = DecoderRegistry::new();
        registry.set_fallback(None);
        assert!(matches!(
            registry.decoder_for("frame.bin"),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
