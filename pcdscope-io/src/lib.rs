//! Point cloud decoding and asset fetching
//!
//! This crate turns a frame location into decoded [`PointGeometry`]:
//! - fetching bytes from local paths or URLs, with an optional cache
//! - decoding PCD files in ascii, binary and binary_compressed form
//! - choosing a decoder by file extension

pub mod pcd;
pub mod lzf;
pub mod registry;
pub mod fetch;
pub mod error;

pub use error::*;
pub use pcd::{PcdDecoder, PcdHeader, PcdField, PcdFieldType, PcdDataFormat};
pub use registry::DecoderRegistry;
pub use fetch::{AssetCache, AssetFetcher, AssetSource, CachePolicy, FileSource};
#[cfg(feature = "http")]
pub use fetch::HttpSource;

use pcdscope_core::{PointGeometry, Result};

/// Turns the raw bytes of a point cloud file into geometry
pub trait PointCloudDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PointGeometry>;

    /// Get the format name this decoder handles
    fn format_name(&self) -> &'static str;
}

/// Fetch `location` and decode it with the matching registered decoder
pub fn load_point_cloud(
    fetcher: &AssetFetcher,
    decoders: &DecoderRegistry,
    location: &str,
) -> Result<PointGeometry> {
    let bytes = fetcher.fetch(location)?;
    decoders.decode(location, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcdscope_core::{Error, Point3f};
    use std::fs;

    #[test]
    fn test_load_point_cloud_from_file() {
        let path = std::env::temp_dir().join(format!("pcdscope_load_{}.pcd", std::process::id()));
        let content = "VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
WIDTH 2
HEIGHT 1
POINTS 2
DATA ascii
1 1 1
3 3 3
";
        fs::write(&path, content).unwrap();

        let fetcher = AssetFetcher::new();
        let geometry =
            load_point_cloud(&fetcher, &DecoderRegistry::default(), &path.to_string_lossy())
                .unwrap();
        assert_eq!(geometry.positions(), &[Point3f::new(1.0, 1.0, 1.0), Point3f::new(3.0, 3.0, 3.0)]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_point_cloud_missing_file_is_fetch_error() {
        let result = load_point_cloud(
            &AssetFetcher::new(),
            &DecoderRegistry::default(),
            "/no/such/frame.pcd",
        );
        assert!(matches!(result, Err(Error::Fetch(_))));
    }
}
