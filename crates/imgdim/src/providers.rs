//! Collaborators consulted by the dimension lookup
//!
//! These traits keep platform concerns (bundled asset metadata, network
//! probing, screen size) outside the cache so tests and embedders can
//! substitute their own implementations.

use async_trait::async_trait;

use crate::dimensions::{AssetDimensions, Dimensions, Headers, ImageSource};
use crate::error::Result;

/// Synchronously reports whatever size is statically known for a source
pub trait AssetResolver: Send + Sync {
    /// Known size of `source`; axes that are not known are `None`
    fn resolve(&self, source: &ImageSource) -> AssetDimensions;
}

/// Measures a remote image
#[async_trait]
pub trait DimensionProber: Send + Sync {
    /// Measure the image at `uri`, sending `headers` with the request
    ///
    /// # Errors
    /// Returns an error if the image could not be measured. Retry and
    /// fallback policy belong to the caller.
    async fn probe(&self, uri: &str, headers: &Headers) -> Result<Dimensions>;
}

/// Supplies the display size used when nothing better is known
pub trait DisplayMetrics: Send + Sync {
    /// Screen size
    fn screen_size(&self) -> Dimensions;
}

/// Resolver that knows nothing about bundled resources and trusts the size
/// declared on remote sources
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredAssets;

impl AssetResolver for DeclaredAssets {
    fn resolve(&self, source: &ImageSource) -> AssetDimensions {
        match source {
            ImageSource::Resource(_) => AssetDimensions::UNKNOWN,
            ImageSource::Remote(remote) => remote.declared,
        }
    }
}

/// Display with a constant size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDisplay(pub Dimensions);

impl DisplayMetrics for FixedDisplay {
    fn screen_size(&self) -> Dimensions {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::RemoteSource;

    #[test]
    fn test_declared_assets() {
        let declared = AssetDimensions {
            width: Some(640.0),
            height: None,
        };
        let remote = ImageSource::Remote(RemoteSource::new("https://a/b.png").with_declared(declared));

        assert_eq!(DeclaredAssets.resolve(&remote), declared);
        assert_eq!(DeclaredAssets.resolve(&ImageSource::Resource(3)), AssetDimensions::UNKNOWN);
    }
}
