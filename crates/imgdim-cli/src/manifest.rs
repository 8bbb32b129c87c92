//! Asset manifest
//!
//! A JSON file describing what is known about bundled resources and remote
//! images, loaded once at startup and served through the lookup traits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use imgdim::{AssetDimensions, AssetResolver, DimensionProber, Dimensions, Headers, ImageSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Manifest file contents
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    /// Screen size used for fallbacks
    #[serde(default)]
    pub screen: Option<Dimensions>,

    /// Bundled resource id -> known size
    #[serde(default)]
    pub assets: HashMap<u32, AssetDimensions>,

    /// Remote URI -> size reported by the prober
    #[serde(default)]
    pub remote: HashMap<String, Dimensions>,

    /// Simulated probe latency
    #[serde(default)]
    pub probe_delay_ms: u64,
}

impl Manifest {
    /// Load a manifest from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

        info!(
            "Loaded manifest with {} assets and {} remote images",
            manifest.assets.len(),
            manifest.remote.len()
        );
        Ok(manifest)
    }

    /// Split into the resolver and prober handed to the lookup
    pub fn into_parts(self) -> (ManifestAssets, ManifestProber) {
        (
            ManifestAssets {
                assets: self.assets,
            },
            ManifestProber {
                remote: self.remote,
                delay: Duration::from_millis(self.probe_delay_ms),
            },
        )
    }
}

/// Resolves bundled resources from the manifest
pub struct ManifestAssets {
    assets: HashMap<u32, AssetDimensions>,
}

impl AssetResolver for ManifestAssets {
    fn resolve(&self, source: &ImageSource) -> AssetDimensions {
        match source {
            ImageSource::Resource(id) => self.assets.get(id).copied().unwrap_or_default(),
            ImageSource::Remote(remote) => remote.declared,
        }
    }
}

/// Answers probes from the manifest's remote table
pub struct ManifestProber {
    remote: HashMap<String, Dimensions>,
    delay: Duration,
}

#[async_trait]
impl DimensionProber for ManifestProber {
    async fn probe(&self, uri: &str, headers: &Headers) -> imgdim::Result<Dimensions> {
        debug!(uri, headers = headers.len(), "Probing");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.remote
            .get(uri)
            .copied()
            .ok_or_else(|| imgdim::Error::Probe(format!("no dimensions recorded for {}", uri)))
    }
}
