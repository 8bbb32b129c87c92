//! Test doubles for the lookup collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::dimensions::{AssetDimensions, Dimensions, Headers, ImageSource};
use crate::error::{Error, Result};
use crate::providers::{AssetResolver, DimensionProber};

pub fn screen() -> Dimensions {
    Dimensions::new(400.0, 800.0).unwrap()
}

/// Resource ids with known sizes; remote sources report nothing
#[derive(Default)]
pub struct StaticAssets(HashMap<u32, AssetDimensions>);

impl StaticAssets {
    pub fn with(id: u32, dims: AssetDimensions) -> Self {
        let mut assets = Self::default();
        assets.0.insert(id, dims);
        assets
    }
}

impl AssetResolver for StaticAssets {
    fn resolve(&self, source: &ImageSource) -> AssetDimensions {
        match source {
            ImageSource::Resource(id) => self.0.get(id).copied().unwrap_or_default(),
            ImageSource::Remote(_) => AssetDimensions::UNKNOWN,
        }
    }
}

/// Answers from a fixed table and counts calls
#[derive(Default)]
pub struct MapProber {
    sizes: HashMap<String, Dimensions>,
    calls: AtomicUsize,
}

impl MapProber {
    pub fn with(uri: &str, dims: Dimensions) -> Self {
        let mut prober = Self::default();
        prober.sizes.insert(uri.to_string(), dims);
        prober
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DimensionProber for MapProber {
    async fn probe(&self, uri: &str, _headers: &Headers) -> Result<Dimensions> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sizes
            .get(uri)
            .copied()
            .ok_or_else(|| Error::Probe(format!("unknown uri {}", uri)))
    }
}

/// Always fails
#[derive(Default)]
pub struct FailingProber {
    calls: AtomicUsize,
}

impl FailingProber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DimensionProber for FailingProber {
    async fn probe(&self, uri: &str, _headers: &Headers) -> Result<Dimensions> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Probe(format!("unreachable {}", uri)))
    }
}

/// Sleeps before answering
pub struct SlowProber(pub Duration);

#[async_trait]
impl DimensionProber for SlowProber {
    async fn probe(&self, _uri: &str, _headers: &Headers) -> Result<Dimensions> {
        tokio::time::sleep(self.0).await;
        Dimensions::new(1.0, 1.0)
    }
}

/// Holds each probe of the gated URI until released; other URIs answer at once
pub struct GatedProber {
    gated_uri: String,
    gated: Dimensions,
    other: Dimensions,
    gate: Notify,
}

impl GatedProber {
    pub fn new(gated_uri: &str, gated: Dimensions, other: Dimensions) -> Self {
        Self {
            gated_uri: gated_uri.to_string(),
            gated,
            other,
            gate: Notify::new(),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl DimensionProber for GatedProber {
    async fn probe(&self, uri: &str, _headers: &Headers) -> Result<Dimensions> {
        if uri == self.gated_uri {
            self.gate.notified().await;
            return Ok(self.gated);
        }
        Ok(self.other)
    }
}
