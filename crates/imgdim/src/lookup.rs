//! Memoized dimension lookup
//!
//! The cache is consulted synchronously before any probing starts and
//! updated synchronously once a probe completes; the lock is never held
//! across an `.await`.

use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::dimensions::{AssetDimensions, CacheKey, Dimensions, ImageSource, RemoteSource};
use crate::error::{Error, Result};
use crate::lru::LruCache;
use crate::providers::{AssetResolver, DimensionProber, DisplayMetrics};
use crate::stats::CacheStats;

/// Default number of cached entries
pub const DEFAULT_CAPACITY: usize = 50;

/// Default share of the screen height used as fallback height
pub const DEFAULT_FALLBACK_HEIGHT_RATIO: f64 = 0.75;

/// Lookup tuning
#[derive(Debug, Clone, PartialEq)]
pub struct LookupConfig {
    /// Maximum number of cached entries
    pub capacity: usize,
    /// Fallback height as a share of the screen height
    pub fallback_height_ratio: f64,
    /// Upper bound for a single probe attempt
    pub probe_timeout: Option<Duration>,
    /// Extra probe attempts after a failure
    pub probe_retries: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            fallback_height_ratio: DEFAULT_FALLBACK_HEIGHT_RATIO,
            probe_timeout: None,
            probe_retries: 0,
        }
    }
}

/// Memoizes image dimensions in a bounded LRU cache
pub struct DimensionLookup {
    cache: Mutex<LruCache<CacheKey, Dimensions>>,
    stats: CacheStats,
    resolver: Arc<dyn AssetResolver>,
    prober: Arc<dyn DimensionProber>,
    metrics: Arc<dyn DisplayMetrics>,
    config: LookupConfig,
}

impl DimensionLookup {
    /// Create a lookup owning a fresh cache
    ///
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] if `config.capacity` is zero and
    /// [`Error::InvalidConfig`] if the fallback ratio is negative or not finite.
    pub fn new(
        config: LookupConfig,
        resolver: Arc<dyn AssetResolver>,
        prober: Arc<dyn DimensionProber>,
        metrics: Arc<dyn DisplayMetrics>,
    ) -> Result<Self> {
        let ratio = config.fallback_height_ratio;
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "fallback height ratio must be finite and non-negative, got {}",
                ratio
            )));
        }
        let cache = LruCache::new(config.capacity)?;

        Ok(Self {
            cache: Mutex::new(cache),
            stats: CacheStats::new(),
            resolver,
            prober,
            metrics,
            config,
        })
    }

    /// Size used when nothing is known about an image
    pub fn fallback(&self) -> Dimensions {
        let screen = self.metrics.screen_size();
        Dimensions {
            width: screen.width,
            height: screen.height * self.config.fallback_height_ratio,
        }
    }

    /// Look up the dimensions of `source`
    ///
    /// Hits are returned as cached. Misses are computed, stored and returned.
    /// `None` means no dimensions could be obtained (a source without a URI,
    /// or every probe attempt failed); nothing is cached in that case.
    pub async fn lookup(&self, source: &ImageSource) -> Option<Dimensions> {
        let Some(key) = source.cache_key() else {
            debug!("Source has no cache key, skipping lookup");
            return None;
        };

        if let Some(dims) = self.cached(&key) {
            return Some(dims);
        }

        let fallback = self.fallback();
        let declared = self.resolver.resolve(source);
        let resolved = match source {
            ImageSource::Resource(_) => declared.resolve(fallback),
            ImageSource::Remote(remote) => {
                let measured = self.probe(remote).await?;
                AssetDimensions::measured(measured)
                    .or(declared)
                    .resolve(fallback)
            }
        };

        // Screen metrics are supplied by the embedder and may be invalid
        let dims = match Dimensions::new(resolved.width, resolved.height) {
            Ok(dims) => dims,
            Err(e) => {
                warn!(%key, "Not caching unusable dimensions: {}", e);
                return None;
            }
        };

        self.store(key, dims);
        Some(dims)
    }

    /// Read a cached entry, marking it most recently used
    pub fn cached(&self, key: &CacheKey) -> Option<Dimensions> {
        let hit = self.cache.lock().get(key).copied();
        match hit {
            Some(_) => {
                self.stats.record_hit();
                debug!(%key, "Dimension cache hit");
            }
            None => {
                self.stats.record_miss();
                debug!(%key, "Dimension cache miss");
            }
        }
        hit
    }

    /// Check for an entry without touching recency or statistics
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.lock().contains(key)
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Current number of cached entries
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Cache capacity
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Drop all cached entries and reset statistics
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        self.stats.reset();
    }

    fn store(&self, key: CacheKey, dims: Dimensions) {
        let evicted = self.cache.lock().put(key, dims);
        self.stats.record_insert();
        if let Some((old_key, _)) = evicted {
            self.stats.record_eviction();
            debug!(key = %old_key, "Evicted least recently used dimensions");
        }
    }

    async fn probe(&self, remote: &RemoteSource) -> Option<Dimensions> {
        let attempts = self.config.probe_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let pending = self.prober.probe(&remote.uri, &remote.headers);
            let outcome = match self.config.probe_timeout {
                Some(limit) => tokio::time::timeout(limit, pending)
                    .await
                    .unwrap_or(Err(Error::ProbeTimeout(limit))),
                None => pending.await,
            };

            match outcome {
                Ok(dims) => return Some(dims),
                Err(e) => {
                    self.stats.record_probe_failure();
                    warn!(uri = %remote.uri, attempt, attempts, "Probe failed: {}", e);
                }
            }
        }

        None
    }
}
