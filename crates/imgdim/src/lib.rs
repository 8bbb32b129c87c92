//! # imgdim
//!
//! Memoized image dimension lookups backed by a bounded LRU cache.
//!
//! ## Architecture
//! - **LruCache**: slab-backed doubly-linked recency list + AHash index (O(1))
//! - **DimensionLookup**: consults the cache, then resolves misses from
//!   bundled asset metadata or an async remote prober
//! - **DimensionsObserver**: per-consumer slot that ignores results arriving
//!   after it detached or moved on
//!
//! The cache itself is not synchronized. `DimensionLookup` owns the single
//! instance and serializes access with a short-lived lock that is never held
//! across an `.await`.

#![warn(missing_docs)]

mod dimensions;
mod error;
mod lookup;
mod lru;
mod observer;
mod providers;
mod stats;

#[cfg(test)]
mod testing;

pub use dimensions::{AssetDimensions, CacheKey, Dimensions, Headers, ImageSource, RemoteSource};
pub use error::{Error, Result};
pub use lookup::{DimensionLookup, LookupConfig, DEFAULT_CAPACITY, DEFAULT_FALLBACK_HEIGHT_RATIO};
pub use lru::{Iter, LruCache};
pub use observer::DimensionsObserver;
pub use providers::{AssetResolver, DeclaredAssets, DimensionProber, DisplayMetrics, FixedDisplay};
pub use stats::{CacheStats, StatsSnapshot};
