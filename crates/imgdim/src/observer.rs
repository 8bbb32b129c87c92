//! Per-observer "current dimensions" slot
//!
//! An observer asks for the dimensions of one source at a time. Results
//! land in its slot only if it is still attached and has not moved on to a
//! newer source; a stale or orphaned lookup may still fill the shared cache.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::dimensions::{Dimensions, ImageSource};
use crate::lookup::DimensionLookup;

struct ObserverState {
    current: Mutex<Option<Dimensions>>,
    generation: AtomicU64,
    attached: AtomicBool,
}

/// Handle to one observer's dimensions slot
///
/// Clones share the same slot.
#[derive(Clone)]
pub struct DimensionsObserver {
    state: Arc<ObserverState>,
}

impl DimensionsObserver {
    /// Create an attached observer with an empty slot
    pub fn new() -> Self {
        Self {
            state: Arc::new(ObserverState {
                current: Mutex::new(None),
                generation: AtomicU64::new(0),
                attached: AtomicBool::new(true),
            }),
        }
    }

    /// Dimensions applied by the latest completed `observe`, if any
    pub fn current(&self) -> Option<Dimensions> {
        *self.state.current.lock()
    }

    /// Whether updates are still accepted
    pub fn is_attached(&self) -> bool {
        self.state.attached.load(Ordering::Acquire)
    }

    /// Stop accepting updates; in-flight lookups are left to finish
    ///
    /// Waits for an update that is already writing the slot, so the slot never
    /// changes after this returns.
    pub fn detach(&self) {
        let _slot = self.state.current.lock();
        self.state.attached.store(false, Ordering::Release);
    }

    /// Look up `source` and apply the result to the slot
    ///
    /// Missing or degenerate dimensions resolve to [`DimensionLookup::fallback`].
    /// Returns `false` when the result was discarded because the observer
    /// detached or a newer `observe` started meanwhile.
    pub async fn observe(&self, lookup: &DimensionLookup, source: &ImageSource) -> bool {
        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let dims = match lookup.lookup(source).await {
            Some(dims) if !dims.is_degenerate() => dims,
            _ => lookup.fallback(),
        };

        self.apply(generation, dims)
    }

    /// Run [`observe`](Self::observe) on the tokio runtime
    pub fn spawn_observe(&self, lookup: Arc<DimensionLookup>, source: ImageSource) -> JoinHandle<bool> {
        let observer = self.clone();
        tokio::spawn(async move { observer.observe(&lookup, &source).await })
    }

    fn apply(&self, generation: u64, dims: Dimensions) -> bool {
        let mut current = self.state.current.lock();

        if !self.is_attached() {
            debug!("Observer detached, dropping dimensions {}", dims);
            return false;
        }
        if self.state.generation.load(Ordering::Acquire) != generation {
            debug!("Superseded lookup, dropping dimensions {}", dims);
            return false;
        }

        *current = Some(dims);
        true
    }
}

impl Default for DimensionsObserver {
    fn default() -> Self {
        Self::new()
    }
}
