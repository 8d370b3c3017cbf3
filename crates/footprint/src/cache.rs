//! Single-slot cache of the joined dataset, keyed by region.
//!
//! Readers always see either the previous complete entry or the new
//! complete entry; a failed load leaves the slot empty.

use crate::pipeline::JoinedDataset;
use crate::region::BoundingBox;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct CacheEntry {
    pub region: BoundingBox,
    pub dataset: JoinedDataset,
    pub fetched_at: DateTime<Utc>,
    /// Increases by one for every stored entry.
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

#[derive(Debug, Default)]
pub struct RegionCache {
    slot: RwLock<Option<Arc<CacheEntry>>>,
    versions: AtomicU64,
    loading: tokio::sync::Mutex<()>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<CacheEntry>> {
        self.slot.read().clone()
    }

    /// The cached entry, if it was built for exactly `region`.
    pub fn get(&self, region: &BoundingBox) -> Option<Arc<CacheEntry>> {
        self.current().filter(|entry| entry.region == *region)
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    /// Replaces the slot with a new entry for `region`.
    pub fn store(&self, region: BoundingBox, dataset: JoinedDataset) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            region,
            dataset,
            fetched_at: Utc::now(),
            version: self.versions.fetch_add(1, Ordering::Relaxed) + 1,
        });
        *self.slot.write() = Some(entry.clone());
        entry
    }

    /// Returns the entry for `region`, running `load` on a miss.
    ///
    /// Loads are serialized: a caller that waited on another caller's load
    /// for the same region gets that result as a hit.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        region: BoundingBox,
        load: F,
    ) -> Result<(Arc<CacheEntry>, Lookup), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<JoinedDataset, E>>,
    {
        if let Some(entry) = self.get(&region) {
            return Ok((entry, Lookup::Hit));
        }

        let _guard = self.loading.lock().await;
        if let Some(entry) = self.get(&region) {
            return Ok((entry, Lookup::Hit));
        }

        match load().await {
            Ok(dataset) => {
                let entry = self.store(region, dataset);
                tracing::info!(
                    region = %region,
                    version = entry.version,
                    records = entry.dataset.len(),
                    "Cached joined dataset"
                );
                Ok((entry, Lookup::Miss))
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }
}
