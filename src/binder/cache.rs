//! Binding plan cache.
//!
//! Plans are keyed by (column metadata, target descriptor) and shared as
//! `Arc<BindingPlan>`. Lookups take a read lock; the write lock is only
//! taken on a miss.
//!
//! # Eviction
//!
//! The cache holds at most `capacity` plans. When an insert would exceed it
//! the whole map is cleared. A capacity of zero disables caching entirely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::ColumnMetadata;
use crate::error::ResolutionError;

use super::descriptor::TargetDescriptor;
use super::plan::BindingPlan;
use super::resolver::ShapeResolver;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlanKey {
    columns: ColumnMetadata,
    target: TargetDescriptor,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to resolve.
    pub misses: u64,
    /// Plans currently cached.
    pub entries: usize,
}

impl CacheStats {
    /// Returns the hit rate (0.0 to 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Thread-safe cache of resolved binding plans.
#[derive(Debug)]
pub struct PlanCache {
    capacity: usize,
    plans: RwLock<HashMap<PlanKey, Arc<BindingPlan>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    /// Creates a cache holding at most `capacity` plans.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        PlanCache {
            capacity,
            plans: RwLock::new(HashMap::with_capacity(capacity.min(64))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached plan for (`columns`, `target`), resolving and
    /// caching it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error. Failed resolutions are not cached.
    pub fn get_or_resolve(
        &self,
        columns: &ColumnMetadata,
        target: &TargetDescriptor,
        resolver: &ShapeResolver,
    ) -> Result<Arc<BindingPlan>, ResolutionError> {
        if self.capacity == 0 {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return resolver.resolve(columns, target).map(Arc::new);
        }

        let key = PlanKey {
            columns: columns.clone(),
            target: target.clone(),
        };

        if let Some(plan) = self.plans.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(shape = %target, "plan cache hit");
            return Ok(Arc::clone(plan));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let plan = Arc::new(resolver.resolve(columns, target)?);

        let mut plans = self.plans.write();
        // Another thread may have resolved the same key meanwhile.
        if let Some(existing) = plans.get(&key) {
            return Ok(Arc::clone(existing));
        }
        if plans.len() >= self.capacity {
            tracing::debug!(evicted = plans.len(), "plan cache full, clearing");
            plans.clear();
        }
        plans.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.plans.read().len(),
        }
    }

    /// Drops every cached plan. Counters are kept.
    pub fn clear(&self) {
        self.plans.write().clear();
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
