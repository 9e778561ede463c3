//! Chain relation cache
//!
//! Chain relations change rarely but are consulted for every candidate, so
//! the whole list is cached for a short TTL. A failed refresh falls back to
//! the last good list when there is one.

use arbitration_types::{ChainRelation, MetadataError, MetadataSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default time-to-live of the cached list
pub const CHAIN_RELATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct CachedRelations {
    relations: Arc<Vec<ChainRelation>>,
    fetched_at: Instant,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
}

/// Process-wide cache of the chain relation list
#[derive(Debug)]
pub struct ChainRelationCache {
    entry: RwLock<Option<CachedRelations>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
}

impl ChainRelationCache {
    /// Create a cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
        }
    }

    /// Cached relations, refreshed from `source` when missing or expired
    pub async fn get(&self, source: &dyn MetadataSource) -> Result<Arc<Vec<ChainRelation>>, MetadataError> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(cached.relations.clone());
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match source.chain_relations().await {
            Ok(relations) => {
                let relations = Arc::new(relations);
                *self.entry.write().await = Some(CachedRelations {
                    relations: relations.clone(),
                    fetched_at: Instant::now(),
                });
                tracing::debug!("Refreshed {} chain relations", relations.len());
                Ok(relations)
            }
            Err(e) => {
                let entry = self.entry.read().await;
                match entry.as_ref() {
                    Some(cached) => {
                        self.stale_hits.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("Chain relation refresh failed, serving stale list: {}", e);
                        Ok(cached.relations.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
        }
    }
}

impl Default for ChainRelationCache {
    fn default() -> Self {
        Self::new(CHAIN_RELATION_TTL)
    }
}
