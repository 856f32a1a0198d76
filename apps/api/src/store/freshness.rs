//! Freshness layer over the vector store.
//!
//! The underlying store has no native TTL, so expiry is a reserved metadata
//! key plus a filter predicate built at query time. A periodic sweep deletes
//! expired records to bound storage growth; even when the sweep lags, stale
//! records are still excluded from results by the filter.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::store::{Document, Filter, ScoredDocument, SearchRequest, StoreError, VectorStore};

/// Reserved metadata key holding the expiration instant in epoch millis.
/// Records without it never expire.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Interval between expired-record sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Wall clock, injectable so tests can move time past a record's expiry.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Similarity search over records with a per-record expiration.
pub struct FreshnessStore {
    store: Arc<VectorStore>,
    clock: Arc<dyn Clock>,
}

impl FreshnessStore {
    pub fn new(store: Arc<VectorStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Stores a record expiring at the given instant (epoch millis).
    /// Duplicates are allowed; repeated searches add overlapping text.
    pub async fn add_with_ttl(
        &self,
        text: impl Into<String>,
        expires_at_millis: i64,
    ) -> Result<String, StoreError> {
        let mut metadata = Map::new();
        metadata.insert(TIMESTAMP_KEY.to_string(), json!(expires_at_millis));
        self.add_document(text, metadata).await
    }

    /// Stores a never-expiring record, e.g. family facts.
    pub async fn add_permanent(
        &self,
        text: impl Into<String>,
        mut metadata: Map<String, Value>,
    ) -> Result<String, StoreError> {
        metadata.remove(TIMESTAMP_KEY);
        self.add_document(text, metadata).await
    }

    async fn add_document(
        &self,
        text: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let document = Document::new(text, metadata);
        let mut ids = self.store.add(vec![document]).await?;
        Ok(ids.remove(0))
    }

    /// Similarity search excluding records whose expiration is in the past
    /// relative to the instant the filter is constructed. Store errors
    /// propagate to the caller.
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<ScoredDocument>, StoreError> {
        let fresh = Filter::Gt(TIMESTAMP_KEY.to_string(), self.clock.now_millis())
            .or(Filter::Absent(TIMESTAMP_KEY.to_string()));
        let filter = match request.filter.clone() {
            Some(existing) => existing.and(fresh),
            None => fresh,
        };
        self.store.search(&request.filter(filter)).await
    }

    pub async fn delete(&self, ids: &[String]) -> usize {
        self.store.delete_ids(ids).await
    }

    pub async fn delete_where(&self, filter: &Filter) -> usize {
        self.store.delete_where(filter).await
    }

    /// Deletes every record whose expiration has passed. Best-effort
    /// background maintenance: never panics, never propagates.
    pub async fn sweep_expired(&self) {
        let expired = Filter::Lte(TIMESTAMP_KEY.to_string(), self.clock.now_millis());
        let deleted = self.store.delete_where(&expired).await;
        debug!("sweep removed {deleted} expired records");
    }

    /// Spawns the hourly sweep loop.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                store.sweep_expired().await;
            }
        })
    }

    /// Direct existence check, used by maintenance endpoints and tests.
    pub async fn len(&self) -> usize {
        self.store.len().await
    }
}
