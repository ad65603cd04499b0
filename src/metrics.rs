use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and conversation activity.
#[derive(Default)]
pub struct ServiceMetrics {
    collections_ensured: AtomicU64,
    chunks_ingested: AtomicU64,
    retrievals: AtomicU64,
    conversations: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a collection creation (not counted for idempotent no-ops).
    pub fn record_collection_created(&self) {
        self.collections_ensured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an ingestion batch and the number of chunks it stored.
    pub fn record_ingest(&self, chunk_count: u64) {
        self.chunks_ingested.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a completed similarity search.
    pub fn record_retrieval(&self) {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed conversational turn.
    pub fn record_conversation(&self) {
        self.conversations.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            collections_ensured: self.collections_ensured.load(Ordering::Relaxed),
            chunks_ingested: self.chunks_ingested.load(Ordering::Relaxed),
            retrievals: self.retrievals.load(Ordering::Relaxed),
            conversations: self.conversations.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of activity counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of collections created since startup.
    pub collections_ensured: u64,
    /// Total chunk count stored across all ingestion requests.
    pub chunks_ingested: u64,
    /// Number of similarity searches served.
    pub retrievals: u64,
    /// Number of conversational turns completed.
    pub conversations: u64,
}
