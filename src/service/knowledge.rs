//! Service facade coordinating the gateway, pipeline, and agent.

use std::sync::Arc;

use crate::agent::{
    CheckpointStore, ConversationAgent, ConverseOutcome, InMemoryCheckpointStore, ToolSet,
};
use crate::config::get_config;
use crate::embedding::{EmbeddingClient, FeatureHashEmbedder};
use crate::llm::{ChatClient, chat_client_from_config};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::qdrant::{ChunkHit, ChunkInsert, QdrantGateway, normalize_filename};
use crate::retrieval::{QueryContext, RetrievalPipeline};

use super::types::{
    DocumentChunk, EmbeddingOrStore, EnsureCollectionOutcome, IngestOutcome, ServiceError,
};

/// Chunks written per upsert request, so a mid-batch failure can report how
/// many were already stored.
const INGEST_BATCH_SIZE: usize = 64;

/// Long-lived facade exposing the four boundary operations.
///
/// Owns the gateway, embedding and chat collaborators, the retrieval
/// pipeline, and the conversational agent. Construct once near process start
/// and share through an `Arc`.
pub struct KnowledgeService {
    store: Arc<QdrantGateway>,
    embedding: Arc<dyn EmbeddingClient>,
    pipeline: Arc<RetrievalPipeline>,
    agent: ConversationAgent,
    metrics: Arc<ServiceMetrics>,
    dimension: usize,
}

impl KnowledgeService {
    /// Build the service from the environment-loaded configuration.
    ///
    /// Uses the OpenAI-compatible chat client, the deterministic embedder,
    /// and in-memory checkpoints. Call [`crate::config::init_config`] first.
    pub fn from_env() -> Result<Self, ServiceError> {
        let config = get_config();
        let store = Arc::new(QdrantGateway::from_config()?);
        let embedding: Arc<dyn EmbeddingClient> =
            Arc::new(FeatureHashEmbedder::new(config.embedding_dimension));
        let chat: Arc<dyn ChatClient> = Arc::new(chat_client_from_config());
        let checkpoints: Arc<dyn CheckpointStore> = Arc::new(InMemoryCheckpointStore::new());
        Ok(Self::with_components(
            store,
            embedding,
            chat,
            checkpoints,
            config.retrieval_top_k,
            config.agent_max_cycles,
        ))
    }

    /// Build the service from explicit collaborator handles.
    ///
    /// Collections are created with the embedding client's declared
    /// dimensionality.
    pub fn with_components(
        store: Arc<QdrantGateway>,
        embedding: Arc<dyn EmbeddingClient>,
        chat: Arc<dyn ChatClient>,
        checkpoints: Arc<dyn CheckpointStore>,
        top_k: usize,
        max_cycles: usize,
    ) -> Self {
        let dimension = embedding.dimension();
        let pipeline = Arc::new(RetrievalPipeline::new(
            embedding.clone(),
            store.clone(),
            chat.clone(),
            top_k,
        ));
        let agent = ConversationAgent::new(
            chat,
            ToolSet::new(pipeline.clone()),
            checkpoints,
            max_cycles,
        );

        Self {
            store,
            embedding,
            pipeline,
            agent,
            metrics: Arc::new(ServiceMetrics::new()),
            dimension,
        }
    }

    /// Create the named collection if missing; a repeat call is a no-op.
    pub async fn ensure_collection(
        &self,
        name: &str,
    ) -> Result<EnsureCollectionOutcome, ServiceError> {
        let created = self
            .store
            .ensure_collection(name, self.dimension as u64)
            .await?;
        if created {
            self.metrics.record_collection_created();
        }
        tracing::info!(collection = name, created, "Collection ensured");
        Ok(EnsureCollectionOutcome { created })
    }

    /// Embed and index pre-split chunks into an existing collection.
    ///
    /// Writes proceed in fixed-size batches with no rollback; a failure
    /// partway through reports the count already stored.
    pub async fn ingest(
        &self,
        collection_name: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<IngestOutcome, ServiceError> {
        if collection_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "collection name must not be empty".into(),
            ));
        }
        if chunks.is_empty() {
            return Ok(IngestOutcome { stored: 0 });
        }

        tracing::info!(
            collection = collection_name,
            chunks = chunks.len(),
            "Ingesting chunks"
        );

        let mut stored = 0usize;
        for batch in chunks.chunks(INGEST_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
            let vectors = match self.embedding.embed(&texts).await {
                Ok(vectors) => vectors,
                Err(error) => {
                    return Err(ServiceError::ingestion(
                        stored,
                        EmbeddingOrStore::Embedding(error),
                    ));
                }
            };

            let points: Vec<ChunkInsert> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| ChunkInsert {
                    content: chunk.content.clone(),
                    source: chunk.source.clone(),
                    page: chunk.page,
                    filename: normalize_filename(&chunk.source),
                    vector,
                })
                .collect();

            match self.store.upsert_chunks(collection_name, points).await {
                Ok(written) => stored += written,
                Err(error) if stored == 0 => return Err(ServiceError::Store(error)),
                Err(error) => {
                    return Err(ServiceError::ingestion(
                        stored,
                        EmbeddingOrStore::Store(error),
                    ));
                }
            }
        }

        self.metrics.record_ingest(stored as u64);
        tracing::info!(collection = collection_name, stored, "Chunks ingested");
        Ok(IngestOutcome { stored })
    }

    /// Similarity-search a collection, optionally restricted to source files.
    ///
    /// Returns at most `k` chunks (default 3) ordered by decreasing score; an
    /// empty result is not an error.
    pub async fn retrieve(
        &self,
        collection_name: &str,
        query: &str,
        filenames: Option<Vec<String>>,
        k: Option<usize>,
    ) -> Result<Vec<ChunkHit>, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::Validation("query must not be empty".into()));
        }

        let hits = self
            .pipeline
            .retrieve(&QueryContext {
                collection: collection_name.to_string(),
                question: query.to_string(),
                selected_files: filenames,
                k,
            })
            .await?;
        self.metrics.record_retrieval();
        Ok(hits)
    }

    /// Run one conversational turn against the given thread.
    pub async fn converse(
        &self,
        thread_id: &str,
        user_query: &str,
        selected_files: Option<Vec<String>>,
    ) -> Result<ConverseOutcome, ServiceError> {
        if thread_id.trim().is_empty() {
            return Err(ServiceError::Validation(
                "thread id must not be empty".into(),
            ));
        }
        if user_query.trim().is_empty() {
            return Err(ServiceError::Validation(
                "user query must not be empty".into(),
            ));
        }

        let outcome = self
            .agent
            .converse(thread_id, user_query, selected_files)
            .await?;
        self.metrics.record_conversation();
        Ok(outcome)
    }

    /// Return the current activity counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
