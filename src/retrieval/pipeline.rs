//! Fixed two-stage retrieval pipeline: retrieve top-k chunks, then generate a
//! grounded answer from exactly those chunks.

use std::sync::Arc;

use crate::embedding::EmbeddingClient;
use crate::llm::{ChatClient, ChatMessage};
use crate::qdrant::{ChunkHit, QdrantGateway, build_filename_filter};

use super::types::{PipelineError, QueryContext, RetrievalOutcome};

const GROUNDING_INSTRUCTIONS: &str = "You are a helpful assistant. \
Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Retrieve-then-generate pipeline over one vector store gateway.
///
/// The topology is fixed: there is no re-ranking, deduplication, or fan-out.
/// Construct once and share; all handles are long-lived.
pub struct RetrievalPipeline {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<QdrantGateway>,
    chat: Arc<dyn ChatClient>,
    dimension: usize,
    default_top_k: usize,
}

impl RetrievalPipeline {
    /// Build a pipeline from explicit collaborator handles.
    ///
    /// The expected vector width comes from the embedding client's declared
    /// dimensionality; providers that emit differently sized vectors are
    /// rejected per query.
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        store: Arc<QdrantGateway>,
        chat: Arc<dyn ChatClient>,
        default_top_k: usize,
    ) -> Self {
        let dimension = embedding.dimension();
        Self {
            embedding,
            store,
            chat,
            dimension,
            default_top_k,
        }
    }

    /// Run both stages and return the answer with its supporting context.
    ///
    /// Zero retrieved chunks still proceed to generation with an empty context
    /// block; the grounding prompt instructs the model to admit not knowing.
    pub async fn run(&self, ctx: QueryContext) -> Result<RetrievalOutcome, PipelineError> {
        let hits = self.retrieve(&ctx).await?;
        tracing::debug!(
            collection = %ctx.collection,
            hits = hits.len(),
            "Retrieved context chunks"
        );
        let answer = self.generate(&ctx.question, &hits).await?;
        Ok(RetrievalOutcome {
            answer,
            context: hits,
        })
    }

    /// Stage one: embed the question and search the collection.
    pub async fn retrieve(&self, ctx: &QueryContext) -> Result<Vec<ChunkHit>, PipelineError> {
        let mut vectors = self
            .embedding
            .embed(std::slice::from_ref(&ctx.question))
            .await?;
        let vector = vectors.pop().ok_or(PipelineError::EmptyEmbedding)?;

        if vector.len() != self.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let filter = ctx
            .selected_files
            .as_deref()
            .and_then(build_filename_filter);
        let limit = ctx.k.unwrap_or(self.default_top_k).max(1);

        let hits = self
            .store
            .search_chunks(&ctx.collection, vector, filter, limit)
            .await?;
        Ok(hits)
    }

    /// Stage two: answer strictly from the retrieved chunks.
    async fn generate(&self, question: &str, hits: &[ChunkHit]) -> Result<String, PipelineError> {
        let context_block = hits
            .iter()
            .map(|hit| hit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let messages = [
            ChatMessage::system(format!("{GROUNDING_INSTRUCTIONS}\n{context_block}")),
            ChatMessage::user(format!("\nQuestion: {question}")),
        ];

        let reply = self.chat.complete(&messages, &[]).await?;
        Ok(reply.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::FeatureHashEmbedder;
    use crate::llm::{ChatClientError, ToolSpec};
    use async_trait::async_trait;
    use httpmock::{Method::POST, MockServer};
    use reqwest::Client;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Chat stand-in that records the prompts it receives.
    struct EchoChat {
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatClient for EchoChat {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<ChatMessage, ChatClientError> {
            self.seen.lock().await.push(messages.to_vec());
            Ok(ChatMessage::assistant("Paris is the capital of France."))
        }
    }

    fn mock_store(base_url: String) -> Arc<QdrantGateway> {
        Arc::new(QdrantGateway {
            client: Client::builder()
                .user_agent("knowledgebot-test")
                .build()
                .expect("client"),
            base_url,
            api_key: None,
        })
    }

    #[tokio::test]
    async fn pipeline_grounds_generation_in_retrieved_chunks() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/conv-1/points/query");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        {
                            "id": "p1",
                            "score": 0.9,
                            "payload": {
                                "content": "Paris is the capital of France.",
                                "source": "geo.pdf",
                                "page": 0,
                                "filename": "geo"
                            }
                        }
                    ]
                }));
            })
            .await;

        let chat = Arc::new(EchoChat {
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = RetrievalPipeline::new(
            Arc::new(FeatureHashEmbedder::new(8)),
            mock_store(server.base_url()),
            chat.clone(),
            3,
        );

        let outcome = pipeline
            .run(QueryContext {
                collection: "conv-1".into(),
                question: "What is the capital of France?".into(),
                selected_files: None,
                k: Some(1),
            })
            .await
            .expect("pipeline");

        assert_eq!(outcome.answer, "Paris is the capital of France.");
        assert_eq!(outcome.context.len(), 1);

        let seen = chat.seen.lock().await;
        assert_eq!(seen.len(), 1);
        let system = &seen[0][0];
        assert!(system.content.contains("Paris is the capital of France."));
        assert!(system.content.contains("don't know"));
        let user = &seen[0][1];
        assert!(user.content.contains("What is the capital of France?"));
    }

    #[tokio::test]
    async fn empty_retrieval_still_generates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/conv-1/points/query");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": []
                }));
            })
            .await;

        let chat = Arc::new(EchoChat {
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = RetrievalPipeline::new(
            Arc::new(FeatureHashEmbedder::new(8)),
            mock_store(server.base_url()),
            chat.clone(),
            3,
        );

        let outcome = pipeline
            .run(QueryContext {
                collection: "conv-1".into(),
                question: "unrelated question".into(),
                selected_files: Some(vec!["nonexistent".into()]),
                k: None,
            })
            .await
            .expect("pipeline");

        assert!(outcome.context.is_empty());
        assert!(!outcome.answer.is_empty());
    }

    /// Embedding provider that declares one width but emits another.
    struct SkewedEmbedder;

    #[async_trait]
    impl EmbeddingClient for SkewedEmbedder {
        async fn embed(
            &self,
            texts: &[String],
        ) -> Result<Vec<Vec<f32>>, crate::embedding::EmbeddingClientError> {
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_before_search() {
        let server = MockServer::start_async().await;
        let chat = Arc::new(EchoChat {
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = RetrievalPipeline::new(
            Arc::new(SkewedEmbedder),
            mock_store(server.base_url()),
            chat,
            3,
        );

        let error = pipeline
            .retrieve(&QueryContext {
                collection: "conv-1".into(),
                question: "q".into(),
                selected_files: None,
                k: None,
            })
            .await
            .expect_err("mismatch");

        assert!(matches!(
            error,
            PipelineError::DimensionMismatch {
                expected: 8,
                actual: 4
            }
        ));
    }
}
