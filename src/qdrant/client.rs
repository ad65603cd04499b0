//! HTTP gateway for the Qdrant vector store.

use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

use super::payload::{build_chunk_payload, current_timestamp_rfc3339, generate_point_id};
use super::types::{ChunkHit, ChunkInsert, QdrantError, QueryResponse, QueryResponseResult};
use crate::config::get_config;

const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Lightweight HTTP client owning one logical collection per namespace.
pub struct QdrantGateway {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantGateway {
    /// Construct a gateway against the given Qdrant endpoint.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("knowledgebot/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant gateway"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Construct a gateway using configuration loaded from the environment.
    pub fn from_config() -> Result<Self, QdrantError> {
        let config = get_config();
        Self::new(&config.qdrant_url, config.qdrant_api_key.clone())
    }

    /// Create the collection and its filename index only when missing.
    ///
    /// Returns `true` when the collection was created by this call, `false`
    /// when it already existed. Safe to call repeatedly.
    pub async fn ensure_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<bool, QdrantError> {
        validate_collection_name(collection_name)?;

        if self.collection_exists(collection_name).await? {
            tracing::debug!(collection = collection_name, "Collection already exists");
            return Ok(false);
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await?;
        self.create_filename_index(collection_name).await?;
        Ok(true)
    }

    /// Insert embedded chunks into the given collection.
    ///
    /// The caller must have ensured the collection first; a missing namespace
    /// surfaces as [`QdrantError::CollectionNotFound`]. Returns the number of
    /// points written.
    pub async fn upsert_chunks(
        &self,
        collection_name: &str,
        chunks: Vec<ChunkInsert>,
    ) -> Result<usize, QdrantError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let point_count = chunks.len();
        let points: Vec<Value> = chunks
            .into_iter()
            .map(|chunk| {
                let payload = build_chunk_payload(&chunk, &now);
                json!({
                    "id": generate_point_id(),
                    "vector": chunk.vector,
                    "payload": payload,
                })
            })
            .collect();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::debug!(
                    collection = collection_name,
                    points = point_count,
                    "Chunks indexed"
                );
                Ok(point_count)
            }
            StatusCode::NOT_FOUND => {
                Err(QdrantError::CollectionNotFound(collection_name.to_string()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Chunk upsert failed");
                Err(error)
            }
        }
    }

    /// Perform a similarity search, returning up to `limit` scored chunks.
    ///
    /// The optional filter restricts eligibility by normalized filename; an
    /// empty result set is not an error.
    pub async fn search_chunks(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ChunkHit>, QdrantError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter_value) = filter {
            body.as_object_mut()
                .expect("query body should remain an object")
                .insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )?
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(QdrantError::CollectionNotFound(collection_name.to_string()));
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
                return Err(error);
            }
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };

        Ok(points.into_iter().map(|point| point.into_hit()).collect())
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection created");
        })
        .await
    }

    /// Keyword index on the normalized filename field, so filtered search runs
    /// against the index rather than a payload scan.
    async fn create_filename_index(&self, collection_name: &str) -> Result<(), QdrantError> {
        let body = json!({
            "field_name": "filename",
            "field_schema": "keyword",
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}/index"))?
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            tracing::debug!(collection = collection_name, "Filename index already exists");
            return Ok(());
        }

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Filename index created");
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn validate_collection_name(name: &str) -> Result<(), QdrantError> {
    if name.is_empty() || name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(QdrantError::InvalidName(name.to_string()));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(QdrantError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
