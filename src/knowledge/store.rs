//! Persistent knowledge store (Component S, §4.S), grounded on the
//! teacher's `features/history.rs::MemoryManager` (LanceDB-backed semantic
//! memory), generalized from a single fixed table to the named, discoverable
//! collections described in §6: `./DBs/{name}_knowledge_db/`, default
//! collection `research`. Uses the engine's own [`EmbeddingClient`] (the
//! configured embedding provider) instead of the teacher's local model2vec
//! model, since this engine already has a provider-backed embedder.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::config::EngineConfig;
use crate::core::constants::{KNOWLEDGE_CONTENT_TRUNCATE_CHARS, KNOWLEDGE_MIN_CONTENT_LEN};
use crate::core::error::{EngineError, EngineResult};

use crate::embedding::client::EmbeddingClient;

const DEFAULT_COLLECTION: &str = "research";

/// A single stored source, as returned by [`KnowledgeStore::search`].
#[derive(Debug, Clone)]
pub struct KnowledgeSource {
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub research_query: String,
    pub session_id: String,
    pub stored_at: DateTime<Utc>,
    pub similarity: f32,
}

pub struct KnowledgeStore {
    config: Arc<EngineConfig>,
    embedding_client: Arc<EmbeddingClient>,
    embedding_dim: usize,
    connections: Mutex<HashMap<String, Connection>>,
    tables: Mutex<HashMap<String, Table>>,
}

impl KnowledgeStore {
    pub fn new(config: Arc<EngineConfig>, embedding_client: Arc<EmbeddingClient>) -> Self {
        KnowledgeStore {
            config,
            embedding_client,
            embedding_dim: 768,
            connections: Mutex::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
        }
    }

    fn db_path(&self, collection: &str) -> String {
        self.config
            .knowledge_db_root
            .join(format!("{collection}_knowledge_db"))
            .to_string_lossy()
            .into_owned()
    }

    fn schema(&self) -> Schema {
        let vector_len = self.embedding_dim as i32;
        Schema::new(vec![
            Field::new("source_id", DataType::Utf8, false),
            Field::new("url", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("research_query", DataType::Utf8, false),
            Field::new("session_id", DataType::Utf8, false),
            Field::new("stored_at_ms", DataType::Int64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), vector_len),
                true,
            ),
        ])
    }

    async fn table(&self, collection: &str) -> EngineResult<Table> {
        if let Some(table) = self.tables.lock().await.get(collection) {
            return Ok(table.clone());
        }

        let path = self.db_path(collection);
        let mut connections = self.connections.lock().await;
        let connection = match connections.get(collection) {
            Some(c) => c.clone(),
            None => {
                let c = lancedb::connect(&path)
                    .execute()
                    .await
                    .map_err(|e| EngineError::State(format!("failed to open knowledge db {path}: {e}")))?;
                connections.insert(collection.to_string(), c.clone());
                c
            }
        };
        drop(connections);

        let schema = Arc::new(self.schema());
        let table = match connection.open_table(collection).execute().await {
            Ok(t) => t,
            Err(lancedb::Error::TableNotFound { .. }) => {
                info!("creating knowledge collection '{collection}' at {path}");
                connection
                    .create_empty_table(collection, schema)
                    .execute()
                    .await
                    .map_err(|e| EngineError::State(format!("failed to create knowledge table: {e}")))?
            }
            Err(e) => return Err(EngineError::State(format!("failed to open knowledge table: {e}"))),
        };

        self.tables.lock().await.insert(collection.to_string(), table.clone());
        Ok(table)
    }

    /// `add(sources, research_query, session_id)` (§4.S): stores each source
    /// with content length ≥ [`KNOWLEDGE_MIN_CONTENT_LEN`], skipping any
    /// already present under the derived `source_id`.
    pub async fn add(
        &self,
        collection: &str,
        sources: &[(String, String, String)], // (url, title, content)
        research_query: &str,
        session_id: &str,
    ) -> EngineResult<usize> {
        let table = self.table(collection).await?;
        let mut stored = 0usize;

        for (url, title, content) in sources {
            if content.len() < KNOWLEDGE_MIN_CONTENT_LEN {
                continue;
            }
            let source_id = source_id_for(url, title);
            if self.exists(&table, &source_id).await? {
                debug!("knowledge store already has source_id {source_id}, skipping");
                continue;
            }

            let truncated = clean_content(content);
            let embedding = match self.embedding_client.embed(&truncated).await {
                Some(e) => e,
                None => {
                    warn!("embedding failed for knowledge source {url}, skipping store");
                    continue;
                }
            };

            let batch = self.record_batch(&source_id, url, title, &truncated, research_query, session_id, embedding.as_slice())?;
            let schema = batch.schema();
            let batches = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);
            table
                .add(batches)
                .execute()
                .await
                .map_err(|e| EngineError::State(format!("failed to store knowledge source: {e}")))?;
            stored += 1;
        }

        Ok(stored)
    }

    async fn exists(&self, table: &Table, source_id: &str) -> EngineResult<bool> {
        let stream = table
            .query()
            .only_if(format!("source_id = '{source_id}'"))
            .limit(1)
            .execute()
            .await
            .map_err(|e| EngineError::State(format!("knowledge existence check failed: {e}")))?;
        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| EngineError::State(format!("knowledge existence check failed: {e}")))?;
        Ok(batches.iter().any(|b| b.num_rows() > 0))
    }

    #[allow(clippy::too_many_arguments)]
    fn record_batch(
        &self,
        source_id: &str,
        url: &str,
        title: &str,
        content: &str,
        research_query: &str,
        session_id: &str,
        embedding: &[f32],
    ) -> EngineResult<RecordBatch> {
        let schema = Arc::new(self.schema());
        let vector_len = self.embedding_dim as i32;
        let vector = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            std::iter::once(Some(embedding.iter().map(|v| Some(*v)).collect::<Vec<_>>())),
            vector_len,
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![source_id.to_string()])),
                Arc::new(StringArray::from(vec![url.to_string()])),
                Arc::new(StringArray::from(vec![title.to_string()])),
                Arc::new(StringArray::from(vec![content.to_string()])),
                Arc::new(StringArray::from(vec![research_query.to_string()])),
                Arc::new(StringArray::from(vec![session_id.to_string()])),
                Arc::new(Int64Array::from(vec![Utc::now().timestamp_millis()])),
                Arc::new(vector),
            ],
        )
        .map_err(|e| EngineError::State(format!("failed to build knowledge record batch: {e}")))
    }

    /// `search(query, n, min_similarity) -> list<Source>` (§4.S): vector
    /// lookup with `similarity = 1/(1+distance)`.
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        max_results: usize,
        min_similarity: f32,
    ) -> EngineResult<Vec<KnowledgeSource>> {
        let table = self.table(collection).await?;
        let Some(query_embedding) = self.embedding_client.embed(query).await else {
            return Ok(Vec::new());
        };

        let stream = table
            .query()
            .nearest_to(query_embedding.as_slice())
            .map_err(|e| EngineError::State(format!("failed to build knowledge vector query: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(max_results)
            .execute()
            .await
            .map_err(|e| EngineError::State(format!("knowledge vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| EngineError::State(format!("knowledge vector search failed: {e}")))?;

        let mut out = Vec::new();
        for batch in batches {
            out.extend(Self::batch_to_sources(&batch)?);
        }
        out.retain(|s| s.similarity >= min_similarity);
        out.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(max_results);
        Ok(out)
    }

    fn batch_to_sources(batch: &RecordBatch) -> EngineResult<Vec<KnowledgeSource>> {
        let col = |name: &str| -> EngineResult<&StringArray> {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| EngineError::State(format!("knowledge batch missing column {name}")))
        };
        let source_id_col = col("source_id")?;
        let url_col = col("url")?;
        let title_col = col("title")?;
        let content_col = col("content")?;
        let query_col = col("research_query")?;
        let session_col = col("session_id")?;
        let ts_col = batch
            .column_by_name("stored_at_ms")
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .ok_or_else(|| EngineError::State("knowledge batch missing stored_at_ms".to_string()))?;
        let distance_col: Option<&Float32Array> = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        let mut out = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distance_col.map(|c| c.value(row)).unwrap_or(0.0);
            let similarity = 1.0 / (1.0 + distance.max(0.0));
            let stored_at = DateTime::<Utc>::from_timestamp_millis(ts_col.value(row)).unwrap_or_else(Utc::now);
            out.push(KnowledgeSource {
                source_id: source_id_col.value(row).to_string(),
                url: url_col.value(row).to_string(),
                title: title_col.value(row).to_string(),
                content: content_col.value(row).to_string(),
                research_query: query_col.value(row).to_string(),
                session_id: session_col.value(row).to_string(),
                stored_at,
                similarity,
            });
        }
        Ok(out)
    }

    /// `cleanup(days)` (§4.S): deletes entries older than `days`.
    pub async fn cleanup(&self, collection: &str, days: i64) -> EngineResult<()> {
        let table = self.table(collection).await?;
        let cutoff = (Utc::now() - chrono::Duration::days(days)).timestamp_millis();
        table
            .delete(&format!("stored_at_ms < {cutoff}"))
            .await
            .map_err(|e| EngineError::State(format!("knowledge cleanup failed: {e}")))
    }

    /// Lists discoverable collections under the configured `./DBs/` root
    /// (§6 "discovery lists all such directories under ./DBs/").
    pub fn list_collections(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.config.knowledge_db_root) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix("_knowledge_db").map(str::to_string)
            })
            .collect()
    }

    pub fn default_collection(&self) -> &'static str {
        DEFAULT_COLLECTION
    }
}

fn source_id_for(url: &str, title: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    if url.trim().is_empty() {
        title.hash(&mut hasher);
    } else {
        url.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

fn clean_content(content: &str) -> String {
    content.chars().take(KNOWLEDGE_CONTENT_TRUNCATE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_is_stable_for_same_url() {
        assert_eq!(source_id_for("https://x.com", "t"), source_id_for("https://x.com", "other title"));
    }

    #[test]
    fn source_id_falls_back_to_title_when_url_empty() {
        assert_ne!(source_id_for("", "title a"), source_id_for("", "title b"));
    }

    #[test]
    fn clean_content_truncates_to_limit() {
        let long = "a".repeat(KNOWLEDGE_CONTENT_TRUNCATE_CHARS + 500);
        assert_eq!(clean_content(&long).len(), KNOWLEDGE_CONTENT_TRUNCATE_CHARS);
    }
}
