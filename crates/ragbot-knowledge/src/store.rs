//! LanceDB-backed document store.

use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::{DocumentStore, EmbeddingProvider};
use ragbot_core::types::{Document, SearchResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Schema metadata key naming the embedder a collection was built with.
const EMBEDDER_KEY: &str = "ragbot.embedder";

/// One LanceDB table per collection: `id`, `text` and a fixed-width `vector`.
///
/// A collection remembers the embedder it was built with; reopening it with
/// a different embedder is refused, since stored vectors would be meaningless.
pub struct VectorStore {
    table: Table,
    schema: SchemaRef,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorStore {
    /// Open (or create) the database directory and the named collection.
    pub async fn open(
        path: &Path,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(path).await?;
        let uri = path.to_str().ok_or_else(|| {
            RagbotError::Config(format!("store path {} is not valid UTF-8", path.display()))
        })?;

        let conn = lancedb::connect(uri)
            .execute()
            .await
            .map_err(RagbotError::store)?;
        let tables = conn
            .table_names()
            .execute()
            .await
            .map_err(RagbotError::store)?;

        let table = if tables.iter().any(|t| t == collection) {
            conn.open_table(collection)
                .execute()
                .await
                .map_err(RagbotError::store)?
        } else {
            tracing::info!("🗄️  Creating collection '{collection}' in {uri}");
            conn.create_empty_table(collection, collection_schema(embedder.as_ref()))
                .execute()
                .await
                .map_err(RagbotError::store)?
        };

        let schema = table.schema().await.map_err(RagbotError::store)?;
        check_embedder(collection, &schema, embedder.as_ref())?;

        Ok(Self {
            table,
            schema,
            collection: collection.to_string(),
            embedder,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn record_batch(&self, documents: &[Document], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
        if vectors.len() != documents.len() {
            return Err(RagbotError::Embedding(format!(
                "{} returned {} vectors for {} documents",
                self.embedder.name(),
                vectors.len(),
                documents.len()
            )));
        }
        let dims = self.embedder.dimensions();
        if let Some(v) = vectors.iter().find(|v| v.len() != dims) {
            return Err(RagbotError::Embedding(format!(
                "{} returned a {}-dim vector, expected {dims}",
                self.embedder.name(),
                v.len()
            )));
        }

        let ids = StringArray::from_iter_values(documents.iter().map(|d| d.id.as_str()));
        let texts = StringArray::from_iter_values(documents.iter().map(|d| d.text.as_str()));
        let values = Float32Array::from_iter_values(vectors.iter().flatten().copied());
        let vector = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dims as i32,
            Arc::new(values),
            None,
        )
        .map_err(RagbotError::store)?;

        RecordBatch::try_new(
            self.schema.clone(),
            vec![
                Arc::new(ids) as ArrayRef,
                Arc::new(texts) as ArrayRef,
                Arc::new(vector) as ArrayRef,
            ],
        )
        .map_err(RagbotError::store)
    }
}

fn collection_schema(embedder: &dyn EmbeddingProvider) -> SchemaRef {
    let metadata = HashMap::from([(EMBEDDER_KEY.to_string(), embedder.name().to_string())]);
    Arc::new(Schema::new_with_metadata(
        vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedder.dimensions() as i32,
                ),
                false,
            ),
        ],
        metadata,
    ))
}

fn check_embedder(collection: &str, schema: &Schema, embedder: &dyn EmbeddingProvider) -> Result<()> {
    let built_with = schema
        .metadata()
        .get(EMBEDDER_KEY)
        .map(String::as_str)
        .unwrap_or("unknown");
    let dims = match schema.field_with_name("vector").map(|f| f.data_type()) {
        Ok(DataType::FixedSizeList(_, n)) => *n as usize,
        _ => {
            return Err(RagbotError::Store(format!(
                "collection '{collection}' has no vector column"
            )));
        }
    };

    if built_with != embedder.name() || dims != embedder.dimensions() {
        return Err(RagbotError::Store(format!(
            "collection '{collection}' was built with embedder {built_with} ({dims} dims), \
             configured embedder is {} ({} dims)",
            embedder.name(),
            embedder.dimensions()
        )));
    }
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RagbotError::Store(format!("search result missing '{name}' column")))
}

fn read_results(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    Ok((0..batch.num_rows())
        .map(|i| SearchResult {
            document: Document::new(ids.value(i), texts.value(i)),
            // cosine distance is 1 - similarity
            score: 1.0 - distances.map_or(0.0, |d| d.value(i)),
        })
        .collect())
}

#[async_trait]
impl DocumentStore for VectorStore {
    fn name(&self) -> &str {
        "lancedb"
    }

    async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(RagbotError::store)
    }

    /// Embeds every document, then appends them as a single commit.
    async fn add(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let batch = self.record_batch(documents, &vectors)?;

        let reader = RecordBatchIterator::new(vec![Ok(batch)], self.schema.clone());
        self.table
            .add(Box::new(reader))
            .execute()
            .await
            .map_err(RagbotError::store)?;

        tracing::debug!(
            "Added {} document(s) to '{}'",
            documents.len(),
            self.collection
        );
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(text).await?;
        let batches: Vec<RecordBatch> = self
            .table
            .vector_search(vector)
            .map_err(RagbotError::store)?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(RagbotError::store)?
            .try_collect()
            .await
            .map_err(RagbotError::store)?;

        let mut results = Vec::new();
        for batch in &batches {
            results.extend(read_results(batch)?);
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }
}
