//! LanceDB vector store for standard-clause similarity search.
//!
//! One table per (contract_type, jurisdiction) profile, holding every
//! standard clause with its embedding. Queries return the nearest stored
//! clauses by cosine distance; a failed search degrades to an empty result
//! so risk enrichment never blocks the analysis pipeline.

use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListBuilder, Float32Array, Float32Builder, RecordBatchIterator, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::{info, warn};

use clauseguard_core::{ContractTypeProfile, profile_key};

use crate::StoreError;

/// Default number of similar clauses returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// A standard clause returned by similarity search. Lower distance = closer.
#[derive(Debug, Clone)]
pub struct SimilarClause {
    pub clause_type: String,
    pub standard_text: String,
    pub recommendations: String,
    pub distance: f32,
}

/// LanceDB-backed store of embedded standard clauses.
pub struct ClauseVectorStore {
    db: lancedb::Connection,
}

impl ClauseVectorStore {
    /// Connect to (or create) a LanceDB database at the given path.
    pub async fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let uri = path
            .to_str()
            .ok_or_else(|| StoreError::Other("non-UTF8 database path".into()))?;
        let db = lancedb::connect(uri).execute().await?;
        Ok(Self { db })
    }

    /// Index every standard clause of a profile with its embedding.
    ///
    /// `embeddings` must be one vector per clause in flat (critical ++
    /// important ++ optional) order. The profile's table is dropped and
    /// recreated, so re-indexing replaces rather than appends.
    pub async fn index_profile(
        &self,
        profile: &ContractTypeProfile,
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        let clauses: Vec<_> = profile.all_clauses().collect();
        if clauses.len() != embeddings.len() {
            return Err(StoreError::Other(format!(
                "profile {:?}: {} clauses but {} embeddings",
                profile.key,
                clauses.len(),
                embeddings.len()
            )));
        }
        if clauses.is_empty() {
            return Err(StoreError::Other(format!(
                "profile {:?} has no clauses to index",
                profile.key
            )));
        }

        let dim = embeddings[0].len() as i32;
        let schema = clause_table_schema(dim);
        let batch = build_clause_batch(&schema, profile, &clauses, embeddings)?;

        let table_name = table_name(&profile.contract_type, &profile.jurisdiction);
        let existing = self.db.table_names().execute().await?;
        if existing.contains(&table_name) {
            self.db.drop_table(&table_name, &[]).await?;
        }

        let reader = RecordBatchIterator::new([Ok(batch)], schema);
        self.db
            .create_table(&table_name, Box::new(reader))
            .execute()
            .await?;

        info!(
            table = %table_name,
            clauses = clauses.len(),
            dim,
            "indexed standard clauses"
        );
        Ok(())
    }

    /// Nearest standard clauses to a query vector, by cosine distance.
    ///
    /// Degrades to an empty result on any failure (missing table, dimension
    /// mismatch, backend error) — similarity context is an enrichment, not a
    /// dependency.
    pub async fn search_similar(
        &self,
        contract_type: &str,
        jurisdiction: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Vec<SimilarClause> {
        match self
            .try_search(contract_type, jurisdiction, query_vector, top_k)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(
                    contract_type,
                    jurisdiction,
                    error = %e,
                    "similar-clause search failed; returning empty"
                );
                Vec::new()
            }
        }
    }

    /// List clause tables in the database.
    pub async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.db.table_names().execute().await?)
    }

    // ── Internal ──

    async fn try_search(
        &self,
        contract_type: &str,
        jurisdiction: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SimilarClause>, StoreError> {
        let table_name = table_name(contract_type, jurisdiction);
        let table = self.db.open_table(&table_name).execute().await?;
        let batches: Vec<RecordBatch> = table
            .vector_search(query_vector)?
            .limit(top_k)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut results = Vec::new();
        for batch in &batches {
            results.extend(batch_to_similar(batch)?);
        }
        Ok(results)
    }
}

/// Table naming mirrors the profile key, lower-cased:
/// `service_agreement_india`.
fn table_name(contract_type: &str, jurisdiction: &str) -> String {
    profile_key(contract_type, jurisdiction).to_lowercase()
}

fn clause_table_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("clause_type", DataType::Utf8, false),
        Field::new("contract_type", DataType::Utf8, false),
        Field::new("jurisdiction", DataType::Utf8, false),
        Field::new("recommendations", DataType::Utf8, false),
        Field::new("standard_text", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            false,
        ),
    ]))
}

fn build_clause_batch(
    schema: &Arc<Schema>,
    profile: &ContractTypeProfile,
    clauses: &[&clauseguard_core::ClauseDefinition],
    embeddings: &[Vec<f32>],
) -> Result<RecordBatch, StoreError> {
    let dim = embeddings[0].len() as i32;

    let ids = StringArray::from_iter_values(clauses.iter().map(|c| c.id.as_str()));
    let types = StringArray::from_iter_values(clauses.iter().map(|c| c.clause_type.as_str()));
    let contract_types =
        StringArray::from_iter_values(clauses.iter().map(|_| profile.contract_type.as_str()));
    let jurisdictions =
        StringArray::from_iter_values(clauses.iter().map(|_| profile.jurisdiction.as_str()));
    let recommendations =
        StringArray::from_iter_values(clauses.iter().map(|c| c.recommendations.as_str()));
    let standard_texts =
        StringArray::from_iter_values(clauses.iter().map(|c| c.standard_text.as_str()));

    let mut emb_builder = FixedSizeListBuilder::new(Float32Builder::new(), dim);
    for emb in embeddings {
        if emb.len() as i32 != dim {
            return Err(StoreError::Other(format!(
                "inconsistent embedding dimensions: {} vs {dim}",
                emb.len()
            )));
        }
        let values = emb_builder.values();
        for &v in emb {
            values.append_value(v);
        }
        emb_builder.append(true);
    }

    Ok(RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(ids),
            Arc::new(types),
            Arc::new(contract_types),
            Arc::new(jurisdictions),
            Arc::new(recommendations),
            Arc::new(standard_texts),
            Arc::new(emb_builder.finish()),
        ],
    )?)
}

fn batch_to_similar(batch: &RecordBatch) -> Result<Vec<SimilarClause>, StoreError> {
    let clause_type = utf8_column(batch, "clause_type")?;
    let standard_text = utf8_column(batch, "standard_text")?;
    let recommendations = utf8_column(batch, "recommendations")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>().cloned());

    let mut out = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        out.push(SimilarClause {
            clause_type: clause_type.value(row).to_string(),
            standard_text: standard_text.value(row).to_string(),
            recommendations: recommendations.value(row).to_string(),
            distance: distances
                .as_ref()
                .map(|d| d.value(row))
                .unwrap_or(f32::NAN),
        });
    }
    Ok(out)
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Other(format!("missing or non-Utf8 column {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauseguard_core::ClauseTaxonomy;
    use tempfile::TempDir;

    /// Deterministic fake embeddings: one axis-aligned unit vector per clause.
    fn fake_embeddings(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut v = vec![0.0f32; dim];
                v[i % dim] = 1.0;
                v
            })
            .collect()
    }

    fn service_agreement_profile() -> &'static ContractTypeProfile {
        ClauseTaxonomy::global()
            .unwrap()
            .profile("SERVICE_AGREEMENT", "INDIA")
            .unwrap()
    }

    #[tokio::test]
    async fn open_creates_empty_database() {
        let tmp = TempDir::new().unwrap();
        let store = ClauseVectorStore::open(&tmp.path().join("vectors")).await.unwrap();
        assert!(store.table_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_and_search_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = ClauseVectorStore::open(&tmp.path().join("vectors")).await.unwrap();
        let profile = service_agreement_profile();
        let embeddings = fake_embeddings(profile.clause_count(), 16);

        store.index_profile(profile, &embeddings).await.unwrap();
        assert!(store
            .table_names()
            .await
            .unwrap()
            .contains(&"service_agreement_india".to_string()));

        // Query with the first clause's own vector: it must come back first.
        let results = store
            .search_similar("SERVICE_AGREEMENT", "INDIA", &embeddings[0], DEFAULT_TOP_K)
            .await;
        assert_eq!(results.len(), DEFAULT_TOP_K);
        assert_eq!(
            results[0].clause_type,
            profile.critical_clauses[0].clause_type
        );
    }

    #[tokio::test]
    async fn reindex_replaces_the_table() {
        let tmp = TempDir::new().unwrap();
        let store = ClauseVectorStore::open(&tmp.path().join("vectors")).await.unwrap();
        let profile = service_agreement_profile();
        let embeddings = fake_embeddings(profile.clause_count(), 16);

        store.index_profile(profile, &embeddings).await.unwrap();
        store.index_profile(profile, &embeddings).await.unwrap();

        let names = store.table_names().await.unwrap();
        assert_eq!(
            names
                .iter()
                .filter(|n| *n == "service_agreement_india")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn search_on_missing_table_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let store = ClauseVectorStore::open(&tmp.path().join("vectors")).await.unwrap();
        let results = store
            .search_similar("NO_SUCH_TYPE", "INDIA", &[0.0; 16], DEFAULT_TOP_K)
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn mismatched_embedding_count_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = ClauseVectorStore::open(&tmp.path().join("vectors")).await.unwrap();
        let profile = service_agreement_profile();
        let embeddings = fake_embeddings(2, 16);

        let err = store.index_profile(profile, &embeddings).await.unwrap_err();
        assert!(matches!(err, StoreError::Other(_)));
    }
}
