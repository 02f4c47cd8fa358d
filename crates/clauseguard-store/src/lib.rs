pub mod error;

#[cfg(feature = "sqlite")]
pub mod db;
#[cfg(feature = "lancedb")]
pub mod vectors;

pub use error::StoreError;

#[cfg(feature = "sqlite")]
pub use db::{AnalysisRecord, ContractRecord, Db};
#[cfg(feature = "lancedb")]
pub use vectors::{ClauseVectorStore, DEFAULT_TOP_K, SimilarClause};
