pub mod analyzer;
pub mod extract;
pub mod llm;
pub mod prompts;

#[cfg(feature = "onnx")]
pub mod embedder;

pub use analyzer::{ContractAnalyzer, detect_gaps};
pub use extract::{ExtractError, extract_text, is_valid_pdf};
pub use llm::{LlmClient, LlmConfig, LlmError};

#[cfg(feature = "onnx")]
pub use embedder::ClauseEmbedder;

#[cfg(feature = "vectors")]
pub use analyzer::VectorSearch;
