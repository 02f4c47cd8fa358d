//! The analysis pipeline: extract → summarise → extract clauses →
//! (similarity context) → risks → gap detection → suggestions.
//!
//! Each LLM stage degrades to a safe empty fallback on failure and marks
//! the run `Partial`; only text extraction is a hard error. The pipeline
//! never retries a provider call.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};

use clauseguard_core::analysis::{
    AnalysisStatus, ClausesOutput, CompleteAnalysis, RisksOutput, SuggestionsOutput, SummaryOutput,
};
use clauseguard_core::{ClauseTaxonomy, ContractTypeProfile, GapReport};

use crate::extract;
use crate::llm::LlmClient;
use crate::prompts;

/// How many missing clause names are fed into the suggestions prompt.
const MAX_MISSING_FOR_SUGGESTIONS: usize = 5;

/// How many characters of similarity context the risk prompt receives.
#[cfg(feature = "vectors")]
const MAX_SIMILAR_CONTEXT_CHARS: usize = 2_000;

/// Vector-search enrichment: a clause store plus the embedder that produces
/// its query vectors.
#[cfg(feature = "vectors")]
pub struct VectorSearch {
    pub store: clauseguard_store::ClauseVectorStore,
    pub embedder: crate::embedder::ClauseEmbedder,
}

/// Orchestrates one contract analysis end to end.
pub struct ContractAnalyzer {
    llm: LlmClient,
    taxonomy: &'static ClauseTaxonomy,
    #[cfg(feature = "vectors")]
    vectors: Option<VectorSearch>,
}

impl ContractAnalyzer {
    pub fn new(llm: LlmClient, taxonomy: &'static ClauseTaxonomy) -> Self {
        Self {
            llm,
            taxonomy,
            #[cfg(feature = "vectors")]
            vectors: None,
        }
    }

    /// Enable nearest-standard-clause context in the risk stage.
    #[cfg(feature = "vectors")]
    pub fn with_vector_search(mut self, vectors: VectorSearch) -> Self {
        self.vectors = Some(vectors);
        self
    }

    /// Extract text from a PDF and analyse it.
    pub async fn analyze_pdf(
        &mut self,
        path: &Path,
        contract_type: &str,
        jurisdiction: &str,
    ) -> anyhow::Result<CompleteAnalysis> {
        let text = extract::extract_text(path)
            .with_context(|| format!("extracting text from {}", path.display()))?;
        Ok(self.analyze_text(&text, contract_type, jurisdiction).await)
    }

    /// Analyse already-extracted contract text. Infallible: LLM failures
    /// degrade the result rather than aborting it.
    pub async fn analyze_text(
        &mut self,
        contract_text: &str,
        contract_type: &str,
        jurisdiction: &str,
    ) -> CompleteAnalysis {
        let start = Instant::now();
        let mut degraded = false;
        info!(contract_type, jurisdiction, chars = contract_text.len(), "starting analysis");

        let summary = match self
            .llm
            .complete_json::<SummaryOutput>(&prompts::summary_prompt(contract_type, contract_text))
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "summary stage failed; using fallback");
                degraded = true;
                SummaryOutput::unavailable(contract_type)
            }
        };

        let clauses = match self
            .llm
            .complete_json::<ClausesOutput>(&prompts::clause_extraction_prompt(contract_text))
            .await
        {
            Ok(clauses) => clauses.normalized(),
            Err(e) => {
                warn!(error = %e, "clause extraction failed; continuing without clauses");
                degraded = true;
                ClausesOutput::default()
            }
        };
        info!(clauses = clauses.total_clauses, "clauses extracted");

        let found_names: Vec<String> = clauses
            .clauses
            .iter()
            .map(|c| c.clause_type.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let similar_context = self.similar_context(&clauses, contract_type, jurisdiction).await;

        let risks = match self
            .llm
            .complete_json::<RisksOutput>(&prompts::risk_analysis_prompt(
                contract_type,
                jurisdiction,
                contract_text,
                &similar_context,
            ))
            .await
        {
            Ok(risks) => risks.normalized(),
            Err(e) => {
                warn!(error = %e, "risk stage failed; continuing without risks");
                degraded = true;
                RisksOutput::default()
            }
        };

        let gap_report = detect_gaps(self.taxonomy, &found_names, contract_type, jurisdiction);
        info!(missing = gap_report.total_missing(), "gap detection complete");

        let missing_for_prompt: Vec<String> = gap_report
            .all_missing()
            .take(MAX_MISSING_FOR_SUGGESTIONS)
            .map(str::to_string)
            .collect();

        let suggestions = match self
            .llm
            .complete_json::<SuggestionsOutput>(&prompts::suggestions_prompt(
                contract_type,
                jurisdiction,
                &missing_for_prompt,
            ))
            .await
        {
            Ok(suggestions) => suggestions.normalized(),
            Err(e) => {
                warn!(error = %e, "suggestions stage failed; continuing without suggestions");
                degraded = true;
                SuggestionsOutput::default()
            }
        };

        let processing_time_secs = start.elapsed().as_secs_f64();
        info!(secs = processing_time_secs, degraded, "analysis finished");

        CompleteAnalysis {
            summary,
            clauses,
            risks,
            suggestions,
            gap_report,
            processing_time_secs,
            status: if degraded {
                AnalysisStatus::Partial
            } else {
                AnalysisStatus::Success
            },
        }
    }

    #[cfg(feature = "vectors")]
    async fn similar_context(
        &mut self,
        clauses: &ClausesOutput,
        contract_type: &str,
        jurisdiction: &str,
    ) -> String {
        let Some(vectors) = self.vectors.as_mut() else {
            return String::new();
        };

        let mut context = serde_json::Map::new();
        for clause in &clauses.clauses {
            let query = match vectors.embedder.embed_clause(&clause.text) {
                Ok(v) => v,
                Err(e) => {
                    warn!(clause = %clause.clause_type, error = %e, "embedding failed; skipping");
                    continue;
                }
            };
            let nearest = vectors
                .store
                .search_similar(
                    contract_type,
                    jurisdiction,
                    &query,
                    clauseguard_store::DEFAULT_TOP_K,
                )
                .await;
            let entries: Vec<serde_json::Value> = nearest
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "type": s.clause_type,
                        "standard_text": s.standard_text,
                        "distance": s.distance,
                    })
                })
                .collect();
            context.insert(clause.clause_type.clone(), serde_json::Value::Array(entries));
        }

        let rendered = serde_json::Value::Object(context).to_string();
        prompts::truncate_chars(&rendered, MAX_SIMILAR_CONTEXT_CHARS).to_string()
    }

    #[cfg(not(feature = "vectors"))]
    async fn similar_context(
        &mut self,
        _clauses: &ClausesOutput,
        _contract_type: &str,
        _jurisdiction: &str,
    ) -> String {
        String::new()
    }
}

/// Gap detection over LLM-extracted clause names.
///
/// The taxonomy matches exactly (after casefold). LLM output is noisier than
/// that — it may report "Payment" where the standard name is "Payment
/// Terms" — so this call site first widens the found set: a standard clause
/// counts as found when it and an extracted name contain one another,
/// case-insensitively. The loose heuristic lives here, not in the taxonomy.
pub fn detect_gaps(
    taxonomy: &ClauseTaxonomy,
    found_names: &[String],
    contract_type: &str,
    jurisdiction: &str,
) -> GapReport {
    let widened = widen_found_names(
        found_names,
        taxonomy.profile(contract_type, jurisdiction),
    );
    taxonomy.find_missing_clauses(&widened, contract_type, jurisdiction)
}

fn widen_found_names(found: &[String], profile: Option<&ContractTypeProfile>) -> Vec<String> {
    let mut widened: Vec<String> = found.to_vec();
    let Some(profile) = profile else {
        return widened;
    };

    let found_lower: Vec<String> = found
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();
    for clause in profile.all_clauses() {
        let standard = clause.clause_type.to_lowercase();
        if found_lower
            .iter()
            .any(|f| f.contains(&standard) || standard.contains(f))
        {
            widened.push(clause.clause_type.clone());
        }
    }
    widened
}
