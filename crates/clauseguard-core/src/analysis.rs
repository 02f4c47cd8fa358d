//! Wire schemas for LLM analysis output.
//!
//! Every list-bearing response carries a total that the model is asked to
//! fill in but is never trusted: call [`ClausesOutput::normalized`] (and
//! friends) after deserialising so totals are recomputed from the lists.

use serde::{Deserialize, Serialize};

use crate::clause::GapReport;

/// Severity of an identified risk. Wire form is upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Priority of an improvement suggestion. Wire form is upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

/// Overall outcome of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Every stage produced real output.
    Success,
    /// At least one LLM stage degraded to its empty fallback.
    Partial,
    /// The pipeline failed outright.
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown analysis status {other:?}")),
        }
    }
}

/// Structured contract summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
    pub contract_type: String,
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub key_obligations: Vec<String>,
    #[serde(default)]
    pub financial_terms: String,
    #[serde(default)]
    pub jurisdiction: String,
}

impl SummaryOutput {
    /// Safe fallback when summary generation fails.
    pub fn unavailable(contract_type: &str) -> Self {
        Self {
            summary: "Unable to generate summary".to_string(),
            contract_type: contract_type.to_string(),
            parties: Vec::new(),
            duration: "Unknown".to_string(),
            key_obligations: Vec::new(),
            financial_terms: "Not specified".to_string(),
            jurisdiction: "Unknown".to_string(),
        }
    }
}

/// One clause as extracted from the contract text by the LLM.
///
/// `clause_type` values are the `found_clause_names` input to gap detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseItem {
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "type")]
    pub clause_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClausesOutput {
    #[serde(default)]
    pub clauses: Vec<ClauseItem>,
    #[serde(default)]
    pub total_clauses: usize,
}

impl ClausesOutput {
    pub fn normalized(mut self) -> Self {
        self.total_clauses = self.clauses.len();
        self
    }
}

/// One identified risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
    #[serde(default)]
    pub id: u32,
    pub clause_type: String,
    pub risk_level: RiskLevel,
    pub issue: String,
    pub description: String,
    pub impact: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RisksOutput {
    #[serde(default)]
    pub risks: Vec<RiskItem>,
    #[serde(default)]
    pub missing_clauses: Vec<String>,
    #[serde(default)]
    pub total_risks: usize,
    #[serde(default)]
    pub total_missing: usize,
}

impl RisksOutput {
    pub fn normalized(mut self) -> Self {
        self.total_risks = self.risks.len();
        self.total_missing = self.missing_clauses.len();
        self
    }
}

/// One improvement suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionItem {
    #[serde(default)]
    pub id: u32,
    pub priority: SuggestionPriority,
    pub category: String,
    pub current_state: String,
    pub suggested_text: String,
    pub business_impact: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionsOutput {
    #[serde(default)]
    pub suggestions: Vec<SuggestionItem>,
    #[serde(default)]
    pub total_suggestions: usize,
}

impl SuggestionsOutput {
    pub fn normalized(mut self) -> Self {
        self.total_suggestions = self.suggestions.len();
        self
    }
}

/// Full result of one analysis run: the four LLM outputs plus the
/// deterministic gap report from the taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAnalysis {
    pub summary: SummaryOutput,
    pub clauses: ClausesOutput,
    pub risks: RisksOutput,
    pub suggestions: SuggestionsOutput,
    pub gap_report: GapReport,
    pub processing_time_secs: f64,
    pub status: AnalysisStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clause_items_use_type_on_the_wire() {
        let json = r#"{
            "clauses": [
                {"id": 1, "type": "Payment Terms", "text": "Payment within 30 days."},
                {"id": 2, "type": "Confidentiality", "text": "Kept secret."}
            ],
            "total_clauses": 99
        }"#;
        let out: ClausesOutput = serde_json::from_str(json).unwrap();
        let out = out.normalized();
        assert_eq!(out.clauses[0].clause_type, "Payment Terms");
        // The model-supplied total is never trusted.
        assert_eq!(out.total_clauses, 2);
    }

    #[test]
    fn risk_totals_are_recomputed() {
        let json = r#"{
            "risks": [{
                "id": 1,
                "clause_type": "Liability Limitation",
                "risk_level": "HIGH",
                "issue": "Uncapped liability",
                "description": "No aggregate cap.",
                "impact": "Unbounded exposure."
            }],
            "missing_clauses": ["Confidentiality", "Payment Terms"],
            "total_risks": 7,
            "total_missing": 7
        }"#;
        let out: RisksOutput = serde_json::from_str(json).unwrap().normalized();
        assert_eq!(out.total_risks, 1);
        assert_eq!(out.total_missing, 2);
        assert_eq!(out.risks[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn summary_tolerates_sparse_llm_output() {
        let json = r#"{"summary": "A services contract.", "contract_type": "SERVICE_AGREEMENT"}"#;
        let out: SummaryOutput = serde_json::from_str(json).unwrap();
        assert!(out.parties.is_empty());
        assert_eq!(out.duration, "");
    }

    #[test]
    fn suggestion_priority_wire_form_is_uppercase() {
        let json = r#"{
            "suggestions": [{
                "id": 1,
                "priority": "MEDIUM",
                "category": "Missing Clause",
                "current_state": "No dispute resolution clause.",
                "suggested_text": "Add arbitration under the 1996 Act.",
                "business_impact": "Avoids court delays."
            }]
        }"#;
        let out: SuggestionsOutput = serde_json::from_str(json).unwrap().normalized();
        assert_eq!(out.suggestions[0].priority, SuggestionPriority::Medium);
        assert_eq!(out.total_suggestions, 1);
    }

    #[test]
    fn analysis_status_wire_form_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&AnalysisStatus::Partial).unwrap(),
            r#""partial""#
        );
        assert_eq!(AnalysisStatus::Partial.as_str(), "partial");
        assert_eq!("success".parse::<AnalysisStatus>(), Ok(AnalysisStatus::Success));
        assert!("done".parse::<AnalysisStatus>().is_err());
    }

    #[test]
    fn fallback_summary_matches_degraded_contract() {
        let s = SummaryOutput::unavailable("NDA");
        assert_eq!(s.summary, "Unable to generate summary");
        assert_eq!(s.contract_type, "NDA");
        assert_eq!(s.jurisdiction, "Unknown");
    }

    #[test]
    fn complete_analysis_round_trips() {
        let analysis = CompleteAnalysis {
            summary: SummaryOutput::unavailable("NDA"),
            clauses: ClausesOutput::default(),
            risks: RisksOutput::default(),
            suggestions: SuggestionsOutput::default(),
            gap_report: GapReport::default(),
            processing_time_secs: 1.25,
            status: AnalysisStatus::Partial,
        };
        let json = serde_json::to_string(&analysis).unwrap();
        let back: CompleteAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, AnalysisStatus::Partial);
        assert_eq!(back.processing_time_secs, 1.25);
    }
}
