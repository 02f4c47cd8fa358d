//! Domain types for the standard-clause taxonomy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TaxonomyError;

/// Severity ranking of a standard clause's necessity.
///
/// Critical = must have, important = should have, optional = nice to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    Important,
    Optional,
}

impl Priority {
    /// All tiers in gap-report order: critical first.
    pub const ALL: [Priority; 3] = [Priority::Critical, Priority::Important, Priority::Optional];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Optional => "optional",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "important" => Ok(Self::Important),
            "optional" => Ok(Self::Optional),
            other => Err(TaxonomyError::InvalidPriority(other.to_string())),
        }
    }
}

/// One standard clause entry in the reference taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseDefinition {
    /// Stable identifier, unique within its (contract_type, jurisdiction) scope.
    pub id: String,
    /// Human-readable clause name, e.g. "Payment Terms". Also unique within scope.
    #[serde(rename = "type")]
    pub clause_type: String,
    pub priority: Priority,
    /// What the clause covers.
    pub description: String,
    /// Drafting/improvement guidance.
    pub recommendations: String,
    /// Exemplar boilerplate language.
    pub standard_text: String,
}

/// The full standard-clause reference for one (contract type, jurisdiction) pair.
///
/// Tier vectors keep declaration order from the reference document; that
/// order is not semantically significant but is stable for deterministic
/// output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractTypeProfile {
    /// Composite document key, `"{CONTRACT_TYPE}_{JURISDICTION}"`.
    pub key: String,
    pub contract_type: String,
    pub jurisdiction: String,
    pub critical_clauses: Vec<ClauseDefinition>,
    pub important_clauses: Vec<ClauseDefinition>,
    pub optional_clauses: Vec<ClauseDefinition>,
}

impl ContractTypeProfile {
    /// The clause tier for one priority.
    pub fn tier(&self, priority: Priority) -> &[ClauseDefinition] {
        match priority {
            Priority::Critical => &self.critical_clauses,
            Priority::Important => &self.important_clauses,
            Priority::Optional => &self.optional_clauses,
        }
    }

    /// All clauses, critical ++ important ++ optional. Callers that
    /// enumerate "all clauses" must see critical clauses first.
    pub fn all_clauses(&self) -> impl Iterator<Item = &ClauseDefinition> {
        Priority::ALL.iter().flat_map(|p| self.tier(*p).iter())
    }

    /// Total clause count across all three tiers.
    pub fn clause_count(&self) -> usize {
        self.critical_clauses.len() + self.important_clauses.len() + self.optional_clauses.len()
    }
}

/// Result of a missing-clause query. Computed on demand, never persisted
/// by the taxonomy itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub missing_critical: Vec<String>,
    pub missing_important: Vec<String>,
    pub missing_optional: Vec<String>,
}

impl GapReport {
    /// Sum of the three missing-list lengths. Always recomputed.
    pub fn total_missing(&self) -> usize {
        self.missing_critical.len() + self.missing_important.len() + self.missing_optional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_missing() == 0
    }

    /// The missing list for one tier.
    pub fn tier(&self, priority: Priority) -> &[String] {
        match priority {
            Priority::Critical => &self.missing_critical,
            Priority::Important => &self.missing_important,
            Priority::Optional => &self.missing_optional,
        }
    }

    /// All missing clause names, critical first.
    pub fn all_missing(&self) -> impl Iterator<Item = &str> {
        Priority::ALL
            .iter()
            .flat_map(|p| self.tier(*p).iter().map(|s| s.as_str()))
    }
}
