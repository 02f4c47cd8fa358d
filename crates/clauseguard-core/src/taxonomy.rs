//! Standard-clause reference taxonomy and missing-clause detection.
//!
//! The reference data is a JSON document embedded at compile time, keyed by
//! `"{CONTRACT_TYPE}_{JURISDICTION}"`. It is loaded and validated at most
//! once per process and read-only thereafter; every query operation is a
//! total function over valid inputs. Unknown contract types, jurisdictions,
//! clause names, and ids degrade to empty results, never errors.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::{debug, info};

use crate::clause::{ClauseDefinition, ContractTypeProfile, GapReport, Priority};
use crate::error::TaxonomyError;

const STANDARD_CLAUSES_JSON: &str = include_str!("../data/standard_clauses.json");

/// Composite profile key, `"{CONTRACT_TYPE}_{JURISDICTION}"`.
///
/// Contract-type names may themselves contain underscores, so the packed key
/// is never split back apart — every operation takes the explicit pair.
pub fn profile_key(contract_type: &str, jurisdiction: &str) -> String {
    format!("{contract_type}_{jurisdiction}")
}

/// The loaded standard-clause reference set.
///
/// Immutable after construction; share via [`ClauseTaxonomy::global`] from
/// any number of threads without locking.
pub struct ClauseTaxonomy {
    profiles: Vec<ContractTypeProfile>,
    by_key: HashMap<String, usize>,
}

/// Profile shape as stored in the reference document (the key lives one
/// level up, as the document map key).
#[derive(Deserialize)]
struct RawProfile {
    contract_type: String,
    jurisdiction: String,
    critical_clauses: Vec<ClauseDefinition>,
    important_clauses: Vec<ClauseDefinition>,
    optional_clauses: Vec<ClauseDefinition>,
}

impl ClauseTaxonomy {
    /// The process-wide taxonomy, loaded from the embedded reference data on
    /// first access. Concurrent first callers observe a single load; the
    /// load error, if any, is surfaced to every caller.
    pub fn global() -> Result<&'static ClauseTaxonomy, TaxonomyError> {
        static GLOBAL: OnceLock<Result<ClauseTaxonomy, TaxonomyError>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| ClauseTaxonomy::from_json(STANDARD_CLAUSES_JSON))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Parse and validate a reference document.
    ///
    /// Fails with [`TaxonomyError::Configuration`] on unparsable JSON, a
    /// profile missing one of the three tier arrays, a clause whose declared
    /// priority disagrees with its tier, or duplicate clause ids/names
    /// within one profile.
    pub fn from_json(raw: &str) -> Result<Self, TaxonomyError> {
        // serde_json is built with preserve_order, so iterating the map
        // yields profiles in document declaration order.
        let doc: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
            .map_err(|e| TaxonomyError::Configuration(format!("unparsable document: {e}")))?;

        let mut profiles = Vec::with_capacity(doc.len());
        let mut by_key = HashMap::with_capacity(doc.len());

        for (key, value) in doc {
            let raw: RawProfile = serde_json::from_value(value)
                .map_err(|e| TaxonomyError::Configuration(format!("profile {key:?}: {e}")))?;
            let profile = ContractTypeProfile {
                key: key.clone(),
                contract_type: raw.contract_type,
                jurisdiction: raw.jurisdiction,
                critical_clauses: raw.critical_clauses,
                important_clauses: raw.important_clauses,
                optional_clauses: raw.optional_clauses,
            };
            let expected_key = profile_key(&profile.contract_type, &profile.jurisdiction);
            if profile.key != expected_key {
                return Err(TaxonomyError::Configuration(format!(
                    "profile key {:?} does not match its contract_type/jurisdiction ({:?})",
                    profile.key, expected_key
                )));
            }
            validate_profile(&profile)?;
            debug!(key = %profile.key, clauses = profile.clause_count(), "loaded profile");
            by_key.insert(key, profiles.len());
            profiles.push(profile);
        }

        info!(profiles = profiles.len(), "standard-clause taxonomy loaded");
        Ok(Self { profiles, by_key })
    }

    /// All profile keys, in load order. Empty data yields an empty iterator.
    pub fn contract_type_keys(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.key.as_str())
    }

    /// Number of loaded profiles.
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// All loaded profiles, in load order.
    pub fn profiles(&self) -> impl Iterator<Item = &ContractTypeProfile> {
        self.profiles.iter()
    }

    /// Look up the profile for an exact (contract_type, jurisdiction) pair.
    pub fn profile(
        &self,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Option<&ContractTypeProfile> {
        self.by_key
            .get(&profile_key(contract_type, jurisdiction))
            .map(|&i| &self.profiles[i])
    }

    /// One priority tier of a profile, or an empty slice when the profile
    /// is absent.
    pub fn clauses_by_priority(
        &self,
        contract_type: &str,
        jurisdiction: &str,
        priority: Priority,
    ) -> &[ClauseDefinition] {
        self.profile(contract_type, jurisdiction)
            .map(|p| p.tier(priority))
            .unwrap_or(&[])
    }

    /// Every clause of a profile, critical ++ important ++ optional.
    pub fn all_clauses(
        &self,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Vec<&ClauseDefinition> {
        self.profile(contract_type, jurisdiction)
            .map(|p| p.all_clauses().collect())
            .unwrap_or_default()
    }

    /// Exact (case-sensitive) clause-name lookup, searching tiers in
    /// critical → important → optional order; first match wins.
    pub fn find_clause_by_name(
        &self,
        clause_type: &str,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Option<&ClauseDefinition> {
        self.profile(contract_type, jurisdiction)?
            .all_clauses()
            .find(|c| c.clause_type == clause_type)
    }

    /// Exact clause-id lookup, same tier order as name lookup.
    pub fn find_clause_by_id(
        &self,
        clause_id: &str,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Option<&ClauseDefinition> {
        self.profile(contract_type, jurisdiction)?
            .all_clauses()
            .find(|c| c.id == clause_id)
    }

    /// Whether a clause name is standard for the scope. Never errors: an
    /// absent profile and an absent clause both yield `false`.
    pub fn is_standard_clause(
        &self,
        clause_type: &str,
        contract_type: &str,
        jurisdiction: &str,
    ) -> bool {
        self.find_clause_by_name(clause_type, contract_type, jurisdiction)
            .is_some()
    }

    /// The priority tier of a named clause, if it exists in the scope.
    pub fn priority_of(
        &self,
        clause_type: &str,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Option<Priority> {
        self.find_clause_by_name(clause_type, contract_type, jurisdiction)
            .map(|c| c.priority)
    }

    /// Compare a set of found clause names against the reference set.
    ///
    /// Matching is exact-after-casefold: "payment terms" satisfies
    /// "Payment Terms", but "Payment" does not. Callers wanting looser
    /// substring heuristics must apply them before calling in, at their own
    /// call site. An absent profile yields an all-empty report.
    pub fn find_missing_clauses<S: AsRef<str>>(
        &self,
        found_clause_names: &[S],
        contract_type: &str,
        jurisdiction: &str,
    ) -> GapReport {
        let Some(profile) = self.profile(contract_type, jurisdiction) else {
            debug!(
                contract_type,
                jurisdiction, "unknown scope; empty gap report"
            );
            return GapReport::default();
        };

        let found: HashSet<String> = found_clause_names
            .iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();

        let missing_in = |tier: &[ClauseDefinition]| {
            tier.iter()
                .filter(|c| !found.contains(&c.clause_type.to_lowercase()))
                .map(|c| c.clause_type.clone())
                .collect::<Vec<_>>()
        };

        GapReport {
            missing_critical: missing_in(&profile.critical_clauses),
            missing_important: missing_in(&profile.important_clauses),
            missing_optional: missing_in(&profile.optional_clauses),
        }
    }
}

/// Load-time invariants: clause ids and names are each unique across the
/// profile's three tiers, and every clause's declared priority matches the
/// tier it sits in.
fn validate_profile(profile: &ContractTypeProfile) -> Result<(), TaxonomyError> {
    let mut seen_ids = HashSet::new();
    let mut seen_types = HashSet::new();

    for priority in Priority::ALL {
        for clause in profile.tier(priority) {
            if clause.priority != priority {
                return Err(TaxonomyError::Configuration(format!(
                    "profile {:?}: clause {:?} declares priority {} but sits in the {} tier",
                    profile.key, clause.id, clause.priority, priority
                )));
            }
            if !seen_ids.insert(clause.id.as_str()) {
                return Err(TaxonomyError::Configuration(format!(
                    "profile {:?}: duplicate clause id {:?}",
                    profile.key, clause.id
                )));
            }
            if !seen_types.insert(clause.clause_type.as_str()) {
                return Err(TaxonomyError::Configuration(format!(
                    "profile {:?}: duplicate clause name {:?}",
                    profile.key, clause.clause_type
                )));
            }
        }
    }
    Ok(())
}
