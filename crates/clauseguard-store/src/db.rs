//! SQLite persistence for contracts and their analysis results.
//!
//! Analysis payloads (summary, clauses, risks, suggestions, gap report) are
//! serialized JSON text blobs keyed by a contract record. An analysis row
//! moves through `processing` → `completed` | `failed`.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use clauseguard_core::analysis::CompleteAnalysis;

use crate::StoreError;

const SCHEMA_SQL: &str = include_str!("../schema.sql");

pub struct Db {
    conn: Mutex<Connection>,
}

/// One uploaded contract.
#[derive(Debug, Clone)]
pub struct ContractRecord {
    pub id: i64,
    pub file_path: String,
    pub contract_type: String,
    pub jurisdiction: String,
    pub llm_model: String,
    pub uploaded_at: DateTime<Utc>,
}

/// One analysis run over a contract. The JSON columns hold the serialized
/// parts of a [`CompleteAnalysis`].
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: i64,
    pub contract_id: i64,
    pub summary: Option<String>,
    pub clauses: Option<String>,
    pub risks: Option<String>,
    pub suggestions: Option<String>,
    pub gap_report: Option<String>,
    /// Lifecycle state: `processing`, `completed`, or `failed`.
    pub status: String,
    /// Outcome of a completed run: `success` or `partial`.
    pub result_status: Option<String>,
    pub error_message: Option<String>,
    pub processing_time_secs: Option<f64>,
    pub analysed_at: Option<DateTime<Utc>>,
}

impl Db {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        info!(path = %path.display(), "opened clauseguard database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert_contract(
        &self,
        file_path: &str,
        contract_type: &str,
        jurisdiction: &str,
        llm_model: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO contracts (file_path, contract_type, jurisdiction, llm_model, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![file_path, contract_type, jurisdiction, llm_model, now_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Create an analysis row in `processing` state.
    pub fn begin_analysis(&self, contract_id: i64) -> Result<i64, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO analyses (contract_id, status) VALUES (?1, 'processing')",
            params![contract_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Store a finished analysis and mark the row `completed`.
    pub fn complete_analysis(
        &self,
        analysis_id: i64,
        analysis: &CompleteAnalysis,
    ) -> Result<(), StoreError> {
        let summary = serde_json::to_string(&analysis.summary)?;
        let clauses = serde_json::to_string(&analysis.clauses)?;
        let risks = serde_json::to_string(&analysis.risks)?;
        let suggestions = serde_json::to_string(&analysis.suggestions)?;
        let gap_report = serde_json::to_string(&analysis.gap_report)?;

        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE analyses
             SET summary = ?1, clauses = ?2, risks = ?3, suggestions = ?4, gap_report = ?5,
                 status = 'completed', result_status = ?6, error_message = NULL,
                 processing_time_secs = ?7, analysed_at = ?8
             WHERE id = ?9",
            params![
                summary,
                clauses,
                risks,
                suggestions,
                gap_report,
                analysis.status.as_str(),
                analysis.processing_time_secs,
                now_str(),
                analysis_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("analysis {analysis_id}")));
        }
        info!(analysis_id, "analysis saved");
        Ok(())
    }

    /// Mark an analysis row `failed` with the error message.
    pub fn fail_analysis(
        &self,
        analysis_id: i64,
        error_message: &str,
        processing_time_secs: f64,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE analyses
             SET status = 'failed', error_message = ?1,
                 processing_time_secs = ?2, analysed_at = ?3
             WHERE id = ?4",
            params![error_message, processing_time_secs, now_str(), analysis_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("analysis {analysis_id}")));
        }
        Ok(())
    }

    pub fn contract(&self, id: i64) -> Result<Option<ContractRecord>, StoreError> {
        let conn = self.lock();
        let record = conn
            .query_row(
                "SELECT id, file_path, contract_type, jurisdiction, llm_model, uploaded_at
                 FROM contracts WHERE id = ?1",
                params![id],
                row_to_contract,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_contracts(&self) -> Result<Vec<ContractRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, file_path, contract_type, jurisdiction, llm_model, uploaded_at
             FROM contracts ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_contract)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn analysis(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        let conn = self.lock();
        let record = conn
            .query_row(
                "SELECT id, contract_id, summary, clauses, risks, suggestions, gap_report,
                        status, result_status, error_message, processing_time_secs, analysed_at
                 FROM analyses WHERE id = ?1",
                params![id],
                row_to_analysis,
            )
            .optional()?;
        Ok(record)
    }

    pub fn analyses_for_contract(
        &self,
        contract_id: i64,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, contract_id, summary, clauses, risks, suggestions, gap_report,
                    status, result_status, error_message, processing_time_secs, analysed_at
             FROM analyses WHERE contract_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![contract_id], row_to_analysis)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Row mappers ──

fn row_to_contract(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContractRecord> {
    let uploaded_at: String = row.get(5)?;
    Ok(ContractRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        contract_type: row.get(2)?,
        jurisdiction: row.get(3)?,
        llm_model: row.get(4)?,
        uploaded_at: parse_ts(&uploaded_at),
    })
}

fn row_to_analysis(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let analysed_at: Option<String> = row.get(11)?;
    Ok(AnalysisRecord {
        id: row.get(0)?,
        contract_id: row.get(1)?,
        summary: row.get(2)?,
        clauses: row.get(3)?,
        risks: row.get(4)?,
        suggestions: row.get(5)?,
        gap_report: row.get(6)?,
        status: row.get(7)?,
        result_status: row.get(8)?,
        error_message: row.get(9)?,
        processing_time_secs: row.get(10)?,
        analysed_at: analysed_at.as_deref().map(parse_ts),
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn now_str() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauseguard_core::analysis::{
        AnalysisStatus, ClausesOutput, RisksOutput, SuggestionsOutput, SummaryOutput,
    };
    use clauseguard_core::clause::GapReport;

    fn sample_analysis() -> CompleteAnalysis {
        CompleteAnalysis {
            summary: SummaryOutput::unavailable("SERVICE_AGREEMENT"),
            clauses: ClausesOutput::default(),
            risks: RisksOutput::default(),
            suggestions: SuggestionsOutput::default(),
            gap_report: GapReport {
                missing_critical: vec!["Confidentiality".into()],
                missing_important: vec![],
                missing_optional: vec![],
            },
            processing_time_secs: 3.5,
            status: AnalysisStatus::Partial,
        }
    }

    #[test]
    fn contract_insert_and_read_back() {
        let db = Db::open_in_memory().unwrap();
        let id = db
            .insert_contract("/tmp/msa.pdf", "SERVICE_AGREEMENT", "INDIA", "test-model")
            .unwrap();

        let record = db.contract(id).unwrap().unwrap();
        assert_eq!(record.contract_type, "SERVICE_AGREEMENT");
        assert_eq!(record.jurisdiction, "INDIA");
        assert_eq!(db.list_contracts().unwrap().len(), 1);
    }

    #[test]
    fn analysis_lifecycle_processing_to_completed() {
        let db = Db::open_in_memory().unwrap();
        let contract_id = db
            .insert_contract("/tmp/msa.pdf", "SERVICE_AGREEMENT", "INDIA", "test-model")
            .unwrap();
        let analysis_id = db.begin_analysis(contract_id).unwrap();

        let pending = db.analysis(analysis_id).unwrap().unwrap();
        assert_eq!(pending.status, "processing");
        assert!(pending.summary.is_none());

        db.complete_analysis(analysis_id, &sample_analysis()).unwrap();
        let done = db.analysis(analysis_id).unwrap().unwrap();
        assert_eq!(done.status, "completed");
        assert_eq!(done.result_status.as_deref(), Some("partial"));
        assert_eq!(done.processing_time_secs, Some(3.5));
        assert!(done.analysed_at.is_some());

        // The gap report round-trips through its JSON column.
        let gap: GapReport = serde_json::from_str(done.gap_report.as_deref().unwrap()).unwrap();
        assert_eq!(gap.missing_critical, vec!["Confidentiality".to_string()]);
    }

    #[test]
    fn analysis_failure_records_the_message() {
        let db = Db::open_in_memory().unwrap();
        let contract_id = db
            .insert_contract("/tmp/bad.pdf", "NDA", "INDIA", "test-model")
            .unwrap();
        let analysis_id = db.begin_analysis(contract_id).unwrap();

        db.fail_analysis(analysis_id, "PDF appears to be empty", 0.4)
            .unwrap();
        let failed = db.analysis(analysis_id).unwrap().unwrap();
        assert_eq!(failed.status, "failed");
        assert_eq!(failed.error_message.as_deref(), Some("PDF appears to be empty"));
    }

    #[test]
    fn updating_a_missing_analysis_is_not_found() {
        let db = Db::open_in_memory().unwrap();
        let err = db.complete_analysis(42, &sample_analysis()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn analyses_for_contract_lists_in_order() {
        let db = Db::open_in_memory().unwrap();
        let contract_id = db
            .insert_contract("/tmp/msa.pdf", "SERVICE_AGREEMENT", "INDIA", "test-model")
            .unwrap();
        let first = db.begin_analysis(contract_id).unwrap();
        let second = db.begin_analysis(contract_id).unwrap();

        let rows = db.analyses_for_contract(contract_id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first);
        assert_eq!(rows[1].id, second);
    }

    #[test]
    fn open_creates_file_backed_database() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("clauseguard.db");
        let db = Db::open(&path).unwrap();
        db.insert_contract("/tmp/a.pdf", "NDA", "INDIA", "m").unwrap();
        assert!(path.exists());
    }
}
