mod display;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use clauseguard_ai::{ClauseEmbedder, ContractAnalyzer, LlmClient, LlmConfig, VectorSearch};
use clauseguard_core::analysis::{
    AnalysisStatus, ClausesOutput, CompleteAnalysis, RisksOutput, SuggestionsOutput, SummaryOutput,
};
use clauseguard_core::{ClauseTaxonomy, GapReport, Priority};
use clauseguard_store::{ClauseVectorStore, Db};

#[derive(Parser)]
#[command(
    name = "clauseguard",
    version,
    about = "Contract analysis against a standard-clause taxonomy"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported contract-type keys
    Types,

    /// Show the standard-clause profile for a contract type and jurisdiction
    Profile {
        contract_type: String,
        jurisdiction: String,
        /// Show a single tier: critical, important, or optional
        #[arg(long)]
        priority: Option<String>,
    },

    /// Detect missing standard clauses given the clause names found in a contract
    Gaps {
        contract_type: String,
        jurisdiction: String,
        /// Clause names found in the contract
        #[arg(required = false)]
        found: Vec<String>,
    },

    /// Analyze a PDF contract end to end
    Analyze {
        pdf: PathBuf,
        #[arg(long)]
        contract_type: String,
        #[arg(long, default_value = "INDIA")]
        jurisdiction: String,
        /// Persist the contract and analysis to this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
        /// Override the completion model
        #[arg(long, env = "CLAUSEGUARD_LLM_MODEL")]
        model: Option<String>,
        /// LanceDB directory of indexed standard clauses (enables similarity context)
        #[arg(long, requires = "model_dir")]
        vector_db: Option<PathBuf>,
        /// Embedding model directory (model.onnx + tokenizer.json)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Embed every profile's standard clauses into the vector store
    Index {
        /// LanceDB directory to create or replace
        db_dir: PathBuf,
        /// Embedding model directory (model.onnx + tokenizer.json)
        #[arg(long)]
        model_dir: PathBuf,
    },

    /// Print a stored analysis
    Show {
        analysis_id: i64,
        #[arg(long)]
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::debug!("clauseguard v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();

    match cli.command {
        Command::Types => {
            let taxonomy = ClauseTaxonomy::global()?;
            display::print_contract_types(taxonomy.contract_type_keys());
        }
        Command::Profile {
            contract_type,
            jurisdiction,
            priority,
        } => {
            let taxonomy = ClauseTaxonomy::global()?;
            let only = priority.as_deref().map(str::parse::<Priority>).transpose()?;
            match taxonomy.profile(&contract_type, &jurisdiction) {
                Some(profile) => display::print_profile(profile, only),
                None => println!("No profile for {contract_type} / {jurisdiction}"),
            }
        }
        Command::Gaps {
            contract_type,
            jurisdiction,
            found,
        } => {
            let taxonomy = ClauseTaxonomy::global()?;
            let report =
                taxonomy.find_missing_clauses(&found, &contract_type, &jurisdiction);
            display::print_gap_report(&report);
        }
        Command::Analyze {
            pdf,
            contract_type,
            jurisdiction,
            db,
            model,
            vector_db,
            model_dir,
        } => {
            run_analyze(
                pdf,
                contract_type,
                jurisdiction,
                db,
                model,
                vector_db,
                model_dir,
            )
            .await?;
        }
        Command::Index { db_dir, model_dir } => {
            run_index(db_dir, model_dir).await?;
        }
        Command::Show { analysis_id, db } => {
            run_show(analysis_id, db)?;
        }
    }

    Ok(())
}

async fn run_analyze(
    pdf: PathBuf,
    contract_type: String,
    jurisdiction: String,
    db: Option<PathBuf>,
    model: Option<String>,
    vector_db: Option<PathBuf>,
    model_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let taxonomy = ClauseTaxonomy::global()?;

    let mut config = LlmConfig::from_env().context("configuring the completion provider")?;
    if let Some(model) = model {
        config = config.with_model(model);
    }
    let llm = LlmClient::new(config)?;
    let llm_model = llm.model().to_string();

    let mut analyzer = ContractAnalyzer::new(llm, taxonomy);
    if let (Some(vector_db), Some(model_dir)) = (vector_db, model_dir) {
        let store = ClauseVectorStore::open(&vector_db)
            .await
            .context("opening the clause vector store")?;
        let embedder =
            ClauseEmbedder::load(&model_dir).context("loading the embedding model")?;
        analyzer = analyzer.with_vector_search(VectorSearch { store, embedder });
    }

    let Some(db_path) = db else {
        let analysis = analyzer
            .analyze_pdf(&pdf, &contract_type, &jurisdiction)
            .await?;
        display::print_analysis(&analysis);
        return Ok(());
    };

    // Persisted run: record the contract first, then complete or fail the
    // analysis row depending on the pipeline outcome.
    let db = Db::open(&db_path)?;
    let contract_id = db.insert_contract(
        &pdf.to_string_lossy(),
        &contract_type,
        &jurisdiction,
        &llm_model,
    )?;
    let analysis_id = db.begin_analysis(contract_id)?;
    let started = Instant::now();

    match analyzer
        .analyze_pdf(&pdf, &contract_type, &jurisdiction)
        .await
    {
        Ok(analysis) => {
            db.complete_analysis(analysis_id, &analysis)?;
            display::print_analysis(&analysis);
            println!("Saved as analysis {analysis_id} (contract {contract_id})");
            Ok(())
        }
        Err(e) => {
            db.fail_analysis(
                analysis_id,
                &format!("{e:#}"),
                started.elapsed().as_secs_f64(),
            )?;
            Err(e)
        }
    }
}

async fn run_index(db_dir: PathBuf, model_dir: PathBuf) -> anyhow::Result<()> {
    let taxonomy = ClauseTaxonomy::global()?;
    let store = ClauseVectorStore::open(&db_dir)
        .await
        .context("opening the clause vector store")?;
    let mut embedder = ClauseEmbedder::load(&model_dir).context("loading the embedding model")?;

    for profile in taxonomy.profiles() {
        let texts: Vec<&str> = profile
            .all_clauses()
            .map(|c| c.standard_text.as_str())
            .collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .with_context(|| format!("embedding clauses for {}", profile.key))?;
        store.index_profile(profile, &embeddings).await?;
        println!("Indexed {:<28} ({} clauses)", profile.key, texts.len());
    }

    Ok(())
}

fn run_show(analysis_id: i64, db_path: PathBuf) -> anyhow::Result<()> {
    let db = Db::open(&db_path)?;
    let Some(record) = db.analysis(analysis_id)? else {
        anyhow::bail!("no analysis with id {analysis_id}");
    };

    match record.status.as_str() {
        "completed" => {
            let analysis = record_to_analysis(&record)
                .with_context(|| format!("decoding stored analysis {analysis_id}"))?;
            display::print_analysis(&analysis);
        }
        "failed" => {
            println!("Analysis {analysis_id} failed:");
            println!("  {}", record.error_message.as_deref().unwrap_or("(no error recorded)"));
        }
        other => println!("Analysis {analysis_id} is {other}"),
    }
    Ok(())
}

/// Rebuild a [`CompleteAnalysis`] from its stored JSON columns.
fn record_to_analysis(
    record: &clauseguard_store::AnalysisRecord,
) -> anyhow::Result<CompleteAnalysis> {
    fn column<T: serde::de::DeserializeOwned + Default>(
        value: Option<&str>,
    ) -> anyhow::Result<T> {
        match value {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(T::default()),
        }
    }

    let summary: SummaryOutput = match record.summary.as_deref() {
        Some(json) => serde_json::from_str(json)?,
        None => SummaryOutput::unavailable(""),
    };

    let status = record
        .result_status
        .as_deref()
        .and_then(|s| s.parse::<AnalysisStatus>().ok())
        .unwrap_or(AnalysisStatus::Success);

    Ok(CompleteAnalysis {
        summary,
        clauses: column::<ClausesOutput>(record.clauses.as_deref())?,
        risks: column::<RisksOutput>(record.risks.as_deref())?,
        suggestions: column::<SuggestionsOutput>(record.suggestions.as_deref())?,
        gap_report: column::<GapReport>(record.gap_report.as_deref())?,
        processing_time_secs: record.processing_time_secs.unwrap_or_default(),
        status,
    })
}
