//! Terminal rendering for profiles, gap reports, and analysis results.
//!
//! Vertical cards with sectioned output, sized for a reviewer skimming one
//! contract at a time.

use clauseguard_core::analysis::{CompleteAnalysis, RiskLevel, SuggestionPriority};
use clauseguard_core::{ClauseDefinition, ContractTypeProfile, GapReport, Priority};

const MAX_TEXT_WIDTH: usize = 96;

/// Print the supported contract-type keys, one per line.
pub fn print_contract_types<'a>(keys: impl Iterator<Item = &'a str>) {
    let mut count = 0;
    for key in keys {
        println!("{key}");
        count += 1;
    }
    if count == 0 {
        println!("(no contract types loaded)");
    }
}

/// Print a profile card: one section per priority tier, or a single tier
/// when `only` is set.
pub fn print_profile(profile: &ContractTypeProfile, only: Option<Priority>) {
    println!("=== {} ===", profile.key);
    println!(
        "{} / {} — {} standard clauses",
        profile.contract_type,
        profile.jurisdiction,
        profile.clause_count()
    );
    println!();

    for priority in Priority::ALL {
        if only.is_some_and(|p| p != priority) {
            continue;
        }
        print_tier(priority, profile.tier(priority));
    }
}

fn print_tier(priority: Priority, clauses: &[ClauseDefinition]) {
    if clauses.is_empty() {
        return;
    }
    println!("{} ({}):", priority, clauses.len());
    for clause in clauses {
        println!("  {:<40} [{}]", clause.clause_type, clause.id);
        println!("      {}", shorten(&clause.description));
    }
    println!();
}

/// Print a gap report grouped by tier.
pub fn print_gap_report(report: &GapReport) {
    if report.is_empty() {
        println!("No missing standard clauses.");
        return;
    }

    println!("Missing standard clauses ({} total):", report.total_missing());
    for priority in Priority::ALL {
        let missing = report.tier(priority);
        if missing.is_empty() {
            continue;
        }
        println!("  {}:", priority);
        for name in missing {
            println!("    - {name}");
        }
    }
}

/// Print a full analysis card.
pub fn print_analysis(analysis: &CompleteAnalysis) {
    println!("=== Contract Analysis ({}) ===", analysis.status.as_str());
    println!();

    let summary = &analysis.summary;
    println!("Summary");
    println!("  {:<18} {}", "contract_type", summary.contract_type);
    if !summary.parties.is_empty() {
        println!("  {:<18} {}", "parties", summary.parties.join(", "));
    }
    if !summary.duration.is_empty() {
        println!("  {:<18} {}", "duration", summary.duration);
    }
    if !summary.jurisdiction.is_empty() {
        println!("  {:<18} {}", "jurisdiction", summary.jurisdiction);
    }
    if !summary.financial_terms.is_empty() {
        println!("  {:<18} {}", "financial_terms", shorten(&summary.financial_terms));
    }
    println!();
    for line in summary.summary.lines().filter(|l| !l.trim().is_empty()) {
        println!("  {}", line.trim());
    }
    println!();

    println!("Clauses found ({}):", analysis.clauses.total_clauses);
    for clause in &analysis.clauses.clauses {
        println!("  - {}", clause.clause_type);
    }
    println!();

    println!("Risks ({}):", analysis.risks.total_risks);
    for risk in &analysis.risks.risks {
        println!(
            "  [{}] {:<30} {}",
            risk_level_str(risk.risk_level),
            risk.clause_type,
            risk.issue
        );
        println!("      {}", shorten(&risk.description));
    }
    println!();

    print_gap_report(&analysis.gap_report);
    println!();

    println!("Suggestions ({}):", analysis.suggestions.total_suggestions);
    for suggestion in &analysis.suggestions.suggestions {
        println!(
            "  [{}] {}",
            suggestion_priority_str(suggestion.priority),
            suggestion.category
        );
        println!("      {}", shorten(&suggestion.suggested_text));
    }
    println!();

    println!("Completed in {:.2}s", analysis.processing_time_secs);
}

fn risk_level_str(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "LOW",
        RiskLevel::Medium => "MED",
        RiskLevel::High => "HIGH",
    }
}

fn suggestion_priority_str(priority: SuggestionPriority) -> &'static str {
    match priority {
        SuggestionPriority::High => "HIGH",
        SuggestionPriority::Medium => "MED",
        SuggestionPriority::Low => "LOW",
    }
}

fn shorten(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() > MAX_TEXT_WIDTH {
        let cut: String = flattened.chars().take(MAX_TEXT_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        flattened
    }
}
