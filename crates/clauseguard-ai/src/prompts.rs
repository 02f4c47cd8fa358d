//! Fixed prompt templates for the four analysis stages.
//!
//! Every template demands bare JSON (no markdown fences, no commentary);
//! [`crate::llm::clean_json_payload`] handles models that ignore that.

/// Contract text is truncated to this many characters before interpolation
/// to keep requests inside the provider's context window.
pub const MAX_CONTRACT_CHARS: usize = 5_000;

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn summary_prompt(contract_type: &str, contract_text: &str) -> String {
    let contract_text = truncate_chars(contract_text, MAX_CONTRACT_CHARS);
    format!(
        r#"You are a contract analysis expert. Analyze the following {contract_type} contract and provide a structured summary.

CONTRACT TEXT:
{contract_text}

Provide the analysis in the following JSON format:
{{
    "summary": "A 2-3 paragraph executive summary of the contract",
    "contract_type": "{contract_type}",
    "parties": ["List", "of", "parties"],
    "duration": "Contract duration in plain language (e.g., '2 years')",
    "key_obligations": ["Obligation 1", "Obligation 2", "Obligation 3"],
    "financial_terms": "Summary of payment terms, amounts, and conditions",
    "jurisdiction": "The jurisdiction that governs this contract"
}}

IMPORTANT:
- Be concise but comprehensive
- Extract exact names of parties from the contract
- Include all financial figures and terms
- Return ONLY valid JSON, no additional text
- DO NOT wrap the JSON in markdown code fences
"#
    )
}

pub fn clause_extraction_prompt(contract_text: &str) -> String {
    let contract_text = truncate_chars(contract_text, MAX_CONTRACT_CHARS);
    format!(
        r#"You are a contract analysis expert. Identify and extract all distinct clauses from the following contract.

CONTRACT TEXT:
{contract_text}

Provide the analysis in the following JSON format:
{{
    "clauses": [
        {{
            "id": 1,
            "type": "Clause Name (e.g., 'Payment Terms')",
            "text": "The complete text of this clause..."
        }}
    ]
}}

IMPORTANT:
- Extract EVERY distinct clause you can identify
- Use clear, standard names for clause types (e.g., "Scope of Services", "Confidentiality", "Liability Limitation")
- Include the FULL text of each clause, not summaries
- Return ONLY valid JSON, no additional text
- DO NOT wrap the JSON in markdown code fences
"#
    )
}

pub fn risk_analysis_prompt(
    contract_type: &str,
    jurisdiction: &str,
    contract_text: &str,
    similar_context: &str,
) -> String {
    let contract_text = truncate_chars(contract_text, MAX_CONTRACT_CHARS);
    let reference = if similar_context.is_empty() {
        String::new()
    } else {
        format!("\nNEAREST STANDARD CLAUSES (for comparison):\n{similar_context}\n")
    };
    format!(
        r#"You are a contract risk analysis expert. Analyze the following {contract_type} contract for risks, issues, and missing standard clauses.

CONTRACT TEXT:
{contract_text}
{reference}
Based on standard industry practices for {contract_type} contracts in {jurisdiction}, identify:
1. Any risky, unusual, or unfavorable terms
2. Clauses that are missing but should be present
3. Gaps in protection or clarity

Provide the analysis in the following JSON format:
{{
    "risks": [
        {{
            "id": 1,
            "clause_type": "The clause or area where the risk exists",
            "risk_level": "HIGH|MEDIUM|LOW",
            "issue": "Brief title of the issue",
            "description": "Detailed explanation of why this is a risk",
            "impact": "Potential business impact of this risk"
        }}
    ],
    "missing_clauses": ["Clause 1", "Clause 2"]
}}

IMPORTANT:
- Only flag ACTUAL risks, not minor issues
- Use proper risk levels: HIGH for critical issues, MEDIUM for important, LOW for minor concerns
- Return ONLY valid JSON, no additional text
- DO NOT wrap the JSON in markdown code fences
"#
    )
}

pub fn suggestions_prompt(
    contract_type: &str,
    jurisdiction: &str,
    missing_clauses: &[String],
) -> String {
    let missing = missing_clauses.join(", ");
    format!(
        r#"You are a contract improvement expert. Based on a {contract_type} contract governed by {jurisdiction} law, provide specific improvement suggestions.

The following standard clauses are missing from the contract: {missing}

Provide the analysis in the following JSON format:
{{
    "suggestions": [
        {{
            "id": 1,
            "priority": "HIGH|MEDIUM|LOW",
            "category": "Missing Clause | Wording | Protection",
            "current_state": "What's currently in the contract",
            "suggested_text": "Proposed text or change",
            "business_impact": "Why this suggestion matters"
        }}
    ]
}}

IMPORTANT:
- Prioritize suggestions that address the missing clauses listed above
- Keep suggested text specific and ready to adapt
- Return ONLY valid JSON, no additional text
- DO NOT wrap the JSON in markdown code fences
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "§".repeat(10);
        assert_eq!(truncate_chars(&text, 4).chars().count(), 4);
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn summary_prompt_truncates_contract_text() {
        let long_text = "x".repeat(20_000);
        let prompt = summary_prompt("NDA", &long_text);
        assert!(prompt.len() < 7_000);
        assert!(prompt.contains("NDA"));
    }

    #[test]
    fn risk_prompt_omits_reference_section_when_empty() {
        let with = risk_analysis_prompt("NDA", "INDIA", "text", "Payment Terms: ...");
        let without = risk_analysis_prompt("NDA", "INDIA", "text", "");
        assert!(with.contains("NEAREST STANDARD CLAUSES"));
        assert!(!without.contains("NEAREST STANDARD CLAUSES"));
    }

    #[test]
    fn suggestions_prompt_lists_missing_clauses() {
        let prompt = suggestions_prompt(
            "SERVICE_AGREEMENT",
            "INDIA",
            &["Confidentiality".to_string(), "Payment Terms".to_string()],
        );
        assert!(prompt.contains("Confidentiality, Payment Terms"));
    }
}
