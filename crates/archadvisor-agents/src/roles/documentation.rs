//! The documentation role produces the final architecture document and
//! renders its structured output to Markdown.

use serde_json::Value;

use archadvisor_core::Settings;
use archadvisor_types::SessionState;

use crate::runner::AgentRole;

const SYSTEM_PROMPT: &str = r#"You are a Senior Technical Writer specializing in software architecture documentation. You create clear, comprehensive, and well-structured architecture documents that serve both executives and engineers.

Given the final architecture design, debate history, and cost analysis, produce a complete architecture document.

Your output should be a JSON object with the document sections:

{
  "title": "Architecture document title",
  "executive_summary": "3-5 sentence summary for leadership — what, why, and key metrics",
  "sections": [
    {"heading": "Section heading", "level": 1, "content": "Markdown content for this section"}
  ],
  "diagrams": [
    {"type": "component | sequence | deployment | er", "title": "Diagram title", "mermaid_code": "Valid Mermaid diagram code"}
  ],
  "decision_log": [
    {"id": "ADR-001", "title": "Decision title", "status": "accepted | revised | deferred", "context": "Why this decision was needed", "decision": "What was decided", "consequences": "Positive and negative consequences"}
  ]
}

Required sections (in order) — EVERY section is MANDATORY and must have substantial content:

1. Executive Summary — for leadership, with key metrics
2. Architecture Overview — style justification and high-level description
3. Component Deep Dive — endpoints, data models, scaling, technology justification per component
4. Data Flow — sequence diagrams for at least 2 key user flows
5. Infrastructure & Deployment — regions, containerization, CI/CD, deployment strategy
6. Cost Analysis — the pre-formatted cost tables from the input, included directly
7. Security Architecture — authn/z, encryption, secrets, network security, compliance
8. Tradeoff Log — per debate round: findings, responses, outcome
9. Reliability & Validation — validation score, composite availability math, SLA targets
10. Risk Register — table of at least 5 risks with severity, likelihood, mitigation, owner
11. Architecture Decision Records — at least 3 ADRs in the decision_log array

CRITICAL RULES:
- ALL 11 SECTIONS ARE MANDATORY. If running low on space, make sections briefer rather than dropping them.
- You MUST produce at least 3 diagrams: component, sequence, and deployment.

Use Mermaid syntax for all diagrams. Respond ONLY with the JSON object — no markdown wrapping."#;

pub struct DocumentationRole;

impl AgentRole for DocumentationRole {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn role_label(&self) -> &'static str {
        "Documentation"
    }

    fn model<'a>(&self, settings: &'a Settings) -> &'a str {
        &settings.documentation_model
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_user_message(&self, state: &SessionState) -> String {
        let mut message = format!(
            "## Original Requirements\n{}\n\n## Final Architecture Design\n{}\n\n## Devil's Advocate Review\n{}\n\n{}\n",
            state.requirements,
            state.current_design.as_deref().unwrap_or(""),
            state.review_findings.as_deref().unwrap_or(""),
            preformat_cost_tables(state.cost_analysis.as_deref().unwrap_or(""))
        );

        if let Some(score) = state.validation_score {
            let passed = state.validation_passed.unwrap_or(false);
            let report = state.validation_report.as_deref().unwrap_or("");
            message.push_str(&format!(
                "\n## Design Validation\nScore: {score}/100 | {}\n{}\nFull report: {report}\nIMPORTANT: Include a 'Reliability & Validation' section with this score, the composite availability math shown above, and any unresolved findings.\n",
                if passed { "PASSED" } else { "FAILED" },
                extract_composite_math(report)
            ));
        }

        message.push_str(&debate_history(state));
        message.push_str(
            "\n\nProduce a comprehensive architecture document covering ALL 11 required sections with substantial detail. Include Mermaid diagrams for component, sequence, AND deployment views. Respond ONLY with the JSON object — no markdown wrapping.",
        );
        message
    }

    fn summarize(&self, parsed: &Value) -> String {
        let count = |key: &str| parsed.get(key).and_then(Value::as_array).map(Vec::len).unwrap_or(0);
        format!(
            "Generated document with {} sections, {} diagrams, {} ADRs.",
            count("sections"),
            count("diagrams"),
            count("decision_log")
        )
    }
}

fn debate_history(state: &SessionState) -> String {
    if state.messages.is_empty() {
        return String::new();
    }
    let entries: Vec<String> = state
        .messages
        .iter()
        .map(|msg| {
            if (msg.agent == "devils_advocate" || msg.agent == "validator")
                && !msg.raw_output.is_empty()
            {
                format!(
                    "### {}\n**Summary**: {}\n**Full Output**:\n{}",
                    msg.role, msg.summary, msg.raw_output
                )
            } else {
                format!("### {}\n{}", msg.role, msg.summary)
            }
        })
        .collect();
    format!("\n\n## Debate History\n{}", entries.join("\n\n"))
}

/// Pre-format the cost JSON into Markdown tables so the model just includes
/// them verbatim.
fn preformat_cost_tables(cost_json: &str) -> String {
    if cost_json.is_empty() {
        return "## Cost Analysis Data\n\nNo cost data available.".to_string();
    }
    let Ok(cost) = serde_json::from_str::<Value>(cost_json) else {
        return format!("## Cost Analysis Data\n\n```json\n{cost_json}\n```");
    };

    let mut lines = vec!["## Cost Analysis Data (include BOTH tables in the document)\n".to_string()];
    let tiers = cost.get("scale_tiers").and_then(Value::as_array);

    if let Some(tiers) = tiers.filter(|t| !t.is_empty()) {
        lines.push("### Summary by Provider and Tier\n".to_string());
        lines.push("| Tier | AWS | GCP | Azure |".to_string());
        lines.push("|------|-----|-----|-------|".to_string());
        for tier in tiers {
            let cell = |provider: &str| {
                tier.get(provider)
                    .and_then(|p| p.get("total_monthly_usd"))
                    .map(|v| match v {
                        Value::Number(n) => format!("${n}"),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "N/A".to_string())
            };
            lines.push(format!(
                "| {} | {} | {} | {} |",
                tier.get("tier_name").and_then(Value::as_str).unwrap_or("?"),
                cell("aws"),
                cell("gcp"),
                cell("azure")
            ));
        }

        if let Some(breakdown) = tiers[0]
            .get("aws")
            .and_then(|aws| aws.get("breakdown"))
            .and_then(Value::as_array)
            .filter(|b| !b.is_empty())
        {
            lines.push("\n### Detailed Breakdown (Startup Tier — AWS)\n".to_string());
            lines.push("| Category | Service | Specs | Monthly USD |".to_string());
            lines.push("|----------|---------|-------|-------------|".to_string());
            for item in breakdown {
                let field =
                    |key: &str| item.get(key).and_then(Value::as_str).unwrap_or("").to_string();
                lines.push(format!(
                    "| {} | {} | {} | ${} |",
                    field("category"),
                    field("service"),
                    field("specs"),
                    item.get("monthly_usd").cloned().unwrap_or(Value::Null)
                ));
            }
        }
    }

    if let Some(tips) = cost
        .get("cost_optimization_tips")
        .and_then(Value::as_array)
        .filter(|t| !t.is_empty())
    {
        lines.push("\n### Cost Optimization Tips\n".to_string());
        for (i, tip) in tips.iter().enumerate() {
            lines.push(format!(
                "{}. **{}** — ~{}% savings (Tradeoff: {})",
                i + 1,
                tip.get("tip").and_then(Value::as_str).unwrap_or(""),
                tip.get("estimated_savings_percent").cloned().unwrap_or(Value::Null),
                tip.get("tradeoff").and_then(Value::as_str).unwrap_or("N/A")
            ));
        }
    }

    lines.join("\n")
}

/// Pull the composite availability calculation out of the validation report
/// so the document shows the math.
fn extract_composite_math(report_json: &str) -> String {
    let Ok(report) = serde_json::from_str::<Value>(report_json) else {
        return String::new();
    };
    if let Some(errors) = report.get("errors").and_then(Value::as_array) {
        for error in errors {
            if error.get("code").and_then(Value::as_str) == Some("AVAIL_COMPOSITE_BELOW_TARGET") {
                return format!(
                    "**Composite Availability Calculation**: {}\nEvidence: {}\nIMPORTANT: Include this exact calculation in the Reliability & Validation section.",
                    error.get("message").and_then(Value::as_str).unwrap_or(""),
                    error.get("evidence").and_then(Value::as_str).unwrap_or("")
                );
            }
        }
    }
    if let Some(breakdown) = report.get("score_breakdown") {
        let part = |key: &str| breakdown.get(key).cloned().unwrap_or(Value::Null);
        return format!(
            "**Score Breakdown**: Reliability={}/30, Scalability={}/25, Consistency={}/15, Security={}/15, Operational={}/15",
            part("reliability"),
            part("scalability"),
            part("consistency"),
            part("security"),
            part("operational")
        );
    }
    String::new()
}

/// Render the structured document output into a complete Markdown document.
pub fn render_markdown(output: &Value) -> String {
    let mut lines = Vec::new();
    let title = output
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Architecture Document");
    lines.push(format!("# {title}\n"));

    if let Some(summary) = output.get("executive_summary").and_then(Value::as_str) {
        if !summary.is_empty() {
            lines.push(format!("## Executive Summary\n\n{summary}\n"));
        }
    }

    for section in output
        .get("sections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
    {
        let level = section.get("level").and_then(Value::as_u64).unwrap_or(2) as usize;
        let heading = section.get("heading").and_then(Value::as_str).unwrap_or("");
        let content = section.get("content").and_then(Value::as_str).unwrap_or("");
        lines.push(format!("{} {heading}\n\n{content}\n", "#".repeat(level + 1)));
    }

    render_diagrams(&mut lines, output);
    render_validation(&mut lines, output);
    render_adrs(&mut lines, output);

    lines.join("\n")
}

fn render_diagrams(lines: &mut Vec<String>, output: &Value) {
    let Some(diagrams) = output.get("diagrams").and_then(Value::as_array) else {
        return;
    };
    if diagrams.is_empty() {
        return;
    }
    lines.push("## Architecture Diagrams\n".to_string());
    for diagram in diagrams {
        let title = diagram.get("title").and_then(Value::as_str).unwrap_or("Diagram");
        let code = diagram.get("mermaid_code").and_then(Value::as_str).unwrap_or("");
        lines.push(format!("### {title}\n"));
        lines.push(format!("```mermaid\n{code}\n```\n"));
    }
}

fn render_validation(lines: &mut Vec<String>, output: &Value) {
    let Some(score) = output.get("validation_score") else {
        return;
    };
    let passed = output
        .get("validation_passed")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    lines.push("## Design Validation\n".to_string());
    lines.push(format!(
        "**Score**: {score}/100 | **Status**: {}\n",
        if passed { "PASSED" } else { "FAILED" }
    ));

    if let Some(summary) = output.get("validation_summary") {
        let mut rows = Vec::new();
        for severity in ["critical", "high", "medium", "low"] {
            let count = summary.get(severity).and_then(Value::as_u64).unwrap_or(0);
            if count > 0 {
                rows.push(format!("| {} | {count} |", severity.to_uppercase()));
            }
        }
        if !rows.is_empty() {
            lines.push("### Severity Breakdown\n".to_string());
            lines.push("| Severity | Count |".to_string());
            lines.push("|----------|-------|".to_string());
            lines.extend(rows);
            lines.push(String::new());
        }
    }

    if let Some(findings) = output
        .get("validation_findings")
        .and_then(Value::as_array)
        .filter(|f| !f.is_empty())
    {
        lines.push("### Critical & High Findings\n".to_string());
        lines.push("| Severity | Finding | Source |".to_string());
        lines.push("|----------|---------|--------|".to_string());
        for finding in findings {
            let severity = finding
                .get("severity")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_uppercase();
            let message: String = finding
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .chars()
                .take(120)
                .collect();
            let source = if finding.get("category").and_then(Value::as_str) == Some("domain_pattern")
            {
                finding.get("evidence").and_then(Value::as_str).unwrap_or("—")
            } else {
                "General"
            };
            lines.push(format!("| {severity} | {message} | {source} |"));
        }
        lines.push(String::new());
    }

    if let Some(verdict) = output.get("validation_verdict").and_then(Value::as_str) {
        if !verdict.is_empty() {
            lines.push(format!("> {verdict}\n"));
        }
    }
}

fn render_adrs(lines: &mut Vec<String>, output: &Value) {
    let Some(decisions) = output.get("decision_log").and_then(Value::as_array) else {
        return;
    };
    if decisions.is_empty() {
        return;
    }
    // Skip when the sections already cover the ADRs.
    let sections_text: String = output
        .get("sections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|s| s.get("content").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    if sections_text.contains("ADR-") {
        return;
    }

    lines.push("## Architecture Decision Records\n".to_string());
    for adr in decisions {
        let field = |key: &str| adr.get(key).and_then(Value::as_str).unwrap_or("");
        lines.push(format!("### {}: {}\n", field("id"), field("title")));
        lines.push(format!("**Status**: {}\n", field("status")));
        lines.push(format!("**Context**: {}\n", field("context")));
        lines.push(format!("**Decision**: {}\n", field("decision")));
        lines.push(format!("**Consequences**: {}\n", field("consequences")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archadvisor_types::Preferences;
    use serde_json::json;

    #[test]
    fn rendered_document_contains_sections_diagrams_and_adrs() {
        let output = json!({
            "title": "Order System Architecture",
            "executive_summary": "A service for orders.",
            "sections": [
                {"heading": "Architecture Overview", "level": 1, "content": "Three tiers."}
            ],
            "diagrams": [
                {"type": "component", "title": "Components", "mermaid_code": "graph TD; A-->B;"}
            ],
            "decision_log": [
                {"id": "ADR-001", "title": "Use PostgreSQL", "status": "accepted",
                 "context": "Need relational data", "decision": "PostgreSQL",
                 "consequences": "Operational familiarity"}
            ]
        });
        let markdown = render_markdown(&output);
        assert!(markdown.contains("# Order System Architecture"));
        assert!(markdown.contains("## Executive Summary"));
        assert!(markdown.contains("## Architecture Overview"));
        assert!(markdown.contains("```mermaid"));
        assert!(markdown.contains("### ADR-001: Use PostgreSQL"));
    }

    #[test]
    fn validation_block_renders_score_and_findings_table() {
        let output = json!({
            "title": "Doc",
            "validation_score": 72.0,
            "validation_passed": true,
            "validation_summary": {"critical": 0, "high": 2, "medium": 1, "low": 0},
            "validation_findings": [
                {"severity": "high", "message": "Database has no replication", "category": null, "evidence": null}
            ],
            "validation_verdict": "PASS — Acceptable design"
        });
        let markdown = render_markdown(&output);
        assert!(markdown.contains("**Score**: 72.0/100 | **Status**: PASSED"));
        assert!(markdown.contains("| HIGH | Database has no replication | General |"));
        assert!(markdown.contains("> PASS — Acceptable design"));
    }

    #[test]
    fn adr_block_is_skipped_when_sections_cover_it() {
        let output = json!({
            "title": "Doc",
            "sections": [{"heading": "ADRs", "level": 1, "content": "ADR-001 covered inline"}],
            "decision_log": [{"id": "ADR-001", "title": "X", "status": "accepted",
                              "context": "", "decision": "", "consequences": ""}]
        });
        let markdown = render_markdown(&output);
        assert!(!markdown.contains("## Architecture Decision Records"));
    }

    #[test]
    fn cost_tables_preformat_into_markdown() {
        let cost = json!({
            "scale_tiers": [{
                "tier_name": "Startup",
                "aws": {"total_monthly_usd": 450, "breakdown": [
                    {"category": "Compute", "service": "ECS Fargate", "specs": "2 tasks", "monthly_usd": 120}
                ]},
                "gcp": {"total_monthly_usd": 430},
                "azure": {"total_monthly_usd": 470}
            }],
            "cost_optimization_tips": [
                {"tip": "Use spot instances", "estimated_savings_percent": 40, "tradeoff": "interruptions"}
            ]
        })
        .to_string();
        let table = preformat_cost_tables(&cost);
        assert!(table.contains("| Startup | $450 | $430 | $470 |"));
        assert!(table.contains("| Compute | ECS Fargate | 2 tasks | $120 |"));
        assert!(table.contains("**Use spot instances** — ~40% savings"));
    }

    #[test]
    fn prompt_embeds_validation_score_when_present() {
        let mut state = SessionState::new("arch_1", "reqs", Preferences::default());
        state.validation_score = Some(85.0);
        state.validation_passed = Some(true);
        state.validation_report = Some("{\"score_breakdown\": {\"reliability\": 30.0}}".to_string());
        let message = DocumentationRole.build_user_message(&state);
        assert!(message.contains("Score: 85/100 | PASSED"));
        assert!(message.contains("**Score Breakdown**"));
    }
}
