//! Data consistency model checks and justification enforcement.

use serde_json::Value;

use crate::design::{contains_any, Component, Design};
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::reference::EVENTUALLY_CONSISTENT_DBS;
use crate::rules::Rule;

const JUSTIFICATION_KEYWORDS: &[&str] = &[
    "eventual",
    "consistency",
    "cap",
    "trade-off",
    "tradeoff",
    "latency vs consistency",
    "availability over consistency",
];

const MULTI_REGION_KEYWORDS: &[&str] = &[
    "multi-region",
    "multi_region",
    "cross-region",
    "geo-distributed",
    "global deployment",
    "multiple regions",
];

pub struct ConsistencyRule;

impl Rule for ConsistencyRule {
    fn name(&self) -> &'static str {
        "consistency"
    }

    fn validate(&self, design: &Value, _requirements: &str) -> Vec<ValidationError> {
        let view = Design::new(design);
        let consistency = view.data_consistency();

        if consistency.is_empty() {
            return vec![ValidationError::new(
                ErrorCode::ConsistMissingStrategy,
                Severity::Medium,
                "No data consistency strategy declared in non_functional requirements",
            )
            .field("non_functional.data_consistency")
            .suggestion("Specify: 'strong', 'eventual', or 'causal'")];
        }

        let mut errors = Vec::new();
        match consistency.as_str() {
            "eventual" => errors.extend(check_eventual_justification(&view)),
            "strong" => {
                errors.extend(check_strong_multi_region(&view));
                errors.extend(check_strong_with_eventual_db(&view.components()));
            }
            _ => {}
        }
        errors
    }
}

/// Eventual consistency must be a deliberate choice, argued in a tech
/// decision, not an accident of database selection.
fn check_eventual_justification(view: &Design<'_>) -> Vec<ValidationError> {
    for decision in view.tech_decisions() {
        let text = format!(
            "{} {}",
            decision.get("decision").and_then(Value::as_str).unwrap_or(""),
            decision.get("reasoning").and_then(Value::as_str).unwrap_or("")
        );
        if contains_any(&text, JUSTIFICATION_KEYWORDS) {
            return Vec::new();
        }
    }
    vec![ValidationError::new(
        ErrorCode::ConsistEventualNoJustification,
        Severity::Medium,
        "Eventual consistency declared but no justification in tech_decisions",
    )
    .field("non_functional.data_consistency")
    .suggestion(
        "Add a tech_decision explaining why eventual consistency was chosen: e.g., CAP theorem tradeoff, latency requirements, read-heavy workload",
    )]
}

fn check_strong_multi_region(view: &Design<'_>) -> Vec<ValidationError> {
    let is_multi_region = contains_any(&view.flat_text(), MULTI_REGION_KEYWORDS)
        || view.deployment_regions().len() > 1;
    if !is_multi_region {
        return Vec::new();
    }
    vec![ValidationError::new(
        ErrorCode::ConsistStrongMultiRegionLatency,
        Severity::High,
        "Strong consistency with multi-region deployment will incur high cross-region latency (50-200ms per write for consensus)",
    )
    .suggestion(
        "Consider: (1) Causal consistency with conflict resolution, (2) Single-leader with read replicas, or (3) Accept eventual consistency with compensating transactions",
    )]
}

fn check_strong_with_eventual_db(components: &[Component<'_>]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for comp in components {
        if comp.kind() != "database" {
            continue;
        }
        let text = format!("{} {}", comp.name().to_lowercase(), comp.tech_stack().join(" "));
        let Some(db) = EVENTUALLY_CONSISTENT_DBS.iter().find(|db| text.contains(*db)) else {
            continue;
        };
        let name = comp.name();
        errors.push(
            ValidationError::new(
                ErrorCode::ConsistStrongWithEventualDb,
                Severity::Critical,
                format!(
                    "Design claims 'strong' consistency but uses '{db}' in '{name}', which is eventually consistent by default"
                ),
            )
            .component(name)
            .suggestion(format!(
                "Either: (1) Switch to a strongly consistent DB (PostgreSQL, MySQL, CockroachDB), (2) Change consistency model to 'eventual', or (3) Use '{db}' with strong consistency settings"
            )),
        );
    }
    errors
}
