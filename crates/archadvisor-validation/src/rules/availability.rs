//! SPOF detection, composite availability math, and replication checks.
//!
//! The composite check is the high-value one: it computes the actual serial
//! availability of the topology and compares it against the declared target.

use serde_json::Value;

use crate::design::{contains_any, Component, Design};
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::reference::find_availability;
use crate::rules::Rule;

pub const REDUNDANCY_KEYWORDS: &[&str] = &[
    "cluster",
    "replica",
    "multi-az",
    "multi_az",
    "multi-region",
    "failover",
    "standby",
    "hot-standby",
    "sentinel",
    "replication",
    "redundant",
    "ha ",
    "high availability",
    "active-passive",
    "active-active",
];

const SINGLE_INSTANCE_KEYWORDS: &[&str] = &[
    "single",
    "standalone",
    "one instance",
    "single node",
    "1 instance",
    "single-instance",
    "no replica",
];

const REPLICATION_KEYWORDS: &[&str] = &[
    "replication",
    "replica",
    "standby",
    "follower",
    "secondary",
    "read replica",
    "multi-master",
    "primary-secondary",
];

const MULTI_AZ_KEYWORDS: &[&str] = &[
    "multi-az",
    "multi_az",
    "multiple availability zones",
    "multi-region",
    "multi_region",
];

pub struct AvailabilityRule;

impl Rule for AvailabilityRule {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn validate(&self, design: &Value, _requirements: &str) -> Vec<ValidationError> {
        let view = Design::new(design);
        let components = view.components();
        let target = view.availability_target();
        let flat_text = view.flat_text();

        let mut errors = detect_spofs(&components, target);

        if let Some(target) = target {
            if target >= 99.0 {
                errors.extend(check_composite(&components, target));
            }
            if target >= 99.99 {
                errors.extend(check_high_sla(&view, &flat_text, target));
            }
            if target >= 99.9 {
                errors.extend(check_replication(&components, target));
            }
        }

        errors
    }
}

fn detect_spofs(components: &[Component<'_>], target: Option<f64>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    // A SPOF under a three-nines-or-better target is design-breaking.
    let gated_severity = if target.map(|t| t >= 99.9).unwrap_or(false) {
        Severity::Critical
    } else {
        Severity::High
    };

    for comp in components {
        let name = comp.name();
        let text = comp.summary_text();
        let has_redundancy = contains_any(&text, REDUNDANCY_KEYWORDS);
        let is_single = contains_any(&text, SINGLE_INSTANCE_KEYWORDS);
        if has_redundancy && !is_single {
            continue;
        }

        match comp.kind().as_str() {
            "database" => errors.push(
                ValidationError::new(
                    ErrorCode::SpofDatabase,
                    gated_severity,
                    format!("Database '{name}' appears to be a single instance with no replication"),
                )
                .component(name)
                .suggestion("Add read replicas, multi-AZ deployment, or clustering")
                .evidence(format!(
                    "No redundancy keywords found in: {}",
                    text.chars().take(100).collect::<String>()
                )),
            ),
            "cache" => errors.push(
                ValidationError::new(
                    ErrorCode::SpofCache,
                    Severity::High,
                    format!("Cache '{name}' is a single instance — cache failure will cascade to database"),
                )
                .component(name)
                .suggestion("Use Redis Sentinel, Redis Cluster, or ElastiCache with replicas"),
            ),
            "gateway" => errors.push(
                ValidationError::new(
                    ErrorCode::SpofGateway,
                    gated_severity,
                    format!(
                        "API Gateway '{name}' appears to be a single instance — all traffic routes through it"
                    ),
                )
                .component(name)
                .suggestion(
                    "Use a managed gateway (AWS ALB, API Gateway) or deploy multiple instances behind a load balancer",
                ),
            ),
            "queue" => errors.push(
                ValidationError::new(
                    ErrorCode::SpofQueue,
                    Severity::High,
                    format!(
                        "Message queue '{name}' is a single instance — async processing will halt on failure"
                    ),
                )
                .component(name)
                .suggestion("Use a managed service (SQS, MSK) or deploy a multi-broker cluster"),
            ),
            _ => {}
        }
    }

    errors
}

/// Availability of one component, from the reference table by substring match
/// with a fallback by type. Redundancy upgrades the figure to `1 - (1-a)^2`.
fn estimate_availability(comp: &Component<'_>) -> f64 {
    let text = format!(
        "{} {} {}",
        comp.name().to_lowercase(),
        comp.kind(),
        comp.tech_stack().join(" ")
    );
    let has_redundancy = contains_any(&comp.summary_text(), REDUNDANCY_KEYWORDS);

    let base = find_availability(&text).unwrap_or_else(|| match comp.kind().as_str() {
        "database" | "cache" | "queue" => 0.9990,
        "cdn" | "storage" => 0.9999,
        _ => 0.9995,
    });

    if has_redundancy {
        redundant_availability(base)
    } else {
        base
    }
}

/// Two independent instances: the pair fails only when both fail.
pub fn redundant_availability(base: f64) -> f64 {
    1.0 - (1.0 - base).powi(2)
}

fn check_composite(components: &[Component<'_>], target: f64) -> Vec<ValidationError> {
    let per_component: Vec<(String, f64)> = components
        .iter()
        .map(|c| (c.name(), estimate_availability(c)))
        .collect();

    if per_component.len() < 2 {
        return Vec::new();
    }

    let composite: f64 = per_component.iter().map(|(_, a)| a).product();
    let composite_percent = composite * 100.0;

    if composite_percent >= target {
        return Vec::new();
    }

    let mut bottlenecks = per_component.clone();
    bottlenecks.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let bottleneck_list = bottlenecks
        .iter()
        .take(3)
        .map(|(name, a)| format!("{name} ({:.3}%)", a * 100.0))
        .collect::<Vec<_>>()
        .join(", ");

    vec![ValidationError::new(
        ErrorCode::AvailCompositeBelowTarget,
        Severity::Critical,
        format!(
            "Composite availability is {composite_percent:.2}%, below target of {target}%. Bottlenecks: {bottleneck_list}"
        ),
    )
    .suggestion(
        "Add redundancy to bottleneck components, use managed services with higher SLAs, or lower the availability target",
    )
    .evidence(format!(
        "Computed from {} serial components",
        per_component.len()
    ))]
}

fn check_high_sla(view: &Design<'_>, flat_text: &str, target: f64) -> Vec<ValidationError> {
    if contains_any(flat_text, MULTI_AZ_KEYWORDS) {
        return Vec::new();
    }
    if view.deployment_regions().len() > 1 {
        return Vec::new();
    }
    vec![ValidationError::new(
        ErrorCode::AvailSingleRegionHighSla,
        Severity::Critical,
        format!(
            "Availability target {target}% requires multi-AZ or multi-region, but design appears single-region"
        ),
    )
    .field("deployment.regions")
    .suggestion("Deploy across at least 2 availability zones, or use multi-region active-passive")]
}

fn check_replication(components: &[Component<'_>], target: f64) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for comp in components {
        if comp.kind() != "database" {
            continue;
        }
        if contains_any(&comp.flat_text(), REPLICATION_KEYWORDS) {
            continue;
        }
        let name = comp.name();
        errors.push(
            ValidationError::new(
                ErrorCode::AvailNoReplication,
                Severity::High,
                format!(
                    "Database '{name}' has no replication strategy specified with {target}% SLA target"
                ),
            )
            .component(name)
            .suggestion(
                "Specify replication: primary-replica, multi-master, or managed service with automatic replication",
            ),
        );
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redundancy_formula_matches_two_instance_model() {
        let a = 0.999;
        assert!((redundant_availability(a) - 0.999999).abs() < 1e-9);
    }

    #[test]
    fn single_database_under_high_target_is_critical_spof() {
        let design = json!({
            "components": [
                {"name": "Orders DB", "type": "database", "tech_stack": ["postgresql"],
                 "scaling_strategy": "vertical"}
            ],
            "non_functional": {"availability_target": "99.9%"}
        });
        let errors = AvailabilityRule.validate(&design, "");
        let spof = errors
            .iter()
            .find(|e| e.code == ErrorCode::SpofDatabase)
            .unwrap();
        assert_eq!(spof.severity, Severity::Critical);
    }

    #[test]
    fn spof_severity_drops_to_high_without_tight_target() {
        let design = json!({
            "components": [
                {"name": "Orders DB", "type": "database", "tech_stack": ["postgresql"],
                 "scaling_strategy": ""}
            ],
            "non_functional": {"availability_target": "99.5%"}
        });
        let errors = AvailabilityRule.validate(&design, "");
        let spof = errors
            .iter()
            .find(|e| e.code == ErrorCode::SpofDatabase)
            .unwrap();
        assert_eq!(spof.severity, Severity::High);
    }

    #[test]
    fn two_plain_postgres_components_miss_a_four_nines_target() {
        // Scenario: two serial 99.90% components compose to 99.80%.
        let design = json!({
            "components": [
                {"name": "Primary Store", "type": "database", "tech_stack": ["postgresql"],
                 "scaling_strategy": "vertical"},
                {"name": "Reporting Store", "type": "database", "tech_stack": ["postgresql"],
                 "scaling_strategy": "vertical"}
            ],
            "non_functional": {"availability_target": "99.99%"}
        });
        let errors = AvailabilityRule.validate(&design, "");
        let composite = errors
            .iter()
            .find(|e| e.code == ErrorCode::AvailCompositeBelowTarget)
            .expect("composite finding");
        assert_eq!(composite.severity, Severity::Critical);
        assert!(composite.message.contains("99.80%"));
        assert_eq!(
            composite.evidence.as_deref(),
            Some("Computed from 2 serial components")
        );
    }

    #[test]
    fn redundant_components_clear_the_composite_bar() {
        let design = json!({
            "components": [
                {"name": "API Gateway", "type": "gateway", "tech_stack": ["api_gateway"],
                 "scaling_strategy": "managed multi-az"},
                {"name": "Orders DB", "type": "database", "tech_stack": ["postgresql"],
                 "scaling_strategy": "primary with read replica failover"}
            ],
            "non_functional": {"availability_target": "99.9%"}
        });
        let errors = AvailabilityRule.validate(&design, "");
        assert!(!errors
            .iter()
            .any(|e| e.code == ErrorCode::AvailCompositeBelowTarget));
    }

    #[test]
    fn high_sla_single_region_is_critical() {
        let design = json!({
            "components": [],
            "non_functional": {"availability_target": "99.99%"},
            "deployment": {"regions": ["us-east-1"]}
        });
        let errors = AvailabilityRule.validate(&design, "");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::AvailSingleRegionHighSla && e.severity == Severity::Critical));
    }

    #[test]
    fn database_without_replication_tokens_is_flagged_at_three_nines() {
        let design = json!({
            "components": [
                {"name": "Users DB", "type": "database", "tech_stack": ["mysql"],
                 "scaling_strategy": "multi-az cluster"}
            ],
            "non_functional": {"availability_target": "99.9%"}
        });
        // "cluster" satisfies SPOF but the replication token list is narrower.
        let errors = AvailabilityRule.validate(&design, "");
        assert!(errors.iter().any(|e| e.code == ErrorCode::AvailNoReplication));
    }
}
