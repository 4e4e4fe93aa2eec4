//! Cross-field contradiction detection. Catches designs whose parts disagree
//! with each other: claimed style vs actual components, claimed consistency
//! vs chosen databases, claimed latency vs hop count.

use serde_json::Value;

use crate::design::{contains_any, parse_latency_ms, Design};
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::reference::{EVENTUALLY_CONSISTENT_DBS, MESSAGE_BROKERS};
use crate::rules::Rule;

const K8S_KEYWORDS: &[&str] = &["kubernetes", "k8s", "eks", "gke", "aks", "helm"];

const LOCAL_STATE_KEYWORDS: &[&str] = &[
    "local file",
    "in-memory state",
    "session storage",
    "local disk",
    "local storage",
];

const STATELESS_KEYWORDS: &[&str] = &["stateless", "horizontally scalable", "no shared state"];

const NF_MULTI_REGION_KEYWORDS: &[&str] = &["multi-region", "multi_region", "global", "cross-region"];

pub struct ContradictionRule;

impl Rule for ContradictionRule {
    fn name(&self) -> &'static str {
        "contradiction"
    }

    fn validate(&self, design: &Value, _requirements: &str) -> Vec<ValidationError> {
        let view = Design::new(design);
        let style = view.architecture_style().replace(' ', "_");
        let components = view.components();
        let flat_text = view.flat_text();
        let mut errors = Vec::new();

        // Event-driven without any broker or queue component.
        if style.contains("event") {
            let has_broker = MESSAGE_BROKERS.iter().any(|b| flat_text.contains(b));
            let has_queue = components.iter().any(|c| c.kind() == "queue");
            if !has_broker && !has_queue {
                errors.push(
                    ValidationError::new(
                        ErrorCode::ContraEventDrivenNoBroker,
                        Severity::Critical,
                        "Architecture style is 'event-driven' but no message broker found in components",
                    )
                    .suggestion("Add a message broker: Kafka, RabbitMQ, SQS, Pulsar, or Redis Streams")
                    .evidence(format!(
                        "Style: {style}, searched for: {}",
                        MESSAGE_BROKERS[..6].join(", ")
                    )),
                );
            }
        }

        // Strong consistency with an eventually consistent DB anywhere in the
        // stack (the consistency rule flags only database components).
        if view.data_consistency() == "strong" {
            for tech in view.all_tech_stack() {
                if let Some(db) = EVENTUALLY_CONSISTENT_DBS.iter().find(|db| tech.contains(*db)) {
                    errors.push(
                        ValidationError::new(
                            ErrorCode::ContraStrongConsistEventualDb,
                            Severity::Critical,
                            format!(
                                "Claims 'strong' consistency but tech stack includes '{db}' (eventually consistent)"
                            ),
                        )
                        .suggestion("Either switch DB or change consistency model to 'eventual'"),
                    );
                    break;
                }
            }
        }

        if style.contains("serverless") && contains_any(&flat_text, K8S_KEYWORDS) {
            errors.push(
                ValidationError::new(
                    ErrorCode::ContraServerlessWithK8s,
                    Severity::High,
                    "Architecture style is 'serverless' but Kubernetes is mentioned in deployment",
                )
                .suggestion(
                    "Choose one: true serverless (Lambda/Cloud Run) or container orchestration (K8s). They serve different operational models.",
                )
                .evidence(format!("Style: {style}, found K8s references in design")),
            );
        }

        // Tight latency target with a long synchronous call chain.
        let latency_targets = view.non_functional().get("latency_targets").unwrap_or(&Value::Null);
        let p99 = parse_latency_ms(latency_targets.get("p99").unwrap_or(&Value::Null))
            .or_else(|| parse_latency_ms(latency_targets.get("p50").unwrap_or(&Value::Null)));
        if let Some(p99) = p99 {
            let service_count = view.service_count();
            if p99 <= 100 && service_count >= 6 {
                errors.push(
                    ValidationError::new(
                        ErrorCode::ContraLowLatencyManyHops,
                        Severity::High,
                        format!(
                            "Latency target is {p99}ms (p99) but architecture has {service_count} services. Each synchronous hop adds 5-20ms network latency."
                        ),
                    )
                    .suggestion(
                        "Reduce synchronous call chain: use async processing, collapse services, or add caching to avoid downstream calls",
                    )
                    .evidence(format!(
                        "p99 target: {p99}ms, service count: {service_count}, estimated min latency: {}ms",
                        service_count * 5
                    )),
                );
            }
        }

        // NFRs promise multi-region, deployment delivers one region.
        let nf_text = view.non_functional().to_string().to_lowercase();
        if contains_any(&nf_text, NF_MULTI_REGION_KEYWORDS) && view.deployment_regions().len() <= 1 {
            errors.push(
                ValidationError::new(
                    ErrorCode::ContraMultiRegionSingleDeploy,
                    Severity::High,
                    "Non-functional requirements mention multi-region but deployment specifies single region",
                )
                .field("deployment.regions")
                .suggestion("Add multiple regions to deployment configuration to match NFR claims"),
            );
        }

        if style.contains("microservice") && components.len() <= 2 {
            errors.push(
                ValidationError::new(
                    ErrorCode::ContraStyleMismatch,
                    Severity::Medium,
                    format!(
                        "Architecture style is '{style}' but only {} components defined — this is effectively a monolith",
                        components.len()
                    ),
                )
                .suggestion(
                    "Either add more granular service boundaries or change architecture_style to 'monolith' or 'modular_monolith'",
                ),
            );
        }

        if style.contains("monolith") && components.len() >= 10 {
            errors.push(
                ValidationError::new(
                    ErrorCode::ContraStyleMismatch,
                    Severity::Medium,
                    format!(
                        "Architecture style is '{style}' but {} components defined — this looks like microservices",
                        components.len()
                    ),
                )
                .suggestion("Change architecture_style to 'microservices' or consolidate components"),
            );
        }

        for comp in &components {
            let text = comp.flat_text();
            if contains_any(&text, STATELESS_KEYWORDS) && contains_any(&text, LOCAL_STATE_KEYWORDS) {
                let name = comp.name();
                errors.push(
                    ValidationError::new(
                        ErrorCode::ContraStatelessWithLocalState,
                        Severity::High,
                        format!("'{name}' claims stateless but references local state storage"),
                    )
                    .component(name)
                    .suggestion("Move state to external store (Redis, DB) or remove stateless claim"),
                );
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_driven_without_broker_is_critical() {
        // Scenario: no queue component, no broker token anywhere.
        let design = json!({
            "architecture_style": "event-driven",
            "components": [
                {"name": "API", "type": "service", "tech_stack": ["fastapi"]}
            ]
        });
        let errors = ContradictionRule.validate(&design, "");
        let finding = errors
            .iter()
            .find(|e| e.code == ErrorCode::ContraEventDrivenNoBroker)
            .expect("broker finding");
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn event_driven_with_queue_component_passes() {
        let design = json!({
            "architecture_style": "event_driven",
            "components": [{"name": "Jobs", "type": "queue", "tech_stack": ["beanstalkd"]}]
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(!errors
            .iter()
            .any(|e| e.code == ErrorCode::ContraEventDrivenNoBroker));
    }

    #[test]
    fn strong_consistency_with_dynamo_in_stack_is_critical() {
        let design = json!({
            "non_functional": {"data_consistency": "strong"},
            "components": [{"name": "API", "type": "service", "tech_stack": ["dynamodb"]}]
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::ContraStrongConsistEventualDb));
    }

    #[test]
    fn serverless_with_kubernetes_is_high() {
        let design = json!({
            "architecture_style": "serverless",
            "deployment": {"containerization": "EKS with Helm charts"}
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(errors.iter().any(|e| e.code == ErrorCode::ContraServerlessWithK8s));
    }

    #[test]
    fn tight_latency_with_many_services_is_high() {
        let services: Vec<_> = (0..6)
            .map(|i| json!({"name": format!("svc-{i}"), "type": "service"}))
            .collect();
        let design = json!({
            "components": services,
            "non_functional": {"latency_targets": {"p99": "100ms"}}
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(errors.iter().any(|e| e.code == ErrorCode::ContraLowLatencyManyHops));
    }

    #[test]
    fn nfr_multi_region_with_single_deploy_region_is_high() {
        let design = json!({
            "non_functional": {"disaster_recovery": "multi-region failover"},
            "deployment": {"regions": ["us-east-1"]}
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::ContraMultiRegionSingleDeploy));
    }

    #[test]
    fn microservices_with_two_components_is_style_mismatch() {
        let design = json!({
            "architecture_style": "microservices",
            "components": [
                {"name": "App", "type": "service"},
                {"name": "DB", "type": "database"}
            ]
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(errors.iter().any(|e| e.code == ErrorCode::ContraStyleMismatch));
    }

    #[test]
    fn stateless_claim_with_local_state_is_high() {
        let design = json!({
            "components": [{
                "name": "API",
                "type": "service",
                "responsibility": "stateless request handling with session storage on local disk"
            }]
        });
        let errors = ContradictionRule.validate(&design, "");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::ContraStatelessWithLocalState));
    }
}
