//! Over-engineering detection: too many services for the scale, heavyweight
//! infrastructure for small systems, premature multi-region.

use serde_json::Value;

use crate::design::Design;
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::reference::ENTERPRISE_SERVICES;
use crate::rules::Rule;

const MVP_KEYWORDS: &[&str] = &["mvp", "prototype", "proof of concept", "poc", "small", "startup"];

pub struct OperationalComplexityRule;

impl Rule for OperationalComplexityRule {
    fn name(&self) -> &'static str {
        "operational_complexity"
    }

    fn validate(&self, design: &Value, requirements: &str) -> Vec<ValidationError> {
        let view = Design::new(design);
        let req_lower = requirements.to_lowercase();
        let declared = view.declared_throughput();
        let service_count = view.service_count();
        let total_components = view.components().len();
        let all_techs = view.all_tech_stack();
        let flat_text = view.flat_text();

        let mut errors = Vec::new();
        errors.extend(check_service_count(service_count, total_components, declared, &req_lower));
        errors.extend(check_kafka_overkill(&all_techs, &flat_text, declared));
        errors.extend(check_multi_region_overkill(&view, declared, &req_lower));
        errors.extend(check_enterprise_overkill(&all_techs, declared, &req_lower));
        errors
    }
}

fn check_service_count(
    service_count: usize,
    total_components: usize,
    throughput: Option<u64>,
    req_text: &str,
) -> Vec<ValidationError> {
    // More than 15 components is suspicious at any scale.
    if total_components > 15 {
        return vec![ValidationError::new(
            ErrorCode::OpsTooManyServices,
            Severity::High,
            format!(
                "{total_components} components defined — this is operationally complex and expensive to maintain"
            ),
        )
        .suggestion(
            "Consolidate related services. Consider bounded contexts — not every entity needs its own service.",
        )];
    }

    if service_count >= 8 && throughput.map(|t| t < 5_000).unwrap_or(true) {
        let is_mvp = MVP_KEYWORDS.iter().any(|kw| req_text.contains(kw));
        let is_tiny = throughput.map(|t| t < 1_000).unwrap_or(false);
        if is_mvp || is_tiny {
            let scale = if is_tiny { "<1K RPS" } else { "small scale" };
            return vec![ValidationError::new(
                ErrorCode::OpsTooManyServices,
                Severity::Medium,
                format!(
                    "{service_count} services for {scale} — microservices overhead may outweigh benefits at this scale"
                ),
            )
            .suggestion("Start with a modular monolith and extract services as scale demands it")];
        }
    }

    Vec::new()
}

fn check_kafka_overkill(
    all_techs: &[String],
    flat_text: &str,
    throughput: Option<u64>,
) -> Vec<ValidationError> {
    let has_kafka = all_techs.iter().any(|t| t.contains("kafka") || t.contains("msk"))
        || flat_text.contains("kafka")
        || flat_text.contains("msk");
    let Some(throughput) = throughput else {
        return Vec::new();
    };
    if !has_kafka || throughput >= 10_000 {
        return Vec::new();
    }
    vec![ValidationError::new(
        ErrorCode::OpsKafkaLowThroughput,
        Severity::Medium,
        format!(
            "Kafka/MSK included but throughput is only {throughput} RPS. Kafka's operational overhead (ZooKeeper/KRaft, brokers, partitions) is not justified below ~10K messages/sec."
        ),
    )
    .suggestion(
        "Consider simpler alternatives: Redis Streams (< 50K mps), RabbitMQ (< 30K mps), or SQS (managed, zero-ops)",
    )]
}

fn check_multi_region_overkill(
    view: &Design<'_>,
    throughput: Option<u64>,
    req_text: &str,
) -> Vec<ValidationError> {
    let regions = view.deployment_regions();
    let availability = view.availability_target();

    let is_mvp = MVP_KEYWORDS.iter().any(|kw| req_text.contains(kw));
    let is_low_throughput = throughput.map(|t| t < 5_000).unwrap_or(false);
    let target_allows = availability.map(|a| a < 99.99).unwrap_or(false);

    if regions.len() >= 3 && (is_mvp || is_low_throughput) && target_allows {
        let label = if is_mvp { "MVP/startup" } else { "low-throughput" };
        return vec![ValidationError::new(
            ErrorCode::OpsMultiRegionMvp,
            Severity::Medium,
            format!(
                "Multi-region deployment ({} regions) for {label} system",
                regions.len()
            ),
        )
        .suggestion(
            "Start with single-region multi-AZ. Add regions when you have geographic latency requirements or regulatory needs.",
        )];
    }
    Vec::new()
}

fn check_enterprise_overkill(
    all_techs: &[String],
    throughput: Option<u64>,
    req_text: &str,
) -> Vec<ValidationError> {
    let is_small = ["mvp", "startup", "poc", "small", "simple"]
        .iter()
        .any(|kw| req_text.contains(kw));
    let is_low_throughput = throughput.map(|t| t < 5_000).unwrap_or(false);
    if !is_small && !is_low_throughput {
        return Vec::new();
    }

    let mut used = Vec::new();
    for tech in all_techs {
        for enterprise in ENTERPRISE_SERVICES {
            if tech.contains(enterprise) {
                used.push(*enterprise);
            }
        }
    }
    if used.len() < 3 {
        return Vec::new();
    }

    let label = if is_small { "small-scale" } else { "low-throughput" };
    vec![ValidationError::new(
        ErrorCode::OpsEnterpriseForStartup,
        Severity::Medium,
        format!(
            "Using {} enterprise-grade services ({}) for a {label} system",
            used.len(),
            used[..used.len().min(5)].join(", ")
        ),
    )
    .suggestion(
        "Consider simpler alternatives: PostgreSQL over Aurora, Docker Compose over Kubernetes, SQS over Kafka. Right-size your infrastructure to your scale.",
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kafka_at_one_k_rps_is_medium() {
        // Scenario: "1K RPS" declared with kafka in a tech stack.
        let design = json!({
            "components": [
                {"name": "Events", "type": "queue", "tech_stack": ["Kafka"],
                 "scaling_strategy": "cluster"}
            ],
            "non_functional": {"throughput": "1K RPS"}
        });
        let errors = OperationalComplexityRule.validate(&design, "");
        let finding = errors
            .iter()
            .find(|e| e.code == ErrorCode::OpsKafkaLowThroughput)
            .expect("kafka finding");
        assert_eq!(finding.severity, Severity::Medium);
    }

    #[test]
    fn kafka_at_high_throughput_is_fine() {
        let design = json!({
            "components": [{"name": "Events", "type": "queue", "tech_stack": ["Kafka"]}],
            "non_functional": {"throughput": "50K RPS"}
        });
        let errors = OperationalComplexityRule.validate(&design, "");
        assert!(!errors.iter().any(|e| e.code == ErrorCode::OpsKafkaLowThroughput));
    }

    #[test]
    fn sixteen_components_is_high() {
        let components: Vec<_> = (0..16)
            .map(|i| json!({"name": format!("svc-{i}"), "type": "service"}))
            .collect();
        let design = json!({"components": components});
        let errors = OperationalComplexityRule.validate(&design, "");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::OpsTooManyServices && e.severity == Severity::High));
    }

    #[test]
    fn eight_services_for_an_mvp_is_medium() {
        let components: Vec<_> = (0..8)
            .map(|i| json!({"name": format!("svc-{i}"), "type": "service"}))
            .collect();
        let design = json!({"components": components});
        let errors =
            OperationalComplexityRule.validate(&design, "An MVP for a small startup idea");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::OpsTooManyServices && e.severity == Severity::Medium));
    }

    #[test]
    fn three_regions_for_low_throughput_is_medium() {
        let design = json!({
            "components": [],
            "non_functional": {"throughput": "500", "availability_target": "99.9%"},
            "deployment": {"regions": ["us-east-1", "eu-west-1", "ap-south-1"]}
        });
        let errors = OperationalComplexityRule.validate(&design, "");
        assert!(errors.iter().any(|e| e.code == ErrorCode::OpsMultiRegionMvp));
    }

    #[test]
    fn stack_of_enterprise_services_for_startup_is_medium() {
        let design = json!({
            "components": [{
                "name": "Platform", "type": "service",
                "tech_stack": ["Kubernetes", "Kafka", "Elasticsearch"]
            }]
        });
        let errors = OperationalComplexityRule.validate(&design, "A small startup tool");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::OpsEnterpriseForStartup));
    }
}
