//! Throughput feasibility against per-node benchmarks, scaling strategy and
//! hotspot checks.

use serde_json::Value;

use crate::design::{contains_any, Component, Design};
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::reference::find_benchmark;
use crate::rules::Rule;

const HORIZONTAL_KEYWORDS: &[&str] = &["horizontal", "replica", "shard", "partition", "cluster"];

const AUTOSCALE_KEYWORDS: &[&str] = &[
    "auto-scaling",
    "autoscaling",
    "auto_scaling",
    "horizontal scaling",
    "hpa",
    "keda",
    "target tracking",
    "scale out",
    "elastic",
];

const SINGLE_NODE_KEYWORDS: &[&str] =
    &["single", "1 instance", "one instance", "standalone", "single node"];

const SHARD_KEYWORDS: &[&str] = &[
    "shard",
    "partition",
    "hash ring",
    "consistent hash",
    "range partition",
    "key-based partition",
];

const WRITE_HEAVY_KEYWORDS: &[&str] =
    &["write-heavy", "write heavy", "all writes", "primary writer"];

pub struct CapacityRule;

impl Rule for CapacityRule {
    fn name(&self) -> &'static str {
        "capacity"
    }

    fn validate(&self, design: &Value, _requirements: &str) -> Vec<ValidationError> {
        let view = Design::new(design);
        let components = view.components();
        let flat_text = view.flat_text();
        let declared = view.declared_throughput();

        let mut errors = Vec::new();

        if let Some(declared) = declared {
            errors.extend(check_benchmarks(&components, declared));
            if declared >= 10_000 {
                errors.extend(check_autoscaling(&flat_text, declared));
                errors.extend(check_single_node(&components, declared));
            }
            if declared >= 5_000 {
                errors.extend(check_sharding(&components, declared));
            }
        }

        errors.extend(check_scaling_strategy(&components));
        errors
    }
}

fn check_benchmarks(components: &[Component<'_>], declared: u64) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for comp in components {
        let name = comp.name();
        let scaling = comp.scaling_strategy();
        for tech in comp.tech_stack() {
            let tech = tech.replace(' ', "_");
            let Some((bench_key, bench)) = find_benchmark(&tech) else {
                continue;
            };
            let max_rps = if contains_any(&scaling, HORIZONTAL_KEYWORDS) {
                bench.replicated()
            } else {
                bench.single_node()
            };
            if declared > max_rps {
                errors.push(
                    ValidationError::new(
                        ErrorCode::CapThroughputExceedsBenchmark,
                        Severity::High,
                        format!(
                            "Declared throughput ({declared} RPS) exceeds '{bench_key}' benchmark ({max_rps} RPS) in '{name}'"
                        ),
                    )
                    .component(name.clone())
                    .suggestion(format!(
                        "Add horizontal scaling, read replicas, or caching. '{bench_key}' single node handles ~{} RPS.",
                        bench.single_node()
                    ))
                    .evidence(format!(
                        "tech: {tech}, benchmark: {bench_key}, declared: {declared}, max: {max_rps}"
                    )),
                );
            }
        }
    }

    errors
}

fn check_autoscaling(flat_text: &str, declared: u64) -> Vec<ValidationError> {
    if contains_any(flat_text, AUTOSCALE_KEYWORDS) {
        return Vec::new();
    }
    vec![ValidationError::new(
        ErrorCode::CapNoAutoscaling,
        Severity::High,
        format!("Declared throughput is {declared} RPS but no auto-scaling strategy mentioned"),
    )
    .suggestion("Add auto-scaling: HPA for K8s, target tracking for ECS, or managed auto-scaling")
    .evidence(format!("Searched for: {}", AUTOSCALE_KEYWORDS[..5].join(", ")))]
}

fn check_single_node(components: &[Component<'_>], declared: u64) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for comp in components {
        let kind = comp.kind();
        if kind != "service" && kind != "gateway" {
            continue;
        }
        let text = format!("{} {} {}", comp.name(), kind, comp.scaling_strategy()).to_lowercase();
        if contains_any(&text, SINGLE_NODE_KEYWORDS) {
            let name = comp.name();
            errors.push(
                ValidationError::new(
                    ErrorCode::CapSingleNodeHighRps,
                    Severity::Critical,
                    format!("'{name}' appears to be single-node but must handle {declared} RPS"),
                )
                .component(name)
                .suggestion("Deploy multiple instances behind a load balancer with auto-scaling"),
            );
        }
    }
    errors
}

fn check_sharding(components: &[Component<'_>], declared: u64) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for comp in components {
        if comp.kind() != "database" {
            continue;
        }
        let text = comp.flat_text();
        if contains_any(&text, SHARD_KEYWORDS) {
            continue;
        }
        let name = comp.name();

        // Sharding becomes important above 20K RPS.
        if declared >= 20_000 {
            errors.push(
                ValidationError::new(
                    ErrorCode::CapNoSharding,
                    Severity::High,
                    format!(
                        "Database '{name}' has no sharding strategy with {declared} RPS declared throughput"
                    ),
                )
                .component(name.clone())
                .suggestion(
                    "Add partitioning strategy: hash-based sharding, range partitioning, or use a natively distributed database",
                ),
            );
        }

        if declared >= 5_000 && contains_any(&text, WRITE_HEAVY_KEYWORDS) {
            errors.push(
                ValidationError::new(
                    ErrorCode::CapHotspotRisk,
                    Severity::Medium,
                    format!("Write-heavy database '{name}' may have hotspot risk without partitioning"),
                )
                .component(name)
                .suggestion(
                    "Implement write distribution via consistent hashing or application-level sharding",
                ),
            );
        }
    }
    errors
}

fn check_scaling_strategy(components: &[Component<'_>]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for comp in components {
        let kind = comp.kind();
        if kind != "service" && kind != "gateway" {
            continue;
        }
        if !comp.scaling_strategy().trim().is_empty() {
            continue;
        }
        let name = comp.name();
        errors.push(
            ValidationError::new(
                ErrorCode::CapNoScalingStrategy,
                Severity::Medium,
                format!("Service '{name}' has no scaling_strategy defined"),
            )
            .component(name)
            .suggestion("Specify: horizontal, vertical, or auto-scaling strategy"),
        );
    }
    errors
}
