//! Finding types, severity levels, scoring weights, and the report structure.
//!
//! Everything here is deterministic: same findings in, same score and verdict
//! out. No LLM calls, no randomness.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Design is fundamentally broken
    Critical,
    /// Serious gap that will cause production issues
    High,
    /// Should be addressed but not blocking
    Medium,
    /// Suggestion for improvement
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// Stable error codes, one per validation rule outcome.
///
/// Naming convention: CATEGORY_SPECIFIC_ISSUE. Domain pattern rules carry
/// their own ids from the rule files and round-trip through `Domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Schema
    SchemaMissingField,
    SchemaInvalidType,
    SchemaInvalidValue,
    SchemaEmptyComponents,

    // Availability
    SpofDatabase,
    SpofCache,
    SpofGateway,
    SpofQueue,
    SpofGeneric,
    AvailTargetUnreachable,
    AvailCompositeBelowTarget,
    AvailNoMultiAz,
    AvailNoReplication,
    AvailSingleRegionHighSla,

    // Capacity
    CapThroughputExceedsBenchmark,
    CapNoAutoscaling,
    CapSingleNodeHighRps,
    CapNoSharding,
    CapHotspotRisk,
    CapNoScalingStrategy,

    // Consistency
    ConsistEventualNoJustification,
    ConsistStrongMultiRegionLatency,
    ConsistStrongWithEventualDb,
    ConsistMissingStrategy,

    // Contradictions
    ContraEventDrivenNoBroker,
    ContraStrongConsistEventualDb,
    ContraServerlessWithK8s,
    ContraLowLatencyManyHops,
    ContraMultiRegionSingleDeploy,
    ContraStyleMismatch,
    ContraStatelessWithLocalState,

    // Operational complexity
    OpsTooManyServices,
    OpsOverEngineered,
    OpsKafkaLowThroughput,
    OpsMultiRegionMvp,
    OpsEnterpriseForStartup,

    // Missing requirements
    MissingAuth,
    MissingAnalytics,
    MissingDr,
    MissingMonitoring,
    MissingLogging,
    MissingRateLimiting,
    MissingEncryption,
    MissingSearch,
    MissingNotification,
    MissingCaching,

    /// Pattern id from a domain rule file.
    Domain(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::SchemaMissingField => "SCHEMA_MISSING_FIELD",
            ErrorCode::SchemaInvalidType => "SCHEMA_INVALID_TYPE",
            ErrorCode::SchemaInvalidValue => "SCHEMA_INVALID_VALUE",
            ErrorCode::SchemaEmptyComponents => "SCHEMA_EMPTY_COMPONENTS",
            ErrorCode::SpofDatabase => "SPOF_DATABASE",
            ErrorCode::SpofCache => "SPOF_CACHE",
            ErrorCode::SpofGateway => "SPOF_GATEWAY",
            ErrorCode::SpofQueue => "SPOF_QUEUE",
            ErrorCode::SpofGeneric => "SPOF_GENERIC",
            ErrorCode::AvailTargetUnreachable => "AVAIL_TARGET_UNREACHABLE",
            ErrorCode::AvailCompositeBelowTarget => "AVAIL_COMPOSITE_BELOW_TARGET",
            ErrorCode::AvailNoMultiAz => "AVAIL_NO_MULTI_AZ",
            ErrorCode::AvailNoReplication => "AVAIL_NO_REPLICATION",
            ErrorCode::AvailSingleRegionHighSla => "AVAIL_SINGLE_REGION_HIGH_SLA",
            ErrorCode::CapThroughputExceedsBenchmark => "CAP_THROUGHPUT_EXCEEDS_BENCHMARK",
            ErrorCode::CapNoAutoscaling => "CAP_NO_AUTOSCALING",
            ErrorCode::CapSingleNodeHighRps => "CAP_SINGLE_NODE_HIGH_RPS",
            ErrorCode::CapNoSharding => "CAP_NO_SHARDING",
            ErrorCode::CapHotspotRisk => "CAP_HOTSPOT_RISK",
            ErrorCode::CapNoScalingStrategy => "CAP_NO_SCALING_STRATEGY",
            ErrorCode::ConsistEventualNoJustification => "CONSIST_EVENTUAL_NO_JUSTIFICATION",
            ErrorCode::ConsistStrongMultiRegionLatency => "CONSIST_STRONG_MULTI_REGION_LATENCY",
            ErrorCode::ConsistStrongWithEventualDb => "CONSIST_STRONG_WITH_EVENTUAL_DB",
            ErrorCode::ConsistMissingStrategy => "CONSIST_MISSING_STRATEGY",
            ErrorCode::ContraEventDrivenNoBroker => "CONTRA_EVENT_DRIVEN_NO_BROKER",
            ErrorCode::ContraStrongConsistEventualDb => "CONTRA_STRONG_CONSIST_EVENTUAL_DB",
            ErrorCode::ContraServerlessWithK8s => "CONTRA_SERVERLESS_WITH_K8S",
            ErrorCode::ContraLowLatencyManyHops => "CONTRA_LOW_LATENCY_MANY_HOPS",
            ErrorCode::ContraMultiRegionSingleDeploy => "CONTRA_MULTI_REGION_SINGLE_DEPLOY",
            ErrorCode::ContraStyleMismatch => "CONTRA_STYLE_MISMATCH",
            ErrorCode::ContraStatelessWithLocalState => "CONTRA_STATELESS_WITH_LOCAL_STATE",
            ErrorCode::OpsTooManyServices => "OPS_TOO_MANY_SERVICES",
            ErrorCode::OpsOverEngineered => "OPS_OVER_ENGINEERED",
            ErrorCode::OpsKafkaLowThroughput => "OPS_KAFKA_LOW_THROUGHPUT",
            ErrorCode::OpsMultiRegionMvp => "OPS_MULTI_REGION_MVP",
            ErrorCode::OpsEnterpriseForStartup => "OPS_ENTERPRISE_FOR_STARTUP",
            ErrorCode::MissingAuth => "MISSING_AUTH",
            ErrorCode::MissingAnalytics => "MISSING_ANALYTICS",
            ErrorCode::MissingDr => "MISSING_DR",
            ErrorCode::MissingMonitoring => "MISSING_MONITORING",
            ErrorCode::MissingLogging => "MISSING_LOGGING",
            ErrorCode::MissingRateLimiting => "MISSING_RATE_LIMITING",
            ErrorCode::MissingEncryption => "MISSING_ENCRYPTION",
            ErrorCode::MissingSearch => "MISSING_SEARCH",
            ErrorCode::MissingNotification => "MISSING_NOTIFICATION",
            ErrorCode::MissingCaching => "MISSING_CACHING",
            ErrorCode::Domain(id) => id.as_str(),
        }
    }

    /// Scoring category this code counts against.
    pub fn category(&self) -> Category {
        match self {
            ErrorCode::SpofDatabase
            | ErrorCode::SpofCache
            | ErrorCode::SpofGateway
            | ErrorCode::SpofQueue
            | ErrorCode::SpofGeneric
            | ErrorCode::AvailTargetUnreachable
            | ErrorCode::AvailCompositeBelowTarget
            | ErrorCode::AvailNoMultiAz
            | ErrorCode::AvailNoReplication
            | ErrorCode::AvailSingleRegionHighSla
            | ErrorCode::MissingDr
            | ErrorCode::SchemaMissingField
            | ErrorCode::SchemaInvalidType
            | ErrorCode::SchemaInvalidValue
            | ErrorCode::SchemaEmptyComponents => Category::Reliability,

            ErrorCode::CapThroughputExceedsBenchmark
            | ErrorCode::CapNoAutoscaling
            | ErrorCode::CapSingleNodeHighRps
            | ErrorCode::CapNoSharding
            | ErrorCode::CapHotspotRisk
            | ErrorCode::CapNoScalingStrategy
            | ErrorCode::MissingCaching => Category::Scalability,

            ErrorCode::ConsistEventualNoJustification
            | ErrorCode::ConsistStrongMultiRegionLatency
            | ErrorCode::ConsistStrongWithEventualDb
            | ErrorCode::ConsistMissingStrategy
            | ErrorCode::ContraEventDrivenNoBroker
            | ErrorCode::ContraStrongConsistEventualDb
            | ErrorCode::ContraServerlessWithK8s
            | ErrorCode::ContraLowLatencyManyHops
            | ErrorCode::ContraMultiRegionSingleDeploy
            | ErrorCode::ContraStyleMismatch
            | ErrorCode::ContraStatelessWithLocalState => Category::Consistency,

            ErrorCode::MissingAuth
            | ErrorCode::MissingEncryption
            | ErrorCode::MissingRateLimiting => Category::Security,

            ErrorCode::OpsTooManyServices
            | ErrorCode::OpsOverEngineered
            | ErrorCode::OpsKafkaLowThroughput
            | ErrorCode::OpsMultiRegionMvp
            | ErrorCode::OpsEnterpriseForStartup
            | ErrorCode::MissingAnalytics
            | ErrorCode::MissingMonitoring
            | ErrorCode::MissingLogging
            | ErrorCode::MissingSearch
            | ErrorCode::MissingNotification
            | ErrorCode::Domain(_) => Category::Operational,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CodeVisitor;
        impl Visitor<'_> for CodeVisitor {
            type Value = ErrorCode;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an error code string")
            }
            fn visit_str<E: de::Error>(self, value: &str) -> Result<ErrorCode, E> {
                Ok(ErrorCode::from_code_str(value))
            }
        }
        deserializer.deserialize_str(CodeVisitor)
    }
}

impl ErrorCode {
    fn from_code_str(value: &str) -> ErrorCode {
        match value {
            "SCHEMA_MISSING_FIELD" => ErrorCode::SchemaMissingField,
            "SCHEMA_INVALID_TYPE" => ErrorCode::SchemaInvalidType,
            "SCHEMA_INVALID_VALUE" => ErrorCode::SchemaInvalidValue,
            "SCHEMA_EMPTY_COMPONENTS" => ErrorCode::SchemaEmptyComponents,
            "SPOF_DATABASE" => ErrorCode::SpofDatabase,
            "SPOF_CACHE" => ErrorCode::SpofCache,
            "SPOF_GATEWAY" => ErrorCode::SpofGateway,
            "SPOF_QUEUE" => ErrorCode::SpofQueue,
            "SPOF_GENERIC" => ErrorCode::SpofGeneric,
            "AVAIL_TARGET_UNREACHABLE" => ErrorCode::AvailTargetUnreachable,
            "AVAIL_COMPOSITE_BELOW_TARGET" => ErrorCode::AvailCompositeBelowTarget,
            "AVAIL_NO_MULTI_AZ" => ErrorCode::AvailNoMultiAz,
            "AVAIL_NO_REPLICATION" => ErrorCode::AvailNoReplication,
            "AVAIL_SINGLE_REGION_HIGH_SLA" => ErrorCode::AvailSingleRegionHighSla,
            "CAP_THROUGHPUT_EXCEEDS_BENCHMARK" => ErrorCode::CapThroughputExceedsBenchmark,
            "CAP_NO_AUTOSCALING" => ErrorCode::CapNoAutoscaling,
            "CAP_SINGLE_NODE_HIGH_RPS" => ErrorCode::CapSingleNodeHighRps,
            "CAP_NO_SHARDING" => ErrorCode::CapNoSharding,
            "CAP_HOTSPOT_RISK" => ErrorCode::CapHotspotRisk,
            "CAP_NO_SCALING_STRATEGY" => ErrorCode::CapNoScalingStrategy,
            "CONSIST_EVENTUAL_NO_JUSTIFICATION" => ErrorCode::ConsistEventualNoJustification,
            "CONSIST_STRONG_MULTI_REGION_LATENCY" => ErrorCode::ConsistStrongMultiRegionLatency,
            "CONSIST_STRONG_WITH_EVENTUAL_DB" => ErrorCode::ConsistStrongWithEventualDb,
            "CONSIST_MISSING_STRATEGY" => ErrorCode::ConsistMissingStrategy,
            "CONTRA_EVENT_DRIVEN_NO_BROKER" => ErrorCode::ContraEventDrivenNoBroker,
            "CONTRA_STRONG_CONSIST_EVENTUAL_DB" => ErrorCode::ContraStrongConsistEventualDb,
            "CONTRA_SERVERLESS_WITH_K8S" => ErrorCode::ContraServerlessWithK8s,
            "CONTRA_LOW_LATENCY_MANY_HOPS" => ErrorCode::ContraLowLatencyManyHops,
            "CONTRA_MULTI_REGION_SINGLE_DEPLOY" => ErrorCode::ContraMultiRegionSingleDeploy,
            "CONTRA_STYLE_MISMATCH" => ErrorCode::ContraStyleMismatch,
            "CONTRA_STATELESS_WITH_LOCAL_STATE" => ErrorCode::ContraStatelessWithLocalState,
            "OPS_TOO_MANY_SERVICES" => ErrorCode::OpsTooManyServices,
            "OPS_OVER_ENGINEERED" => ErrorCode::OpsOverEngineered,
            "OPS_KAFKA_LOW_THROUGHPUT" => ErrorCode::OpsKafkaLowThroughput,
            "OPS_MULTI_REGION_MVP" => ErrorCode::OpsMultiRegionMvp,
            "OPS_ENTERPRISE_FOR_STARTUP" => ErrorCode::OpsEnterpriseForStartup,
            "MISSING_AUTH" => ErrorCode::MissingAuth,
            "MISSING_ANALYTICS" => ErrorCode::MissingAnalytics,
            "MISSING_DR" => ErrorCode::MissingDr,
            "MISSING_MONITORING" => ErrorCode::MissingMonitoring,
            "MISSING_LOGGING" => ErrorCode::MissingLogging,
            "MISSING_RATE_LIMITING" => ErrorCode::MissingRateLimiting,
            "MISSING_ENCRYPTION" => ErrorCode::MissingEncryption,
            "MISSING_SEARCH" => ErrorCode::MissingSearch,
            "MISSING_NOTIFICATION" => ErrorCode::MissingNotification,
            "MISSING_CACHING" => ErrorCode::MissingCaching,
            other => ErrorCode::Domain(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Reliability,
    Scalability,
    Consistency,
    Security,
    Operational,
}

impl Category {
    /// Maximum points this category contributes to the 0-100 score.
    pub fn cap(self) -> f64 {
        match self {
            Category::Reliability => 30.0,
            Category::Scalability => 25.0,
            Category::Consistency => 15.0,
            Category::Security => 15.0,
            Category::Operational => 15.0,
        }
    }

    /// Penalty subtracted from the category for one finding of `severity`.
    pub fn penalty(self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => match self {
                Category::Reliability => 15.0,
                Category::Scalability => 12.0,
                _ => 8.0,
            },
            Severity::High => match self {
                Category::Reliability => 8.0,
                Category::Scalability => 6.0,
                _ => 5.0,
            },
            Severity::Medium => match self {
                Category::Reliability => 4.0,
                _ => 3.0,
            },
            Severity::Low => 1.0,
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ValidationError {
    pub fn new(code: ErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            component: None,
            field: None,
            suggestion: None,
            evidence: None,
            category: None,
        }
    }

    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Per-category score. Each category starts at its cap and penalties are
/// subtracted, clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub reliability: f64,
    pub scalability: f64,
    pub consistency: f64,
    pub security: f64,
    pub operational: f64,
}

impl Default for ScoreBreakdown {
    fn default() -> Self {
        Self {
            reliability: Category::Reliability.cap(),
            scalability: Category::Scalability.cap(),
            consistency: Category::Consistency.cap(),
            security: Category::Security.cap(),
            operational: Category::Operational.cap(),
        }
    }
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        (self.reliability + self.scalability + self.consistency + self.security + self.operational)
            .max(0.0)
    }

    fn apply_penalty(&mut self, category: Category, penalty: f64) {
        let slot = match category {
            Category::Reliability => &mut self.reliability,
            Category::Scalability => &mut self.scalability,
            Category::Consistency => &mut self.consistency,
            Category::Security => &mut self.security,
            Category::Operational => &mut self.operational,
        };
        *slot = (*slot - penalty).max(0.0);
    }
}

/// Counts of findings by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Complete validation report, the output of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when there are no critical findings and the score is >= 60.
    pub passed: bool,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub summary: SeveritySummary,
    pub errors: Vec<ValidationError>,
    pub verdict: String,
}

pub const PASS_SCORE_THRESHOLD: f64 = 60.0;

impl ValidationReport {
    pub fn build(mut errors: Vec<ValidationError>) -> Self {
        let mut summary = SeveritySummary::default();
        for err in &errors {
            match err.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }

        let mut breakdown = ScoreBreakdown::default();
        for err in &errors {
            let category = err.code.category();
            breakdown.apply_penalty(category, category.penalty(err.severity));
        }

        let score = (breakdown.total() * 10.0).round() / 10.0;
        let passed = summary.critical == 0 && score >= PASS_SCORE_THRESHOLD;

        let verdict = if passed && score >= 80.0 {
            format!("PASS — Strong design (score: {score:.0}/100). Ready for review.")
        } else if passed {
            format!(
                "PASS — Acceptable design (score: {score:.0}/100) with {} high-severity findings to address.",
                summary.high
            )
        } else if summary.critical > 0 {
            format!(
                "FAIL — {} critical issue(s) must be resolved before review. Score: {score:.0}/100.",
                summary.critical
            )
        } else {
            format!("FAIL — Score {score:.0}/100 is below threshold (60). Address high-severity findings.")
        };

        errors.sort_by_key(|e| e.severity);

        Self {
            passed,
            score,
            score_breakdown: breakdown,
            summary,
            errors,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(code: ErrorCode, severity: Severity) -> ValidationError {
        ValidationError::new(code, severity, "finding")
    }

    #[test]
    fn empty_report_passes_with_full_score() {
        let report = ValidationReport::build(Vec::new());
        assert!(report.passed);
        assert_eq!(report.score, 100.0);
        assert!(report.verdict.starts_with("PASS"));
    }

    #[test]
    fn adding_an_error_never_increases_score() {
        let codes = [
            ErrorCode::SpofDatabase,
            ErrorCode::CapNoAutoscaling,
            ErrorCode::ConsistMissingStrategy,
            ErrorCode::MissingAuth,
            ErrorCode::OpsKafkaLowThroughput,
        ];
        let severities = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];
        let mut errors = Vec::new();
        let mut previous = ValidationReport::build(errors.clone()).score;
        for code in &codes {
            for severity in severities {
                errors.push(err(code.clone(), severity));
                let score = ValidationReport::build(errors.clone()).score;
                assert!(score <= previous, "score increased after adding an error");
                previous = score;
            }
        }
    }

    #[test]
    fn critical_strictly_decreases_category_unless_exhausted() {
        let before = ValidationReport::build(vec![]);
        let after = ValidationReport::build(vec![err(ErrorCode::SpofDatabase, Severity::Critical)]);
        assert!(after.score_breakdown.reliability < before.score_breakdown.reliability);

        // Drain reliability entirely, then one more critical changes nothing.
        let drained: Vec<_> = (0..10)
            .map(|_| err(ErrorCode::SpofDatabase, Severity::Critical))
            .collect();
        let report = ValidationReport::build(drained.clone());
        assert_eq!(report.score_breakdown.reliability, 0.0);
        let mut one_more = drained;
        one_more.push(err(ErrorCode::SpofGateway, Severity::Critical));
        assert_eq!(
            ValidationReport::build(one_more).score_breakdown.reliability,
            0.0
        );
    }

    #[test]
    fn pass_gate_requires_zero_criticals_and_score_threshold() {
        // A single critical fails even though the score stays high.
        let report = ValidationReport::build(vec![err(ErrorCode::SpofDatabase, Severity::Critical)]);
        assert!(!report.passed);
        assert!(report.score >= PASS_SCORE_THRESHOLD);

        // Many mediums with no criticals fail purely on the score.
        let mut errors = Vec::new();
        for _ in 0..6 {
            errors.push(err(ErrorCode::CapNoScalingStrategy, Severity::High));
            errors.push(err(ErrorCode::AvailNoReplication, Severity::High));
            errors.push(err(ErrorCode::ConsistMissingStrategy, Severity::Medium));
            errors.push(err(ErrorCode::MissingAuth, Severity::High));
            errors.push(err(ErrorCode::OpsTooManyServices, Severity::High));
        }
        let report = ValidationReport::build(errors);
        assert_eq!(report.summary.critical, 0);
        assert!(report.score < PASS_SCORE_THRESHOLD);
        assert!(!report.passed);
    }

    #[test]
    fn errors_are_sorted_by_severity() {
        let report = ValidationReport::build(vec![
            err(ErrorCode::ConsistMissingStrategy, Severity::Medium),
            err(ErrorCode::SpofDatabase, Severity::Critical),
            err(ErrorCode::AvailNoReplication, Severity::High),
        ]);
        let severities: Vec<_> = report.errors.iter().map(|e| e.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::High, Severity::Medium]
        );
    }

    #[test]
    fn domain_codes_round_trip_through_serde() {
        let code = ErrorCode::Domain("PAYMENTS_NO_IDEMPOTENCY".to_string());
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"PAYMENTS_NO_IDEMPOTENCY\"");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);

        let known: ErrorCode = serde_json::from_str("\"SPOF_DATABASE\"").unwrap();
        assert_eq!(known, ErrorCode::SpofDatabase);
    }
}
