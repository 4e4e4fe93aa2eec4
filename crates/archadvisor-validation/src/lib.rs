//! Deterministic design validation: a chain of independent rules over the
//! architecture JSON, composed into a weighted score and pass/fail verdict.
//!
//! The engine is the quality gate in the workflow. Same input, same report;
//! no LLM calls, no I/O, a full run completes in a few milliseconds.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde_json::Value;

pub mod design;
pub mod domains;
pub mod models;
pub mod reference;
pub mod rules;

pub use models::{
    ErrorCode, ScoreBreakdown, Severity, SeveritySummary, ValidationError, ValidationReport,
};
use rules::Rule;

pub struct ValidationEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self {
            rules: rules::default_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Run every rule against the design and build the report.
    pub fn validate(&self, design: &Value, requirements: &str) -> ValidationReport {
        let started = Instant::now();
        let mut errors = Vec::new();

        for rule in &self.rules {
            let rule_started = Instant::now();
            // One broken rule must not kill the chain; record it and move on.
            match catch_unwind(AssertUnwindSafe(|| rule.validate(design, requirements))) {
                Ok(found) => errors.extend(found),
                Err(_) => {
                    tracing::error!(rule = rule.name(), "validation rule panicked");
                    errors.push(ValidationError::new(
                        ErrorCode::SchemaInvalidType,
                        Severity::Medium,
                        format!("Validator '{}' crashed", rule.name()),
                    ));
                }
            }
            tracing::debug!(
                rule = rule.name(),
                duration_ms = rule_started.elapsed().as_millis() as u64,
                "rule_complete"
            );
        }

        let report = ValidationReport::build(errors);
        tracing::info!(
            passed = report.passed,
            score = report.score,
            critical = report.summary.critical,
            high = report.summary.high,
            duration_ms = started.elapsed().as_millis() as u64,
            "validation_complete"
        );
        report
    }

    /// Validate a raw JSON string; an unparseable design is itself a
    /// critical schema finding.
    pub fn validate_str(&self, design: &str, requirements: &str) -> ValidationReport {
        match serde_json::from_str::<Value>(design) {
            Ok(value) => self.validate(&value, requirements),
            Err(err) => ValidationReport::build(vec![
                ValidationError::new(
                    ErrorCode::SchemaInvalidType,
                    Severity::Critical,
                    format!("Cannot parse architecture JSON: {err}"),
                )
                .suggestion("Ensure the architecture output is valid JSON"),
            ]),
        }
    }

    /// Validate with awareness of the previous round: critical codes present
    /// in both runs are called out in the verdict as persistent.
    pub fn validate_with_context(
        &self,
        design: &str,
        requirements: &str,
        previous: Option<&ValidationReport>,
    ) -> ValidationReport {
        let mut report = self.validate_str(design, requirements);

        if let Some(previous) = previous {
            let recurring: Vec<&str> = previous
                .errors
                .iter()
                .filter(|e| e.severity == Severity::Critical)
                .map(|e| e.code.as_str())
                .filter(|code| {
                    report
                        .errors
                        .iter()
                        .any(|e| e.severity == Severity::Critical && e.code.as_str() == *code)
                })
                .collect();
            if !recurring.is_empty() {
                let mut unique = recurring;
                unique.sort_unstable();
                unique.dedup();
                report.verdict.push_str(&format!(
                    " WARNING: {} critical issue(s) persist from previous revision: {}",
                    unique.len(),
                    unique.join(", ")
                ));
            }
        }

        report
    }
}
