//! Structural integrity of the architecture JSON: required fields, known
//! values, parseable targets.

use serde_json::Value;

use crate::design::{parse_availability, Design};
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::rules::Rule;

const REQUIRED_KEYS: &[&str] = &[
    "overview",
    "architecture_style",
    "components",
    "non_functional",
    "tech_decisions",
    "deployment",
];

const VALID_STYLES: &[&str] = &[
    "microservices",
    "event-driven",
    "event_driven",
    "monolith",
    "serverless",
    "hybrid",
    "modular_monolith",
];

const VALID_CONSISTENCY: &[&str] = &["strong", "eventual", "causal"];

pub struct SchemaRule;

impl Rule for SchemaRule {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, design: &Value, _requirements: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let view = Design::new(design);

        for key in REQUIRED_KEYS {
            if !view.has_field(key) {
                errors.push(
                    ValidationError::new(
                        ErrorCode::SchemaMissingField,
                        Severity::Critical,
                        format!("Required field '{key}' is missing from architecture design"),
                    )
                    .field(*key)
                    .suggestion(format!("Add '{key}' to the architecture JSON")),
                );
            }
        }

        match design.get("components") {
            None => {}
            Some(Value::Array(items)) if items.is_empty() => {
                errors.push(
                    ValidationError::new(
                        ErrorCode::SchemaEmptyComponents,
                        Severity::Critical,
                        "'components' list is empty — no architecture components defined",
                    )
                    .field("components")
                    .suggestion("Define at least one component in the architecture"),
                );
            }
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_object() {
                        continue;
                    }
                    for required in ["name", "type", "responsibility"] {
                        if item.get(required).is_none() {
                            let name = item
                                .get("name")
                                .and_then(Value::as_str)
                                .map(str::to_string)
                                .unwrap_or_else(|| format!("Component #{}", i + 1));
                            errors.push(
                                ValidationError::new(
                                    ErrorCode::SchemaMissingField,
                                    Severity::High,
                                    format!("Component #{} is missing '{required}'", i + 1),
                                )
                                .component(name)
                                .field(format!("components[{i}].{required}")),
                            );
                        }
                    }
                }
            }
            Some(_) => {
                errors.push(
                    ValidationError::new(
                        ErrorCode::SchemaInvalidType,
                        Severity::Critical,
                        "'components' must be a list",
                    )
                    .field("components"),
                );
            }
        }

        let style = view.architecture_style();
        if !style.is_empty() && !VALID_STYLES.contains(&style.replace(' ', "_").as_str()) {
            errors.push(
                ValidationError::new(
                    ErrorCode::SchemaInvalidValue,
                    Severity::Medium,
                    format!("Architecture style '{style}' is not a recognized pattern"),
                )
                .field("architecture_style")
                .suggestion(format!("Use one of: {}", VALID_STYLES.join(", "))),
            );
        }

        let nf = view.non_functional();
        if nf.is_object() {
            if let Some(raw) = nf.get("availability_target") {
                let has_text = raw.as_str().map(|s| !s.is_empty()).unwrap_or(raw.is_number());
                if has_text {
                    match parse_availability(raw) {
                        None => errors.push(
                            ValidationError::new(
                                ErrorCode::SchemaInvalidValue,
                                Severity::Medium,
                                format!("Cannot parse availability target: '{raw}'"),
                            )
                            .field("non_functional.availability_target")
                            .suggestion("Use format like '99.99%' or '99.9%'"),
                        ),
                        Some(parsed) if !(90.0..=99.9999).contains(&parsed) => errors.push(
                            ValidationError::new(
                                ErrorCode::SchemaInvalidValue,
                                Severity::Medium,
                                format!(
                                    "Availability target {raw} is outside realistic range (90% - 99.9999%)"
                                ),
                            )
                            .field("non_functional.availability_target"),
                        ),
                        Some(_) => {}
                    }
                }
            }

            let consistency = view.data_consistency();
            if !consistency.is_empty() && !VALID_CONSISTENCY.contains(&consistency.as_str()) {
                errors.push(
                    ValidationError::new(
                        ErrorCode::SchemaInvalidValue,
                        Severity::Medium,
                        format!("Data consistency model '{consistency}' is not recognized"),
                    )
                    .field("non_functional.data_consistency")
                    .suggestion(format!("Use one of: {}", VALID_CONSISTENCY.join(", "))),
                );
            }
        }

        for (i, decision) in view.tech_decisions().iter().enumerate() {
            if !decision.is_object() {
                continue;
            }
            let reasoning = decision.get("reasoning").and_then(Value::as_str).unwrap_or("");
            if reasoning.is_empty() {
                let label = decision
                    .get("decision")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                errors.push(
                    ValidationError::new(
                        ErrorCode::SchemaMissingField,
                        Severity::Low,
                        format!("Tech decision #{} '{label}' has no reasoning", i + 1),
                    )
                    .field(format!("tech_decisions[{i}].reasoning"))
                    .suggestion("Always justify technology choices"),
                );
            }
        }

        errors
    }
}
