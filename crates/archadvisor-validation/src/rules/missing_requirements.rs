//! Cross-checks the user's requirements against the architecture: a
//! capability the requirements mention must show up somewhere in the design.

use serde_json::Value;

use crate::design::Design;
use crate::models::ValidationError;
use crate::reference::requirement_checks;
use crate::rules::Rule;

pub struct MissingRequirementRule;

impl Rule for MissingRequirementRule {
    fn name(&self) -> &'static str {
        "missing_requirements"
    }

    fn validate(&self, design: &Value, requirements: &str) -> Vec<ValidationError> {
        if requirements.is_empty() {
            return Vec::new();
        }

        let view = Design::new(design);
        let req_lower = requirements.to_lowercase();
        let flat_design = view.flat_text();
        let mut errors = Vec::new();

        for check in requirement_checks() {
            let Some(matched) = check
                .keywords
                .iter()
                .find(|kw| req_lower.contains(&kw.to_lowercase()))
            else {
                continue;
            };

            let mut addressed = check
                .keywords
                .iter()
                .any(|kw| flat_design.contains(&kw.to_lowercase()));

            // Component names and responsibilities count as addressing it.
            if !addressed {
                addressed = view.components().iter().any(|comp| {
                    let text = format!(
                        "{} {} {}",
                        comp.name(),
                        comp.responsibility(),
                        comp.tech_stack().join(" ")
                    )
                    .to_lowercase();
                    check.keywords.iter().any(|kw| text.contains(&kw.to_lowercase()))
                });
            }

            // As do the NFR, deployment, and tech decision sections.
            if !addressed {
                let combined = format!(
                    "{} {} {}",
                    view.non_functional(),
                    view.deployment(),
                    Value::Array(view.tech_decisions().into_iter().cloned().collect())
                )
                .to_lowercase();
                addressed = check.keywords.iter().any(|kw| combined.contains(&kw.to_lowercase()));
            }

            if !addressed {
                errors.push(
                    ValidationError::new(
                        check.code.clone(),
                        check.severity,
                        format!(
                            "Requirements mention '{matched}' but architecture has no corresponding component or strategy"
                        ),
                    )
                    .suggestion(format!(
                        "Add a {} component or address {} in the architecture",
                        check.name, check.name
                    ))
                    .evidence(format!(
                        "Keyword '{matched}' found in requirements but not in design"
                    )),
                );
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorCode, Severity};
    use serde_json::json;

    #[test]
    fn requested_auth_without_coverage_is_high() {
        let design = json!({
            "components": [{"name": "Orders", "type": "service", "responsibility": "orders"}]
        });
        let errors =
            MissingRequirementRule.validate(&design, "Users must login with OAuth before ordering");
        let finding = errors
            .iter()
            .find(|e| e.code == ErrorCode::MissingAuth)
            .expect("auth finding");
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn auth_component_satisfies_the_requirement() {
        let design = json!({
            "components": [
                {"name": "Identity Service", "type": "service",
                 "responsibility": "OAuth login and JWT issuance"}
            ]
        });
        let errors =
            MissingRequirementRule.validate(&design, "Users must login with OAuth before ordering");
        assert!(!errors.iter().any(|e| e.code == ErrorCode::MissingAuth));
    }

    #[test]
    fn coverage_in_non_functional_section_counts() {
        let design = json!({
            "components": [{"name": "API", "type": "service", "responsibility": "api"}],
            "non_functional": {"disaster_recovery": "RPO 5m, RTO 30m with cross-region backup"}
        });
        let errors = MissingRequirementRule
            .validate(&design, "We need disaster recovery with defined RPO and RTO");
        assert!(!errors.iter().any(|e| e.code == ErrorCode::MissingDr));
    }

    #[test]
    fn unmentioned_capabilities_are_not_required() {
        let design = json!({"components": []});
        let errors = MissingRequirementRule.validate(&design, "A plain batch import tool");
        assert!(errors.is_empty());
    }

    #[test]
    fn empty_requirements_produce_no_findings() {
        let errors = MissingRequirementRule.validate(&json!({}), "");
        assert!(errors.is_empty());
    }
}
