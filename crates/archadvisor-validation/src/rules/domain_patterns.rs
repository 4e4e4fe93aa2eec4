//! Domain-specific pattern checks. Detects the dominant domain from the
//! requirements and verifies mandatory/recommended patterns are present and
//! anti-patterns are absent.

use serde_json::Value;

use crate::design::{Component, Design};
use crate::domains::{detect_domain, DomainRules, PatternCheck, PatternRule};
use crate::models::{ErrorCode, Severity, ValidationError};
use crate::rules::Rule;

pub struct DomainPatternRule;

impl Rule for DomainPatternRule {
    fn name(&self) -> &'static str {
        "domain_patterns"
    }

    fn validate(&self, design: &Value, requirements: &str) -> Vec<ValidationError> {
        let Some(domain) = detect_domain(requirements) else {
            return Vec::new();
        };

        let view = Design::new(design);
        let design_text = view.flat_text();
        let components = view.components();
        let mut errors = Vec::new();

        // Mandatory and recommended patterns flag when MISSING.
        for pattern in domain
            .mandatory_patterns
            .iter()
            .chain(domain.recommended_patterns.iter())
        {
            if !pattern_matches(pattern, &design_text, &components) {
                errors.push(pattern_error(pattern, domain));
            }
        }

        // Anti-patterns flag when FOUND.
        for pattern in &domain.anti_patterns {
            if pattern_matches(pattern, &design_text, &components) {
                errors.push(pattern_error(pattern, domain));
            }
        }

        errors
    }
}

/// Whether any of the pattern's terms is present, by the pattern's check
/// strategy. Term matching is case-insensitive substring search.
fn pattern_matches(pattern: &PatternRule, design_text: &str, components: &[Component<'_>]) -> bool {
    match pattern.check {
        PatternCheck::DesignMentionsAny => pattern
            .terms
            .iter()
            .any(|term| design_text.contains(&term.to_lowercase())),
        PatternCheck::ComponentOrTechMentionsAny => {
            let mut searchable = String::new();
            for comp in components {
                searchable.push(' ');
                searchable.push_str(&comp.name().to_lowercase());
                searchable.push(' ');
                searchable.push_str(&comp.responsibility().to_lowercase());
                searchable.push(' ');
                searchable.push_str(&comp.kind());
                searchable.push(' ');
                searchable.push_str(&comp.tech_stack().join(" "));
                searchable.push(' ');
                searchable.push_str(&comp.scaling_strategy());
            }
            pattern
                .terms
                .iter()
                .any(|term| searchable.contains(&term.to_lowercase()))
        }
        PatternCheck::ComponentTypeExists => components.iter().any(|comp| {
            let kind = comp.kind();
            let name = comp.name().to_lowercase();
            let techs = comp.tech_stack();
            pattern.terms.iter().any(|term| {
                let term = term.to_lowercase();
                kind.contains(&term)
                    || name.contains(&term)
                    || techs.iter().any(|tech| tech.contains(&term))
            })
        }),
    }
}

fn pattern_error(pattern: &PatternRule, domain: &DomainRules) -> ValidationError {
    let severity = match pattern.severity.to_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" | "warning" => Severity::High,
        "low" | "info" => Severity::Low,
        _ => Severity::Medium,
    };
    let mut error = ValidationError::new(
        ErrorCode::Domain(pattern.id.clone()),
        severity,
        pattern.message.clone(),
    )
    .evidence(format!("Domain: {}", domain.display_name));
    error.category = Some("domain_pattern".to_string());
    if let Some(description) = &pattern.description {
        error = error.suggestion(description.clone());
    }
    error
}
