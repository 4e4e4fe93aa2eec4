//! The validation rule set. Each rule is a pure function of
//! `(design, requirements) -> findings`; the engine composes results and no
//! rule sees another rule's output.

use serde_json::Value;

use crate::models::ValidationError;

mod availability;
mod capacity;
mod consistency;
mod contradiction;
mod domain_patterns;
mod missing_requirements;
mod operational;
mod schema;

pub use availability::AvailabilityRule;
pub use capacity::CapacityRule;
pub use consistency::ConsistencyRule;
pub use contradiction::ContradictionRule;
pub use domain_patterns::DomainPatternRule;
pub use missing_requirements::MissingRequirementRule;
pub use operational::OperationalComplexityRule;
pub use schema::SchemaRule;

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deterministic, bounded to a few milliseconds, no I/O.
    fn validate(&self, design: &Value, requirements: &str) -> Vec<ValidationError>;
}

/// Default rule chain in execution order. Schema runs first; the others
/// tolerate whatever shape survived it.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(SchemaRule),
        Box::new(AvailabilityRule),
        Box::new(CapacityRule),
        Box::new(ConsistencyRule),
        Box::new(ContradictionRule),
        Box::new(OperationalComplexityRule),
        Box::new(MissingRequirementRule),
        Box::new(DomainPatternRule),
    ]
}
