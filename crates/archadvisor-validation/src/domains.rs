//! Domain rule files and the keyword-scoring domain detector.
//!
//! Rule files are embedded JSON, parsed once into a process-wide cache. A
//! domain wins when its keyword list scores the most hits against the
//! requirements text, with a minimum of two hits to avoid false positives.

use std::sync::OnceLock;

use serde::Deserialize;

const RULE_FILES: &[&str] = &[
    include_str!("domains/url_shortener.json"),
    include_str!("domains/payments.json"),
    include_str!("domains/chat_messaging.json"),
    include_str!("domains/ecommerce.json"),
    include_str!("domains/video_streaming.json"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct DomainRules {
    pub domain: String,
    pub display_name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub mandatory_patterns: Vec<PatternRule>,
    #[serde(default)]
    pub recommended_patterns: Vec<PatternRule>,
    #[serde(default)]
    pub anti_patterns: Vec<PatternRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternRule {
    pub id: String,
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_check")]
    pub check: PatternCheck,
    pub terms: Vec<String>,
}

fn default_check() -> PatternCheck {
    PatternCheck::DesignMentionsAny
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCheck {
    /// Any term appears anywhere in the flattened design text.
    DesignMentionsAny,
    /// Any term appears in component names, responsibilities, tech stacks,
    /// or scaling strategies.
    ComponentOrTechMentionsAny,
    /// Any term matches a component's type, name, or tech stack entry.
    ComponentTypeExists,
}

fn all_domains() -> &'static [DomainRules] {
    static CACHE: OnceLock<Vec<DomainRules>> = OnceLock::new();
    CACHE.get_or_init(|| {
        RULE_FILES
            .iter()
            .filter_map(|raw| match serde_json::from_str::<DomainRules>(raw) {
                Ok(domain) => Some(domain),
                Err(err) => {
                    tracing::error!(error = %err, "domain rule file failed to parse");
                    None
                }
            })
            .collect()
    })
}

/// Keyword-frequency scoring over all domains; the best domain wins if it
/// scores at least two hits.
pub fn detect_domain(requirements: &str) -> Option<&'static DomainRules> {
    if requirements.is_empty() {
        return None;
    }
    let req_lower = requirements.to_lowercase();

    let mut best: Option<(&DomainRules, usize)> = None;
    for domain in all_domains() {
        let score = domain
            .keywords
            .iter()
            .filter(|kw| req_lower.contains(&kw.to_lowercase()))
            .count();
        if score > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((domain, score));
        }
    }

    best.filter(|(_, score)| *score >= 2).map(|(domain, _)| domain)
}

pub fn domain_names() -> Vec<&'static str> {
    all_domains().iter().map(|d| d.domain.as_str()).collect()
}
