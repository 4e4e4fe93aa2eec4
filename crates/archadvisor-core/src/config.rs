//! Runtime configuration from environment variables.
//!
//! Everything has a workable default so the engine boots with nothing set;
//! only the provider API key is genuinely deployment-specific.

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub redis_url: String,

    // LLM transport
    pub provider_base_url: String,
    pub provider_api_key: Option<String>,

    // Per-role model ids
    pub architect_model: String,
    pub devils_advocate_model: String,
    pub cost_analyzer_model: String,
    pub documentation_model: String,

    /// Default debate rounds when the request leaves it unset. Bounded to [1, 5].
    pub max_debate_rounds: u32,

    pub rate_limit_max_sessions: u32,
    pub rate_limit_window_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            redis_url: "redis://localhost:6379/0".to_string(),
            provider_base_url: "https://api.openai.com/v1".to_string(),
            provider_api_key: None,
            architect_model: "gpt-4o".to_string(),
            devils_advocate_model: "gpt-4o".to_string(),
            cost_analyzer_model: "gpt-4o-mini".to_string(),
            documentation_model: "gpt-4o".to_string(),
            max_debate_rounds: 3,
            rate_limit_max_sessions: 10,
            rate_limit_window_seconds: 3600,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; `from_env` is the thin
    /// wrapper over the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();
        let string = |name: &str, default: String| lookup(name).unwrap_or(default);

        Self {
            host: string("HOST", defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            redis_url: string("REDIS_URL", defaults.redis_url),
            provider_base_url: string("PROVIDER_BASE_URL", defaults.provider_base_url),
            provider_api_key: lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()),
            architect_model: string("ARCHITECT_MODEL", defaults.architect_model),
            devils_advocate_model: string("DEVILS_ADVOCATE_MODEL", defaults.devils_advocate_model),
            cost_analyzer_model: string("COST_ANALYZER_MODEL", defaults.cost_analyzer_model),
            documentation_model: string("DOCUMENTATION_MODEL", defaults.documentation_model),
            max_debate_rounds: parse_or(&lookup, "MAX_DEBATE_ROUNDS", defaults.max_debate_rounds)
                .clamp(1, 5),
            rate_limit_max_sessions: parse_or(
                &lookup,
                "RATE_LIMIT_MAX_SESSIONS",
                defaults.rate_limit_max_sessions,
            ),
            rate_limit_window_seconds: parse_or(
                &lookup,
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.rate_limit_window_seconds,
            ),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    lookup(name)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.max_debate_rounds, 3);
        assert_eq!(settings.rate_limit_max_sessions, 10);
        assert_eq!(settings.rate_limit_window_seconds, 3600);
        assert!(settings.provider_api_key.is_none());
    }

    #[test]
    fn values_parse_from_the_environment() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("PORT", "9001"),
            ("MAX_DEBATE_ROUNDS", "4"),
            ("ARCHITECT_MODEL", "gpt-4o-mini"),
            ("OPENAI_API_KEY", "sk-test"),
        ]));
        assert_eq!(settings.port, 9001);
        assert_eq!(settings.max_debate_rounds, 4);
        assert_eq!(settings.architect_model, "gpt-4o-mini");
        assert_eq!(settings.provider_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn debate_rounds_clamp_to_bounds() {
        let high = Settings::from_lookup(lookup_from(&[("MAX_DEBATE_ROUNDS", "12")]));
        assert_eq!(high.max_debate_rounds, 5);
        let low = Settings::from_lookup(lookup_from(&[("MAX_DEBATE_ROUNDS", "0")]));
        assert_eq!(low.max_debate_rounds, 1);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[("PORT", "not-a-port")]));
        assert_eq!(settings.port, 8000);
    }
}
