//! Read-only view over the architecture JSON produced by the architect.
//!
//! The artifact is model-generated, so fields may be missing or carry odd
//! shapes; every accessor degrades to an empty value instead of failing.

use serde_json::Value;

pub struct Design<'a> {
    raw: &'a Value,
}

impl<'a> Design<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.raw.get(key).is_some()
    }

    pub fn architecture_style(&self) -> String {
        self.raw
            .get("architecture_style")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn components(&self) -> Vec<Component<'a>> {
        self.raw
            .get("components")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Component::new).collect())
            .unwrap_or_default()
    }

    pub fn non_functional(&self) -> &'a Value {
        self.raw.get("non_functional").unwrap_or(&Value::Null)
    }

    pub fn deployment(&self) -> &'a Value {
        self.raw.get("deployment").unwrap_or(&Value::Null)
    }

    pub fn deployment_regions(&self) -> Vec<String> {
        self.deployment()
            .get("regions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tech_decisions(&self) -> Vec<&'a Value> {
        self.raw
            .get("tech_decisions")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default()
    }

    pub fn data_consistency(&self) -> String {
        self.non_functional()
            .get("data_consistency")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    pub fn availability_target(&self) -> Option<f64> {
        parse_availability(self.non_functional().get("availability_target").unwrap_or(&Value::Null))
    }

    pub fn declared_throughput(&self) -> Option<u64> {
        parse_throughput(self.non_functional().get("throughput").unwrap_or(&Value::Null))
    }

    /// Whole artifact flattened to lowercase JSON text, for keyword scans.
    pub fn flat_text(&self) -> String {
        self.raw.to_string().to_lowercase()
    }

    /// All tech stack entries across every component, lowercased.
    pub fn all_tech_stack(&self) -> Vec<String> {
        self.components()
            .iter()
            .flat_map(|c| c.tech_stack())
            .collect()
    }

    pub fn service_count(&self) -> usize {
        self.components()
            .iter()
            .filter(|c| c.kind() == "service")
            .count()
    }
}

pub struct Component<'a> {
    raw: &'a Value,
}

impl<'a> Component<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.raw.get(key).is_some()
    }

    pub fn name(&self) -> String {
        self.raw
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string()
    }

    pub fn kind(&self) -> String {
        self.raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn responsibility(&self) -> String {
        self.raw
            .get("responsibility")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn scaling_strategy(&self) -> String {
        self.raw
            .get("scaling_strategy")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn tech_stack(&self) -> Vec<String> {
        self.raw
            .get("tech_stack")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Name, type, scaling strategy, and tech stack joined for keyword scans.
    pub fn summary_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name(),
            self.kind(),
            self.scaling_strategy(),
            self.tech_stack().join(" ")
        )
        .to_lowercase()
    }

    /// Full component JSON flattened to lowercase text.
    pub fn flat_text(&self) -> String {
        self.raw.to_string().to_lowercase()
    }
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
}

/// First number in the text (digits and dots), e.g. `"~12.5k rps"` -> 12.5.
fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse::<f64>().ok()
}

/// Parse throughput in forms like `"10K RPS"`, `"10000"`, `"10,000/sec"`,
/// `"1.5M events/sec"`. Supports K/M/B suffixes and embedded commas.
pub fn parse_throughput(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    if let Some(n) = value.as_f64() {
        return Some(n as u64);
    }
    let text = value.as_str()?.to_lowercase().replace([',', ' '], "");

    for (suffix, mult) in [("k", 1_000u64), ("m", 1_000_000), ("b", 1_000_000_000)] {
        if text.contains(suffix) {
            let num = leading_number(&text)?;
            return Some((num * mult as f64) as u64);
        }
    }
    leading_number(&text).map(|n| n as u64)
}

/// Parse an availability target: `"99.99%"`, `"99.9"`, `"four nines"`.
pub fn parse_availability(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let text = value.as_str()?.to_lowercase();
    let text = text.trim().trim_end_matches('%');

    const NAMED: [(&str, f64); 4] = [
        ("two nines", 99.0),
        ("three nines", 99.9),
        ("four nines", 99.99),
        ("five nines", 99.999),
    ];
    for (name, figure) in NAMED {
        if text.contains(name) {
            return Some(figure);
        }
    }

    text.parse::<f64>().ok()
}

/// Parse a latency target in milliseconds: `"100ms"`, `"0.1s"`, `100`.
pub fn parse_latency_ms(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    if let Some(n) = value.as_f64() {
        return Some(n as u64);
    }
    let text = value.as_str()?.to_lowercase();
    let num = leading_number(&text)?;
    if text.contains('s') && !text.contains("ms") {
        return Some((num * 1000.0) as u64);
    }
    Some(num as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn throughput_parses_suffixes_and_commas() {
        assert_eq!(parse_throughput(&json!("10K RPS")), Some(10_000));
        assert_eq!(parse_throughput(&json!("1.5M events/sec")), Some(1_500_000));
        assert_eq!(parse_throughput(&json!("10,000/sec")), Some(10_000));
        assert_eq!(parse_throughput(&json!(2500)), Some(2500));
        assert_eq!(parse_throughput(&json!("1B")), Some(1_000_000_000));
        assert_eq!(parse_throughput(&json!("no numbers here")), None);
    }

    #[test]
    fn availability_parses_percentages_and_names() {
        assert_eq!(parse_availability(&json!("99.99%")), Some(99.99));
        assert_eq!(parse_availability(&json!("99.9")), Some(99.9));
        assert_eq!(parse_availability(&json!("four nines")), Some(99.99));
        assert_eq!(parse_availability(&json!("n/a")), None);
    }

    #[test]
    fn latency_parses_seconds_and_milliseconds() {
        assert_eq!(parse_latency_ms(&json!("100ms")), Some(100));
        assert_eq!(parse_latency_ms(&json!("0.1s")), Some(100));
        assert_eq!(parse_latency_ms(&json!(250)), Some(250));
    }

    #[test]
    fn component_accessors_tolerate_missing_fields() {
        let raw = json!({"type": "Database"});
        let component = Component::new(&raw);
        assert_eq!(component.name(), "Unknown");
        assert_eq!(component.kind(), "database");
        assert!(component.tech_stack().is_empty());
    }

    #[test]
    fn design_collects_tech_stack_across_components() {
        let raw = json!({
            "components": [
                {"name": "API", "type": "service", "tech_stack": ["FastAPI", "Nginx"]},
                {"name": "DB", "type": "database", "tech_stack": ["PostgreSQL"]}
            ]
        });
        let design = Design::new(&raw);
        assert_eq!(design.all_tech_stack(), vec!["fastapi", "nginx", "postgresql"]);
        assert_eq!(design.service_count(), 1);
    }
}
