//! The devil's advocate challenges the proposed architecture.

use serde_json::Value;

use archadvisor_core::Settings;
use archadvisor_types::SessionState;

use crate::runner::AgentRole;

const SYSTEM_PROMPT: &str = r#"You are a Senior Site Reliability Engineer and Security Architect with deep expertise in:
- Failure mode analysis (FMEA)
- Security threat modeling (STRIDE)
- Performance bottleneck identification
- Distributed systems failure patterns
- Operational complexity assessment

Your job is to CHALLENGE the proposed architecture. Find every weakness, gap, and risk.
Be thorough but fair — acknowledge strengths while being ruthless about weaknesses.

ALWAYS respond with a valid JSON object (no markdown, no explanation outside JSON):

{
  "severity_summary": {
    "critical": 0,
    "high": 0,
    "medium": 0,
    "low": 0
  },
  "findings": [
    {
      "id": "F001",
      "severity": "critical | high | medium | low",
      "category": "single_point_of_failure | security | scalability | data_consistency | operational_complexity | cost_inefficiency | missing_requirement | over_engineering",
      "component": "Which component is affected",
      "issue": "Clear description of the problem",
      "impact": "What happens if this isn't addressed",
      "recommendation": "Specific fix or mitigation",
      "question_for_architect": "A pointed question the architect must answer"
    }
  ],
  "missing_considerations": [
    "Things the architect didn't address at all"
  ],
  "strengths": [
    "What the architect got right — be fair"
  ],
  "overall_assessment": "2-3 sentence overall verdict",
  "proceed_recommendation": "proceed | revise_critical | revise_recommended"
}

Review categories to check:
1. Single Points of Failure — What breaks the entire system?
2. Security — Auth, encryption, injection, DDOS, data exposure
3. Scalability — Hotspots, bottlenecks, thundering herd
4. Data Consistency — Race conditions, split brain, stale reads
5. Operational Complexity — Too many services? Debugging difficulty?
6. Missing Requirements — Anything in the requirements not addressed?
7. Over-Engineering — Unnecessary complexity for the scale?"#;

pub struct DevilsAdvocateRole;

impl AgentRole for DevilsAdvocateRole {
    fn name(&self) -> &'static str {
        "devils_advocate"
    }

    fn role_label(&self) -> &'static str {
        "Devil's Advocate"
    }

    fn model<'a>(&self, settings: &'a Settings) -> &'a str {
        &settings.devils_advocate_model
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_user_message(&self, state: &SessionState) -> String {
        let round = state.debate_round.max(1);
        let revision_context = if round > 1 {
            format!(
                "\n\n## Context\nThis is debate round {round}. The architect has revised the design based on your previous findings. Focus on:\n1. Whether previous critical findings were adequately addressed\n2. Any NEW issues introduced by the revisions\n3. Remaining unresolved concerns"
            )
        } else {
            String::new()
        };

        format!(
            "## Original Requirements\n{}\n\n## Proposed Architecture (Round {round})\n{}\n{revision_context}\n\nReview this architecture thoroughly. Respond ONLY with the JSON object — no markdown, no preamble.",
            state.requirements,
            state.current_design.as_deref().unwrap_or("")
        )
    }

    fn summarize(&self, parsed: &Value) -> String {
        let summary = parsed.get("severity_summary");
        let count = |key: &str| {
            summary
                .and_then(|s| s.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        let critical = count("critical");
        let high = count("high");
        let total = critical + high + count("medium") + count("low");
        let recommendation = parsed
            .get("proceed_recommendation")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        format!("Found {total} issues ({critical} critical, {high} high). Recommendation: {recommendation}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archadvisor_types::Preferences;
    use serde_json::json;

    #[test]
    fn first_round_prompt_has_no_revision_context() {
        let mut state = SessionState::new("arch_1", "reqs", Preferences::default());
        state.debate_round = 1;
        state.current_design = Some("{}".to_string());
        let message = DevilsAdvocateRole.build_user_message(&state);
        assert!(message.contains("Round 1"));
        assert!(!message.contains("debate round"));
    }

    #[test]
    fn later_rounds_ask_about_previous_findings() {
        let mut state = SessionState::new("arch_1", "reqs", Preferences::default());
        state.debate_round = 2;
        let message = DevilsAdvocateRole.build_user_message(&state);
        assert!(message.contains("This is debate round 2"));
    }

    #[test]
    fn summary_reports_counts_and_recommendation() {
        let parsed = json!({
            "severity_summary": {"critical": 1, "high": 2, "medium": 0, "low": 1},
            "proceed_recommendation": "revise_critical"
        });
        assert_eq!(
            DevilsAdvocateRole.summarize(&parsed),
            "Found 4 issues (1 critical, 2 high). Recommendation: revise_critical"
        );
    }
}
