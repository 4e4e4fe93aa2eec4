//! The architect proposes and revises system designs.

use serde_json::Value;

use archadvisor_core::Settings;
use archadvisor_types::SessionState;

use crate::runner::AgentRole;

const SYSTEM_PROMPT: &str = r#"You are a Principal Software Architect with 15+ years of experience designing large-scale distributed systems. You specialize in:
- Microservice and event-driven architectures
- High-throughput, low-latency systems
- Cloud-native patterns (AWS, GCP, Azure)
- Data-intensive applications
- API design and service boundaries

Your task is to analyze system requirements and propose a detailed architecture design.

ALWAYS respond with a valid JSON object (no markdown, no explanation outside JSON) in this exact structure:

{
  "overview": "2-3 sentence high-level description of the architecture approach",
  "architecture_style": "microservices | event-driven | monolith | serverless | hybrid",
  "components": [
    {
      "name": "Service name",
      "type": "service | database | cache | queue | gateway | cdn | storage",
      "responsibility": "What this component does",
      "tech_stack": ["Technology choices"],
      "api_endpoints": [
        {
          "method": "GET|POST|PUT|DELETE",
          "path": "/api/v1/resource",
          "description": "What this endpoint does"
        }
      ],
      "data_stores": ["What data it stores and where"],
      "scaling_strategy": "How this component scales"
    }
  ],
  "tech_decisions": [
    {
      "decision": "What was chosen",
      "reasoning": "Why it was chosen",
      "alternatives_considered": ["What else was evaluated"]
    }
  ],
  "non_functional": {
    "latency_targets": {"p50": "value", "p99": "value"},
    "throughput": "requests/second or events/second",
    "availability_target": "99.9% or 99.99%",
    "data_consistency": "strong | eventual | causal",
    "disaster_recovery": "RPO and RTO targets"
  },
  "deployment": {
    "strategy": "blue-green | canary | rolling",
    "regions": ["Primary and secondary regions"],
    "containerization": "Docker + Kubernetes / ECS / Cloud Run"
  }
}

CRITICAL RULES FOR COMPONENT DETAIL:
- Every service-type component MUST have at least 3 api_endpoints with method, path, and description.
- Every component MUST have a non-empty scaling_strategy (never "" or null).
- Every database/cache component MUST list data_stores with specific data it holds.
- Include CRUD endpoints for each major resource the service owns."#;

const REVISION_PROMPT_SUFFIX: &str = r#"

You are now REVISING your previous design. You MUST fix every critical and high-severity finding listed below.

IMPORTANT RULES FOR REVISION:
- For EACH critical/high finding, make a CONCRETE change to the architecture JSON — do not just acknowledge it.
- If a finding mentions SPOF or "single instance", you MUST add "cluster", "replica", "multi-az", or "failover" to that component's scaling_strategy field.
- If a finding mentions "composite availability below target", you MUST add redundancy keywords (cluster, replica, multi-az, failover, sentinel) to component scaling_strategy fields.
- If a finding mentions "single region" with high SLA, you MUST add at least 2 entries to deployment.regions AND include "multi-az" in deployment.
- If a finding mentions "no replication", you MUST add "replication", "replica", or "primary-secondary" to the database component's scaling_strategy.
- If a finding mentions "no message broker" for event-driven, you MUST add a queue component (Kafka, RabbitMQ, SQS).
- If the consistency model is "eventual", you MUST have a tech_decision entry explaining why.
- Every component MUST have a non-empty scaling_strategy field.
- availability_target MUST be a plain percentage like "99.9%" or "99.99%" (no ranges, no extra text).

Track your changes in a "revision_log" array added to your JSON response:

"revision_log": [
  {
    "finding_code": "The error code if provided (e.g. SPOF_DATABASE)",
    "finding": "What was flagged",
    "action": "revised | defended",
    "detail": "Exactly what you changed in the JSON or why you're keeping it"
  }
]

Respond with the COMPLETE updated architecture JSON (not just the changes). Every field from the original schema must be present."#;

pub struct ArchitectRole;

impl AgentRole for ArchitectRole {
    fn name(&self) -> &'static str {
        "architect"
    }

    fn role_label(&self) -> &'static str {
        "Architect"
    }

    fn model<'a>(&self, settings: &'a Settings) -> &'a str {
        &settings.architect_model
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_user_message(&self, state: &SessionState) -> String {
        let is_revision = state.review_findings.is_some() && state.debate_round > 0;

        if is_revision {
            format!(
                "## Original Requirements\n{}\n\n## Your Previous Design\n{}\n\n## Review Findings\n{}\n\nPlease revise your architecture to address the findings above.\n{}",
                state.requirements,
                state.current_design.as_deref().unwrap_or(""),
                state.review_findings.as_deref().unwrap_or(""),
                REVISION_PROMPT_SUFFIX
            )
        } else {
            let context = if state.similar_architectures.is_empty() {
                String::new()
            } else {
                format!(
                    "\n\n## Reference: Similar Past Architectures\nThese are architectures for similar systems that may provide useful patterns:\n{}",
                    state.similar_architectures[..state.similar_architectures.len().min(2)]
                        .join("\n---\n")
                )
            };
            format!(
                "## System Requirements\n{}\n{context}\n\nDesign a comprehensive architecture for this system. Respond ONLY with the JSON object — no markdown, no preamble.",
                state.requirements
            )
        }
    }

    fn summarize(&self, parsed: &Value) -> String {
        let n_components = parsed
            .get("components")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        let style = parsed
            .get("architecture_style")
            .and_then(Value::as_str)
            .unwrap_or("distributed");
        let overview: String = parsed
            .get("overview")
            .and_then(Value::as_str)
            .unwrap_or("")
            .chars()
            .take(100)
            .collect();
        format!("Proposed {n_components}-component {style} architecture. {overview}")
    }
}
