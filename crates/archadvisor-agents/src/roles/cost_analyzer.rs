//! Cost analyzer contract. The workflow currently traverses this stage as a
//! placeholder without calling the model; the prompt is kept so re-enabling
//! is a one-line change in the stage.

use serde_json::Value;

use archadvisor_core::Settings;
use archadvisor_types::SessionState;

use crate::runner::AgentRole;

const SYSTEM_PROMPT: &str = r#"You are a Cloud Infrastructure Cost Specialist with deep knowledge of pricing for AWS, GCP, and Azure. You analyze system architectures and provide detailed cost estimates.

Your estimates should be realistic and based on actual cloud pricing. Include compute, storage, networking, managed services, and data transfer costs.

ALWAYS respond with a valid JSON object (no markdown, no explanation outside JSON):

{
  "scale_tiers": [
    {
      "tier_name": "Startup",
      "description": "10K DAU, low traffic",
      "aws": {"total_monthly_usd": 0, "breakdown": [{"category": "Compute", "service": "...", "specs": "...", "monthly_usd": 0, "notes": "..."}]},
      "gcp": {"total_monthly_usd": 0, "breakdown": []},
      "azure": {"total_monthly_usd": 0, "breakdown": []}
    }
  ],
  "cost_optimization_tips": [
    {"tip": "...", "estimated_savings_percent": 30, "tradeoff": "..."}
  ],
  "cheapest_path": {
    "provider": "aws | gcp | azure",
    "reasoning": "...",
    "estimated_monthly_range": "$X - $Y"
  },
  "scaling_cost_projection": {
    "10x_traffic": "...",
    "100x_traffic": "...",
    "cost_scaling_pattern": "linear | sub-linear | super-linear"
  }
}

Provide estimates for 3 scale tiers: Startup (cost-optimized), Growth (balanced), Scale (performance-optimized). Be specific with instance types and service names."#;

pub struct CostAnalyzerRole;

impl AgentRole for CostAnalyzerRole {
    fn name(&self) -> &'static str {
        "cost_analyzer"
    }

    fn role_label(&self) -> &'static str {
        "Cost Analyzer"
    }

    fn model<'a>(&self, settings: &'a Settings) -> &'a str {
        &settings.cost_analyzer_model
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn build_user_message(&self, state: &SessionState) -> String {
        format!(
            "## System Requirements\n{}\n\n## Final Architecture Design\n{}\n\nAnalyze the infrastructure costs for this architecture across AWS, GCP, and Azure. Provide estimates for Startup, Growth, and Scale tiers. Respond ONLY with the JSON object — no markdown, no preamble.",
            state.requirements,
            state.current_design.as_deref().unwrap_or("")
        )
    }

    fn summarize(&self, parsed: &Value) -> String {
        let cheapest = parsed.get("cheapest_path");
        let provider = cheapest
            .and_then(|c| c.get("provider"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let range = cheapest
            .and_then(|c| c.get("estimated_monthly_range"))
            .and_then(Value::as_str)
            .unwrap_or("N/A");
        let tips = parsed
            .get("cost_optimization_tips")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        format!("Cheapest: {provider} ({range}). {tips} optimization tips provided.")
    }
}
