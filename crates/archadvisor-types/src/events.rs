use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One wire event. The payload is discriminated by a `type` tag; every record
/// carries a timestamp. The session id is implied by the channel the record is
/// published on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    AgentStarted {
        agent: String,
        agent_label: String,
        message: String,
    },
    AgentThinking {
        agent: String,
        message: String,
    },
    AgentCompleted {
        agent: String,
        summary: String,
        duration_seconds: f64,
        cost_usd: f64,
    },
    DebateRoundStarted {
        round: u32,
        max_rounds: u32,
        message: String,
    },
    FindingDiscovered {
        agent: String,
        severity: String,
        category: String,
        component: String,
        summary: String,
    },
    DebateRoundCompleted {
        round: u32,
        findings_total: u64,
        findings_critical: u64,
        findings_resolved: u64,
        next_action: String,
    },
    WorkflowProgress {
        step: u32,
        total_steps: u32,
        status: String,
        message: String,
    },
    SessionComplete {
        duration_seconds: f64,
        total_cost_usd: f64,
        debate_rounds: u32,
        output_url: String,
    },
    SessionCancelled {
        message: String,
    },
    Error {
        message: String,
        recoverable: bool,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::AgentStarted { .. } => "agent_started",
            EventPayload::AgentThinking { .. } => "agent_thinking",
            EventPayload::AgentCompleted { .. } => "agent_completed",
            EventPayload::DebateRoundStarted { .. } => "debate_round_started",
            EventPayload::FindingDiscovered { .. } => "finding_discovered",
            EventPayload::DebateRoundCompleted { .. } => "debate_round_completed",
            EventPayload::WorkflowProgress { .. } => "workflow_progress",
            EventPayload::SessionComplete { .. } => "session_complete",
            EventPayload::SessionCancelled { .. } => "session_cancelled",
            EventPayload::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_type_tag_and_timestamp() {
        let record = EventRecord::new(EventPayload::WorkflowProgress {
            step: 2,
            total_steps: 5,
            status: "designing".to_string(),
            message: "Architect is designing the system architecture...".to_string(),
        });
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "workflow_progress");
        assert_eq!(value["step"], 2);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn events_round_trip() {
        let record = EventRecord::new(EventPayload::Error {
            message: "boom".to_string(),
            recoverable: false,
        });
        let text = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.event_type(), "error");
    }
}
