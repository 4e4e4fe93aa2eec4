//! Request and response bodies for the ingress API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use archadvisor_types::{Diagram, Preferences, SessionState, SessionStatus};

pub const REQUIREMENTS_MIN_CHARS: usize = 50;
pub const REQUIREMENTS_MAX_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub requirements: String,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub websocket_url: String,
    pub estimated_duration_seconds: u64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Serialize)]
pub struct AgentMessageResponse {
    pub agent: String,
    pub role: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub model: String,
    pub cost_usd: f64,
}

#[derive(Debug, Serialize)]
pub struct SessionProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<&'static str>,
    pub debate_round: u32,
    pub steps_completed: i32,
    pub total_steps: u32,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub progress: SessionProgress,
    pub messages: Vec<AgentMessageResponse>,
    pub cost_so_far_usd: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SessionOutputMetadata {
    pub total_duration_seconds: f64,
    pub total_cost_usd: f64,
    pub debate_rounds: u32,
    pub models_used: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionOutputResponse {
    pub session_id: String,
    pub format: &'static str,
    pub document: String,
    pub diagrams: Vec<Diagram>,
    pub metadata: SessionOutputMetadata,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub complexity: &'static str,
    pub requirements: &'static str,
}

/// Step index shown to clients for each status.
pub fn step_for_status(status: SessionStatus) -> i32 {
    match status {
        SessionStatus::Initializing => 0,
        SessionStatus::RetrievingContext => 1,
        SessionStatus::Designing => 2,
        SessionStatus::Validating | SessionStatus::Reviewing | SessionStatus::Revising => 3,
        SessionStatus::Costing => 4,
        SessionStatus::Documenting | SessionStatus::Complete => 5,
        SessionStatus::Error | SessionStatus::Cancelled => -1,
    }
}

/// The agent currently at work for each status, where one is implied.
pub fn agent_for_status(status: SessionStatus) -> Option<&'static str> {
    match status {
        SessionStatus::Designing => Some("architect"),
        SessionStatus::Validating => Some("validator"),
        SessionStatus::Reviewing => Some("devils_advocate"),
        SessionStatus::Revising => Some("architect"),
        SessionStatus::Costing => Some("cost_analyzer"),
        SessionStatus::Documenting => Some("documentation"),
        _ => None,
    }
}

pub fn status_response(session_id: &str, state: &SessionState) -> SessionStatusResponse {
    SessionStatusResponse {
        session_id: session_id.to_string(),
        status: state.status,
        progress: SessionProgress {
            current_agent: agent_for_status(state.status),
            debate_round: state.debate_round,
            steps_completed: step_for_status(state.status),
            total_steps: 5,
        },
        messages: state
            .messages
            .iter()
            .map(|msg| AgentMessageResponse {
                agent: msg.agent.clone(),
                role: msg.role.clone(),
                summary: msg.summary.clone(),
                timestamp: msg.timestamp,
                duration_seconds: msg.duration_seconds,
                model: msg.model.clone(),
                cost_usd: msg.cost_usd,
            })
            .collect(),
        cost_so_far_usd: state.total_cost_usd,
        created_at: state.started_at,
        completed_at: state.completed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_mapping_covers_terminal_states() {
        assert_eq!(step_for_status(SessionStatus::Complete), 5);
        assert_eq!(step_for_status(SessionStatus::Error), -1);
        assert_eq!(step_for_status(SessionStatus::Cancelled), -1);
    }

    #[test]
    fn active_agent_follows_status() {
        assert_eq!(agent_for_status(SessionStatus::Validating), Some("validator"));
        assert_eq!(agent_for_status(SessionStatus::Complete), None);
    }
}
