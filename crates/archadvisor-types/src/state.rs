use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Short, readable session token, e.g. `arch_1f4a9c2e`.
pub fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("arch_{}", &hex[..8])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Pdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Brief,
    #[default]
    Detailed,
    Comprehensive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub cloud_provider: CloudProvider,
    #[serde(default = "default_debate_rounds")]
    pub max_debate_rounds: u32,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub detail_level: DetailLevel,
}

fn default_debate_rounds() -> u32 {
    3
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            cloud_provider: CloudProvider::default(),
            max_debate_rounds: default_debate_rounds(),
            output_format: OutputFormat::default(),
            detail_level: DetailLevel::default(),
        }
    }
}

impl Preferences {
    /// Debate rounds are bounded to [1, 5] regardless of what the caller sent.
    pub fn clamped_debate_rounds(&self) -> u32 {
        self.max_debate_rounds.clamp(1, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    RetrievingContext,
    Designing,
    Validating,
    Reviewing,
    Revising,
    Costing,
    Documenting,
    Complete,
    Error,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Complete | SessionStatus::Error | SessionStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::RetrievingContext => "retrieving_context",
            SessionStatus::Designing => "designing",
            SessionStatus::Validating => "validating",
            SessionStatus::Reviewing => "reviewing",
            SessionStatus::Revising => "revising",
            SessionStatus::Costing => "costing",
            SessionStatus::Documenting => "documenting",
            SessionStatus::Complete => "complete",
            SessionStatus::Error => "error",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// Record of a single agent execution. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent: String,
    pub role: String,
    pub summary: String,
    pub raw_output: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub model: String,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub mermaid_code: String,
}

/// Full per-session state. The workflow task is the only writer during the
/// session lifetime; observer reads through the store are best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub requirements: String,
    pub preferences: Preferences,
    #[serde(default)]
    pub client_fingerprint: Option<String>,

    #[serde(default)]
    pub similar_architectures: Vec<String>,

    pub current_design: Option<String>,
    pub review_findings: Option<String>,
    pub cost_analysis: Option<String>,
    pub final_document: Option<String>,
    pub rendered_markdown: Option<String>,
    #[serde(default)]
    pub diagrams: Vec<Diagram>,

    #[serde(default)]
    pub messages: Vec<AgentMessage>,

    pub validation_report: Option<String>,
    pub validation_passed: Option<bool>,
    pub validation_score: Option<f64>,
    #[serde(default)]
    pub validation_round: u32,

    #[serde(default)]
    pub debate_round: u32,
    pub max_debate_rounds: u32,
    pub status: SessionStatus,

    #[serde(default)]
    pub errors: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_cost_usd: f64,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, requirements: impl Into<String>, preferences: Preferences) -> Self {
        let max_debate_rounds = preferences.clamped_debate_rounds();
        Self {
            session_id: session_id.into(),
            requirements: requirements.into(),
            preferences,
            client_fingerprint: None,
            similar_architectures: Vec::new(),
            current_design: None,
            review_findings: None,
            cost_analysis: None,
            final_document: None,
            rendered_markdown: None,
            diagrams: Vec::new(),
            messages: Vec::new(),
            validation_report: None,
            validation_passed: None,
            validation_score: None,
            validation_round: 0,
            debate_round: 0,
            max_debate_rounds,
            status: SessionStatus::Initializing,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            total_cost_usd: 0.0,
        }
    }

    /// Merge a stage's partial update. Messages are appended, cost is
    /// accumulated, counters and fields are replaced only when set.
    pub fn apply(&mut self, patch: StagePatch) {
        if let Some(v) = patch.similar_architectures {
            self.similar_architectures = v;
        }
        if let Some(v) = patch.current_design {
            self.current_design = Some(v);
        }
        if let Some(v) = patch.review_findings {
            self.review_findings = Some(v);
        }
        if let Some(v) = patch.cost_analysis {
            self.cost_analysis = Some(v);
        }
        if let Some(v) = patch.final_document {
            self.final_document = Some(v);
        }
        if let Some(v) = patch.rendered_markdown {
            self.rendered_markdown = Some(v);
        }
        if let Some(v) = patch.diagrams {
            self.diagrams = v;
        }
        if let Some(v) = patch.validation_report {
            self.validation_report = Some(v);
        }
        if let Some(v) = patch.validation_passed {
            self.validation_passed = Some(v);
        }
        if let Some(v) = patch.validation_score {
            self.validation_score = Some(v);
        }
        if let Some(v) = patch.validation_round {
            self.validation_round = v;
        }
        if let Some(v) = patch.debate_round {
            self.debate_round = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.completed_at {
            self.completed_at = Some(v);
        }
        self.messages.extend(patch.messages);
        self.errors.extend(patch.errors);
        self.total_cost_usd += patch.cost_usd;
    }
}

/// Partial state update returned by a workflow stage.
#[derive(Debug, Default)]
pub struct StagePatch {
    pub similar_architectures: Option<Vec<String>>,
    pub current_design: Option<String>,
    pub review_findings: Option<String>,
    pub cost_analysis: Option<String>,
    pub final_document: Option<String>,
    pub rendered_markdown: Option<String>,
    pub diagrams: Option<Vec<Diagram>>,
    pub validation_report: Option<String>,
    pub validation_passed: Option<bool>,
    pub validation_score: Option<f64>,
    pub validation_round: Option<u32>,
    pub debate_round: Option<u32>,
    pub status: Option<SessionStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub messages: Vec<AgentMessage>,
    pub errors: Vec<String>,
    pub cost_usd: f64,
}
