//! Workflow topology: stages, edges, and the two conditional routers.
//!
//! Nodes, edges, and routing functions are separate tables so a new stage is
//! added without touching the driver loop.

use serde_json::Value;

use archadvisor_types::SessionState;

/// Validation revision loops are capped; past the cap the gate force-proceeds.
pub const MAX_VALIDATION_ROUNDS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    RetrieveContext,
    ArchitectDesign,
    Validator,
    ArchitectReviseValidation,
    DevilsAdvocateReview,
    ArchitectRevise,
    CostAnalysis,
    GenerateDocs,
}

impl StageId {
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::RetrieveContext => "retrieve_context",
            StageId::ArchitectDesign => "architect_design",
            StageId::Validator => "validator",
            StageId::ArchitectReviseValidation => "architect_revise_validation",
            StageId::DevilsAdvocateReview => "devils_advocate_review",
            StageId::ArchitectRevise => "architect_revise",
            StageId::CostAnalysis => "cost_analysis",
            StageId::GenerateDocs => "generate_docs",
        }
    }
}

pub type Router = fn(&SessionState) -> StageId;

pub enum Edge {
    To(StageId),
    Conditional(Router),
    End,
}

pub struct WorkflowGraph {
    entry: StageId,
    edges: Vec<(StageId, Edge)>,
}

impl WorkflowGraph {
    /// The standard pipeline:
    ///
    /// ```text
    /// retrieve_context -> architect_design -> validator
    ///     validator --(fail, round < 2)--> architect_revise_validation -> validator
    ///     validator --(pass | forced)----> devils_advocate_review
    ///         devils_advocate_review --(revise)--> architect_revise -> devils_advocate_review
    ///         devils_advocate_review --(proceed)-> cost_analysis -> generate_docs -> end
    /// ```
    pub fn standard() -> Self {
        Self {
            entry: StageId::RetrieveContext,
            edges: vec![
                (StageId::RetrieveContext, Edge::To(StageId::ArchitectDesign)),
                (StageId::ArchitectDesign, Edge::To(StageId::Validator)),
                (StageId::Validator, Edge::Conditional(route_after_validation)),
                (StageId::ArchitectReviseValidation, Edge::To(StageId::Validator)),
                (
                    StageId::DevilsAdvocateReview,
                    Edge::Conditional(route_after_review),
                ),
                (StageId::ArchitectRevise, Edge::To(StageId::DevilsAdvocateReview)),
                (StageId::CostAnalysis, Edge::To(StageId::GenerateDocs)),
                (StageId::GenerateDocs, Edge::End),
            ],
        }
    }

    pub fn entry(&self) -> StageId {
        self.entry
    }

    /// Next stage after `from`, or None at the end of the graph.
    pub fn next(&self, from: StageId, state: &SessionState) -> Option<StageId> {
        match self.edges.iter().find(|(id, _)| *id == from).map(|(_, e)| e) {
            Some(Edge::To(next)) => Some(*next),
            Some(Edge::Conditional(router)) => Some(router(state)),
            Some(Edge::End) | None => None,
        }
    }
}

/// Quality-gate routing. Pass goes forward; failure loops back to the
/// architect until the round cap, then force-proceeds.
pub fn route_after_validation(state: &SessionState) -> StageId {
    if state.validation_passed.unwrap_or(true) {
        tracing::info!(
            session_id = %state.session_id,
            round = state.validation_round,
            "validation passed; proceeding to review"
        );
        return StageId::DevilsAdvocateReview;
    }
    if state.validation_round >= MAX_VALIDATION_ROUNDS {
        tracing::warn!(
            session_id = %state.session_id,
            round = state.validation_round,
            "validation round cap reached; force-proceeding"
        );
        return StageId::DevilsAdvocateReview;
    }
    tracing::info!(
        session_id = %state.session_id,
        round = state.validation_round,
        "validation failed; routing back to architect"
    );
    StageId::ArchitectReviseValidation
}

/// Debate routing. Proceed at the round cap, when the reviewer reports zero
/// criticals, or when it recommends proceeding. Malformed reviewer output
/// proceeds rather than looping.
pub fn route_after_review(state: &SessionState) -> StageId {
    if state.debate_round >= state.max_debate_rounds {
        tracing::info!(
            session_id = %state.session_id,
            round = state.debate_round,
            max = state.max_debate_rounds,
            "debate round cap reached"
        );
        return StageId::CostAnalysis;
    }

    let findings: Value = match state
        .review_findings
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
    {
        Ok(Some(findings)) => findings,
        Ok(None) | Err(_) => {
            tracing::warn!(
                session_id = %state.session_id,
                "reviewer output missing or unparseable; proceeding"
            );
            return StageId::CostAnalysis;
        }
    };

    let critical_count = findings
        .get("severity_summary")
        .and_then(|s| s.get("critical"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let recommendation = findings
        .get("proceed_recommendation")
        .and_then(Value::as_str)
        .unwrap_or("revise_recommended");

    if critical_count == 0 || recommendation == "proceed" {
        StageId::CostAnalysis
    } else {
        StageId::ArchitectRevise
    }
}
