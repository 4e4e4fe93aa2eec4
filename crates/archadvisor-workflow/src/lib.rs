//! The workflow engine: drives a session through the staged graph, merges
//! each stage's partial update into the session state, checkpoints the store,
//! and fans progress out through the event bus.
//!
//! One session runs as one task; stages never overlap within a session.
//! Cancellation is observed between stages.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use archadvisor_agents::AgentRunner;
use archadvisor_core::{EventBus, SessionStore};
use archadvisor_types::{EventPayload, SessionState, SessionStatus};
use archadvisor_validation::ValidationEngine;

pub mod graph;
pub mod nodes;

pub use graph::{route_after_review, route_after_validation, StageId, WorkflowGraph};
use nodes::{standard_nodes, StageContext, StageNode};

pub struct WorkflowRunner {
    runner: AgentRunner,
    engine: Arc<ValidationEngine>,
    bus: EventBus,
    store: SessionStore,
}

impl WorkflowRunner {
    pub fn new(
        runner: AgentRunner,
        engine: Arc<ValidationEngine>,
        bus: EventBus,
        store: SessionStore,
    ) -> Self {
        Self {
            runner,
            engine,
            bus,
            store,
        }
    }

    /// Drive one session to a terminal status. Always returns the final
    /// state; faults are folded into it (status `error`, a final `error`
    /// event, `completed_at` stamped).
    pub async fn run(&self, mut state: SessionState, cancel: CancellationToken) -> SessionState {
        let session_id = state.session_id.clone();
        let events = self.bus.publisher(&session_id);
        let ctx = StageContext {
            runner: self.runner.clone(),
            engine: self.engine.clone(),
            events: events.clone(),
        };

        tracing::info!(
            session_id = %session_id,
            requirements_length = state.requirements.len(),
            "workflow_started"
        );

        let graph = WorkflowGraph::standard();
        let node_set = standard_nodes();
        let mut current = Some(graph.entry());

        while let Some(stage) = current {
            // Cancellation is observed at the stage boundary; the ingress
            // layer has already moved the stored session to `cancelled`.
            if cancel.is_cancelled() {
                tracing::info!(session_id = %session_id, stage = stage.as_str(), "workflow_cancelled");
                state.status = SessionStatus::Cancelled;
                return state;
            }

            let Some(node) = node_set.iter().find(|n| n.id() == stage) else {
                return self
                    .fail(state, &events, format!("no node registered for stage {}", stage.as_str()))
                    .await;
            };

            match node.run(&ctx, &state).await {
                Ok(patch) => state.apply(patch),
                Err(err) => {
                    return self
                        .fail(state, &events, format!("Workflow failed: {err}"))
                        .await;
                }
            }

            // Checkpoint after every stage; a store fault is fatal.
            if let Err(err) = self.store.store_output(&session_id, &state).await {
                tracing::error!(session_id = %session_id, error = %err, "checkpoint_failed");
                return self
                    .fail(state, &events, format!("Workflow failed: {err}"))
                    .await;
            }

            current = graph.next(stage, &state);
        }

        let duration = state
            .completed_at
            .map(|done| (done - state.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        events
            .emit(EventPayload::SessionComplete {
                duration_seconds: round2(duration),
                total_cost_usd: round4(state.total_cost_usd),
                debate_rounds: state.debate_round,
                output_url: format!("/api/v1/sessions/{session_id}/output"),
            })
            .await;

        tracing::info!(
            session_id = %session_id,
            debate_rounds = state.debate_round,
            validation_rounds = state.validation_round,
            total_cost_usd = round4(state.total_cost_usd),
            status = state.status.as_str(),
            "workflow_completed"
        );

        state
    }

    async fn fail(
        &self,
        mut state: SessionState,
        events: &archadvisor_core::EventPublisher,
        message: String,
    ) -> SessionState {
        tracing::error!(session_id = %state.session_id, error = %message, "workflow_failed");
        state.status = SessionStatus::Error;
        state.errors.push(message.clone());
        state.completed_at = Some(chrono::Utc::now());

        events
            .emit(EventPayload::Error {
                message,
                recoverable: false,
            })
            .await;

        if let Err(err) = self.store.store_output(&state.session_id, &state).await {
            tracing::error!(session_id = %state.session_id, error = %err, "error_state_not_persisted");
        }
        state
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
