//! Agent execution: prompt assembly, the retried LLM call, response parsing,
//! event emission, and cost accounting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;

use archadvisor_core::{EventPublisher, Settings};
use archadvisor_types::{AgentMessage, EventPayload, SessionState};

use crate::json_repair::extract_json;
use crate::pricing::estimate_cost;
use crate::providers::{Completion, Provider};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_MIN: Duration = Duration::from_secs(2);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// A stateless prompt over the LLM endpoint. Implementations own the system
/// prompt, the user-message builder, and the response parser.
pub trait AgentRole: Send + Sync {
    fn name(&self) -> &'static str;
    fn role_label(&self) -> &'static str;
    fn model<'a>(&self, settings: &'a Settings) -> &'a str;
    fn system_prompt(&self) -> &'static str;
    fn build_user_message(&self, state: &SessionState) -> String;

    fn parse_response(&self, raw: &str) -> anyhow::Result<Value> {
        extract_json(raw)
    }

    fn summarize(&self, parsed: &Value) -> String;
}

#[derive(Debug, Clone)]
pub struct AgentMetadata {
    pub agent: String,
    pub model: String,
    pub duration_seconds: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub output: Value,
    pub raw_response: String,
    pub metadata: AgentMetadata,
}

impl AgentRun {
    /// Conversation-history record for this run.
    pub fn to_message(&self, role_label: impl Into<String>, summary: impl Into<String>) -> AgentMessage {
        AgentMessage {
            agent: self.metadata.agent.clone(),
            role: role_label.into(),
            summary: summary.into(),
            raw_output: serde_json::to_string_pretty(&self.output)
                .unwrap_or_else(|_| self.raw_response.clone()),
            timestamp: self.metadata.timestamp,
            duration_seconds: self.metadata.duration_seconds,
            model: self.metadata.model.clone(),
            cost_usd: self.metadata.cost_usd,
        }
    }
}

#[derive(Clone)]
pub struct AgentRunner {
    provider: Arc<dyn Provider>,
    settings: Settings,
}

impl AgentRunner {
    pub fn new(provider: Arc<dyn Provider>, settings: Settings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Execute one agent: emit started/thinking/completed events, call the
    /// provider with retries, parse, and account cost. Parse faults are not
    /// retried; they surface after the recovery passes have failed.
    pub async fn run(
        &self,
        role: &dyn AgentRole,
        state: &SessionState,
        events: &EventPublisher,
    ) -> anyhow::Result<AgentRun> {
        let started = Instant::now();
        let model = role.model(&self.settings).to_string();

        events
            .emit(EventPayload::AgentStarted {
                agent: role.name().to_string(),
                agent_label: role.role_label().to_string(),
                message: format!("{} is analyzing the architecture...", role.role_label()),
            })
            .await;

        let system_prompt = role.system_prompt();
        let user_message = role.build_user_message(state);

        events
            .emit(EventPayload::AgentThinking {
                agent: role.name().to_string(),
                message: format!("{} is processing...", role.role_label()),
            })
            .await;

        let result = self
            .call_with_retries(role.name(), system_prompt, &user_message, &model)
            .await
            .and_then(|completion| {
                let parsed = role.parse_response(&completion.content)?;
                Ok((completion, parsed))
            });

        let (completion, parsed) = match result {
            Ok(ok) => ok,
            Err(err) => {
                tracing::error!(agent = role.name(), error = %err, "agent_failed");
                events
                    .emit(EventPayload::Error {
                        message: format!("{} encountered an error: {err}", role.role_label()),
                        recoverable: false,
                    })
                    .await;
                return Err(err);
            }
        };

        let duration = started.elapsed().as_secs_f64();
        let cost = estimate_cost(&model, completion.usage.input_tokens, completion.usage.output_tokens);

        events
            .emit(EventPayload::AgentCompleted {
                agent: role.name().to_string(),
                summary: role.summarize(&parsed),
                duration_seconds: round2(duration),
                cost_usd: round4(cost),
            })
            .await;

        tracing::info!(
            agent = role.name(),
            model = %model,
            duration_seconds = round2(duration),
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            cost_usd = round4(cost),
            "agent_completed"
        );

        Ok(AgentRun {
            output: parsed,
            raw_response: completion.content,
            metadata: AgentMetadata {
                agent: role.name().to_string(),
                model,
                duration_seconds: round2(duration),
                input_tokens: completion.usage.input_tokens,
                output_tokens: completion.usage.output_tokens,
                cost_usd: round4(cost),
                timestamp: Utc::now(),
            },
        })
    }

    /// Up to three attempts with exponential backoff between them.
    async fn call_with_retries(
        &self,
        agent: &str,
        system_prompt: &str,
        user_message: &str,
        model: &str,
    ) -> anyhow::Result<Completion> {
        let mut backoff = BACKOFF_MIN;
        let mut attempt = 1;
        loop {
            match self.provider.complete(system_prompt, user_message, model).await {
                Ok(completion) => return Ok(completion),
                Err(err) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        agent,
                        attempt,
                        wait_seconds = backoff.as_secs(),
                        error = %err,
                        "llm_retry"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use archadvisor_core::EventBus;
    use async_trait::async_trait;
    use archadvisor_types::Preferences;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::providers::TokenUsage;

    struct FlakyProvider {
        fail_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn id(&self) -> &str {
            "flaky"
        }
        async fn complete(&self, _: &str, _: &str, _: &str) -> anyhow::Result<Completion> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                anyhow::bail!("transport error")
            }
            Ok(Completion {
                content: "{\"overview\": \"fine\"}".to_string(),
                usage: TokenUsage {
                    input_tokens: 1000,
                    output_tokens: 500,
                },
            })
        }
    }

    struct TestRole;

    #[async_trait]
    impl AgentRole for TestRole {
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
            "system"
        }
        fn build_user_message(&self, _: &SessionState) -> String {
            "user".to_string()
        }
        fn summarize(&self, _: &Value) -> String {
            "done".to_string()
        }
    }

    fn state() -> SessionState {
        SessionState::new("arch_1", "reqs", Preferences::default())
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds_and_accounts_cost() {
        let provider = Arc::new(FlakyProvider {
            fail_first: 2,
            calls: AtomicU32::new(0),
        });
        let runner = AgentRunner::new(provider.clone(), Settings::default());
        let bus = EventBus::new();
        let events = bus.publisher("arch_1");

        let run = runner.run(&TestRole, &state(), &events).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(run.output["overview"], "fine");
        // 1000 in + 500 out on gpt-4o = 0.0025 + 0.005
        assert!((run.metadata.cost_usd - 0.0075).abs() < 1e-9);

        let history = bus.history("arch_1").await;
        let types: Vec<_> = history.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["agent_started", "agent_thinking", "agent_completed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_emit_an_error_event() {
        let provider = Arc::new(FlakyProvider {
            fail_first: 10,
            calls: AtomicU32::new(0),
        });
        let runner = AgentRunner::new(provider.clone(), Settings::default());
        let bus = EventBus::new();
        let events = bus.publisher("arch_1");

        let result = runner.run(&TestRole, &state(), &events).await;
        assert!(result.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        let history = bus.history("arch_1").await;
        assert_eq!(history.last().unwrap().event_type(), "error");
    }
}
