//! Server assembly: shared application state and the axum ingress.

use std::sync::Arc;
use std::time::{Duration, Instant};

use archadvisor_agents::{build_provider, AgentRunner, Provider};
use archadvisor_core::{
    CancellationRegistry, EventBus, KvBackend, SessionStore, Settings, SlidingWindowRateLimiter,
};
use archadvisor_validation::ValidationEngine;
use archadvisor_workflow::WorkflowRunner;

mod http;
mod templates;
mod wire;

pub use http::{app_router, serve};

#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub bus: EventBus,
    pub limiter: Arc<SlidingWindowRateLimiter>,
    pub workflow: Arc<WorkflowRunner>,
    pub cancellations: CancellationRegistry,
    pub settings: Settings,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(backend: Arc<dyn KvBackend>, settings: Settings) -> Self {
        let provider = build_provider(&settings);
        Self::with_provider(backend, provider, settings)
    }

    pub fn with_provider(
        backend: Arc<dyn KvBackend>,
        provider: Arc<dyn Provider>,
        settings: Settings,
    ) -> Self {
        let store = SessionStore::new(backend);
        let bus = EventBus::new();
        let limiter = Arc::new(SlidingWindowRateLimiter::new(
            settings.rate_limit_max_sessions,
            Duration::from_secs(settings.rate_limit_window_seconds),
        ));
        let runner = AgentRunner::new(provider, settings.clone());
        let workflow = Arc::new(WorkflowRunner::new(
            runner,
            Arc::new(ValidationEngine::new()),
            bus.clone(),
            store.clone(),
        ));
        Self {
            store,
            bus,
            limiter,
            workflow,
            cancellations: CancellationRegistry::new(),
            settings,
            started_at: Instant::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use archadvisor_core::MemoryBackend;
        Self::new(Arc::new(MemoryBackend::new()), Settings::default())
    }

    #[cfg(test)]
    pub(crate) fn for_tests_with_limit(max_sessions: u32) -> Self {
        use archadvisor_core::MemoryBackend;
        let settings = Settings {
            rate_limit_max_sessions: max_sessions,
            ..Settings::default()
        };
        Self::new(Arc::new(MemoryBackend::new()), settings)
    }
}
