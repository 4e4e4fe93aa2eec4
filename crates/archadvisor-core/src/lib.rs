mod cancellation;
mod config;
mod event_bus;
mod rate_limiter;
mod session_store;

pub use cancellation::CancellationRegistry;
pub use config::Settings;
pub use event_bus::{EventBus, EventPublisher, Listener, ListenerId};
pub use rate_limiter::SlidingWindowRateLimiter;
pub use session_store::{KvBackend, MemoryBackend, RedisBackend, SessionStore, SESSION_TTL_SECS};
