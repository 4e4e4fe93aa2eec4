//! Per-session cancellation tokens. The HTTP layer cancels; the workflow
//! task observes the token at its next suspension point.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct CancellationRegistry {
    tokens: Arc<RwLock<HashMap<String, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens
            .write()
            .await
            .insert(session_id.to_string(), token.clone());
        token
    }

    /// Returns false when the session has no registered token.
    pub async fn cancel(&self, session_id: &str) -> bool {
        match self.tokens.read().await.get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, session_id: &str) {
        self.tokens.write().await.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_trips_the_registered_token() {
        let registry = CancellationRegistry::new();
        let token = registry.register("s1").await;
        assert!(!token.is_cancelled());
        assert!(registry.cancel("s1").await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_unknown_session_is_a_noop() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel("missing").await);
    }

    #[tokio::test]
    async fn remove_forgets_the_token() {
        let registry = CancellationRegistry::new();
        registry.register("s1").await;
        registry.remove("s1").await;
        assert!(!registry.cancel("s1").await);
    }
}
