//! In-process pub/sub keyed by session id, with a bounded replay buffer for
//! late-joining observers.
//!
//! Publication is atomic per session: the buffer append and the listener
//! fan-out happen under the session's lock, so every listener observes the
//! publication order. A listener that fails is dropped; delivery to the
//! others still counts.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::Arc;

use futures::Future;
use tokio::sync::{Mutex, RwLock};

use archadvisor_types::{EventPayload, EventRecord};

const MAX_HISTORY: usize = 100;

pub type Listener = Arc<
    dyn Fn(EventRecord) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync,
>;

/// Opaque handle for unsubscribing; closures are not comparable, so the bus
/// hands out identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct SessionChannel {
    next_listener_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
    history: VecDeque<EventRecord>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<SessionChannel>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    async fn channel(&self, session_id: &str) -> Arc<Mutex<SessionChannel>> {
        if let Some(channel) = self.sessions.read().await.get(session_id) {
            return channel.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    pub async fn subscribe(&self, session_id: &str, listener: Listener) -> ListenerId {
        let channel = self.channel(session_id).await;
        let mut channel = channel.lock().await;
        channel.next_listener_id += 1;
        let id = ListenerId(channel.next_listener_id);
        channel.listeners.push((id, listener));
        tracing::debug!(
            session_id,
            listeners = channel.listeners.len(),
            "event_bus_subscribe"
        );
        id
    }

    /// Subscribe and snapshot the replay buffer in one step, so nothing is
    /// missed or duplicated between the history frame and the live stream.
    pub async fn subscribe_with_history(
        &self,
        session_id: &str,
        listener: Listener,
    ) -> (ListenerId, Vec<EventRecord>) {
        let channel = self.channel(session_id).await;
        let mut channel = channel.lock().await;
        channel.next_listener_id += 1;
        let id = ListenerId(channel.next_listener_id);
        channel.listeners.push((id, listener));
        (id, channel.history.iter().cloned().collect())
    }

    pub async fn unsubscribe(&self, session_id: &str, listener_id: ListenerId) {
        let Some(channel) = self.sessions.read().await.get(session_id).cloned() else {
            return;
        };
        let mut channel = channel.lock().await;
        channel.listeners.retain(|(id, _)| *id != listener_id);
    }

    /// Append to the replay buffer, then deliver to every listener in
    /// subscription order. Failed listeners are removed within this call.
    pub async fn publish(&self, session_id: &str, event: EventRecord) {
        let channel = self.channel(session_id).await;
        let mut channel = channel.lock().await;

        channel.history.push_back(event.clone());
        while channel.history.len() > MAX_HISTORY {
            channel.history.pop_front();
        }

        let mut dead = Vec::new();
        for (id, listener) in &channel.listeners {
            if let Err(err) = listener(event.clone()).await {
                tracing::warn!(session_id, error = %err, "event_listener_failed");
                dead.push(*id);
            }
        }
        channel.listeners.retain(|(id, _)| !dead.contains(id));
    }

    /// Snapshot of the replay buffer, oldest first.
    pub async fn history(&self, session_id: &str) -> Vec<EventRecord> {
        match self.sessions.read().await.get(session_id) {
            Some(channel) => channel.lock().await.history.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Publish-bound handle used by workflow stages.
    pub fn publisher(&self, session_id: &str) -> EventPublisher {
        EventPublisher {
            bus: self.clone(),
            session_id: session_id.to_string(),
        }
    }

    pub async fn cleanup(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

/// Cloneable handle that stamps and publishes events onto one session's
/// channel.
#[derive(Clone)]
pub struct EventPublisher {
    bus: EventBus,
    session_id: String,
}

impl EventPublisher {
    pub async fn emit(&self, payload: EventPayload) {
        self.bus
            .publish(&self.session_id, EventRecord::new(payload))
            .await;
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn progress(step: u32) -> EventRecord {
        EventRecord::new(EventPayload::WorkflowProgress {
            step,
            total_steps: 5,
            status: "designing".to_string(),
            message: format!("step {step}"),
        })
    }

    fn collecting_listener(sink: Arc<Mutex<Vec<u32>>>) -> Listener {
        Arc::new(move |event: EventRecord| {
            let sink = sink.clone();
            Box::pin(async move {
                if let EventPayload::WorkflowProgress { step, .. } = event.payload {
                    sink.lock().await.push(step);
                }
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn listeners_observe_publication_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("s1", collecting_listener(seen.clone())).await;
        for step in 0..10 {
            bus.publish("s1", progress(step)).await;
        }
        assert_eq!(*seen.lock().await, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn replay_buffer_is_capped_fifo() {
        let bus = EventBus::new();
        for step in 0..150u32 {
            bus.publish("s1", progress(step)).await;
        }
        let history = bus.history("s1").await;
        assert_eq!(history.len(), 100);
        match &history[0].payload {
            EventPayload::WorkflowProgress { step, .. } => assert_eq!(*step, 50),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn history_plus_live_events_equals_publication_order() {
        // Replay equivalence: a late joiner's history frame concatenated with
        // the events it then observes live is the full publication order.
        let bus = EventBus::new();
        for step in 0..5 {
            bus.publish("s1", progress(step)).await;
        }
        let replay: Vec<u32> = bus
            .history("s1")
            .await
            .iter()
            .map(|e| match &e.payload {
                EventPayload::WorkflowProgress { step, .. } => *step,
                _ => unreachable!(),
            })
            .collect();

        let live = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("s1", collecting_listener(live.clone())).await;
        for step in 5..8 {
            bus.publish("s1", progress(step)).await;
        }

        let mut combined = replay;
        combined.extend(live.lock().await.iter());
        assert_eq!(combined, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failing_listener_is_removed_and_others_still_deliver() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_listener = calls.clone();
        let failing: Listener = Arc::new(move |_| {
            calls_in_listener.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { anyhow::bail!("socket closed") })
        });
        let seen = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("s1", failing).await;
        bus.subscribe("s1", collecting_listener(seen.clone())).await;

        bus.publish("s1", progress(1)).await;
        bus.publish("s1", progress(2)).await;

        // The failing listener saw exactly one event before removal; the
        // healthy one saw both.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn subscribe_with_history_snapshots_and_streams() {
        let bus = EventBus::new();
        bus.publish("s1", progress(1)).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (_, history) = bus
            .subscribe_with_history("s1", collecting_listener(seen.clone()))
            .await;
        assert_eq!(history.len(), 1);
        bus.publish("s1", progress(2)).await;
        assert_eq!(*seen.lock().await, vec![2]);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = bus.subscribe("s1", collecting_listener(seen.clone())).await;
        bus.publish("s1", progress(1)).await;
        bus.unsubscribe("s1", id).await;
        bus.publish("s1", progress(2)).await;
        assert_eq!(*seen.lock().await, vec![1]);
    }

    #[tokio::test]
    async fn cleanup_frees_history_and_listeners() {
        let bus = EventBus::new();
        bus.publish("s1", progress(1)).await;
        bus.cleanup("s1").await;
        assert!(bus.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let bus = EventBus::new();
        bus.publish("a", progress(1)).await;
        bus.publish("b", progress(2)).await;
        assert_eq!(bus.history("a").await.len(), 1);
        assert_eq!(bus.history("b").await.len(), 1);
    }
}
