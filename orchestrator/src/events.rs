//! In-process event bus for stage lifecycle notifications
//!
//! Supplemented feature (not named explicitly in `spec.md`'s component
//! list, but implied by 5: "the runtime must provide cooperative
//! cancellation" and by the UI push channel being out-of-scope but
//! needing *something* in-process to subscribe to). Grounded on the
//! teacher's `tokio::sync::mpsc` channel usage in `td/src/llm/client.rs`'s
//! `stream` method.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
pub enum StageEvent {
    StageStarted { session_id: String, stage_id: String },
    StageCompleted { session_id: String, stage_id: String, duration_ms: u64, fallback_used: bool, model_used: String },
    StageFallback { session_id: String, stage_id: String, reason: String },
}

pub struct EventBus {
    sender: broadcast::Sender<StageEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.sender.subscribe()
    }

    /// No-op (with a debug log) when nothing is subscribed - publishing
    /// must never fail the pipeline.
    pub fn publish(&self, event: StageEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(16);
        let mut receiver = bus.subscribe();
        bus.publish(StageEvent::StageStarted { session_id: "s1".into(), stage_id: "mode_selector".into() });
        let event = receiver.recv().await.unwrap();
        match event {
            StageEvent::StageStarted { session_id, stage_id } => {
                assert_eq!(session_id, "s1");
                assert_eq!(stage_id, "mode_selector");
            }
            _ => panic!("wrong event variant"),
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(StageEvent::StageFallback { session_id: "s1".into(), stage_id: "context_enricher".into(), reason: "parse failure".into() });
    }
}
