//! Host event bus — typed notifications from the host application.
//!
//! The host publishes when a message arrives or the active conversation
//! changes. The session coordinator subscribes and routes each kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All host events the core reacts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostEvent {
    /// A new message was appended to the active conversation
    MessageReceived {
        message_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// The user switched to another conversation
    ConversationChanged {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A new conversation was started
    ConversationCreated {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl HostEvent {
    pub fn message_received(message_index: usize) -> Self {
        HostEvent::MessageReceived {
            message_index,
            timestamp: Utc::now(),
        }
    }

    pub fn conversation_changed(conversation_id: impl Into<String>) -> Self {
        HostEvent::ConversationChanged {
            conversation_id: conversation_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn conversation_created(conversation_id: impl Into<String>) -> Self {
        HostEvent::ConversationCreated {
            conversation_id: conversation_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A broadcast-based event bus for host events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<HostEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: HostEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HostEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(HostEvent::conversation_changed("chat-2"));

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            HostEvent::ConversationChanged { conversation_id, .. } => {
                assert_eq!(conversation_id, "chat-2");
            }
            _ => panic!("Expected ConversationChanged event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(HostEvent::message_received(3));
    }
}
