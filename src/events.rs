//! Detection events and the pub/sub bus that delivers them.
//!
//! Events represent things that have happened (past tense). They are
//! broadcast to all subscribers in arrival order; each subscriber sees the
//! same ordered stream, so "process results in the order the transport
//! delivered them" holds without closures capturing mutable state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

/// Events raised by the detection pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionEvent {
    /// The active letter target was signed with sufficient confidence
    LetterDetected(String),

    /// The active word target was signed with sufficient confidence
    WordDetected(String),

    /// A recognition result arrived; fired for every result, match or not,
    /// to drive live UI feedback such as a confidence meter
    ConfidenceUpdate {
        confidence: f64,
        detected: Option<String>,
    },

    /// Backend connection came up or went down
    ConnectionChange(bool),
}

impl DetectionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            DetectionEvent::LetterDetected(letter) => {
                format!("Letter detected: {}", letter)
            }
            DetectionEvent::WordDetected(word) => {
                format!("Word detected: {}", word)
            }
            DetectionEvent::ConfidenceUpdate {
                confidence,
                detected,
            } => match detected {
                Some(value) => format!("Confidence {:.1}% for {}", confidence * 100.0, value),
                None => format!("Confidence {:.1}%", confidence * 100.0),
            },
            DetectionEvent::ConnectionChange(true) => "Backend connected".to_string(),
            DetectionEvent::ConnectionChange(false) => "Backend disconnected".to_string(),
        }
    }
}

/// Opaque handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<DetectionEvent>,
}

/// Fan-out of pipeline events to any number of consumers
///
/// Multiple game screens can listen at once (the game flow and a confidence
/// meter, say); each subscription owns an unbounded channel, so a slow
/// consumer never stalls the worker or the other subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription; the id is needed to close it again
    pub fn subscribe(&self) -> (Receiver<DetectionEvent>, SubscriberId) {
        let (tx, rx) = unbounded();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscriber { id, sender: tx });
        (rx, id)
    }

    /// Close a subscription; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Deliver one event to every live subscriber. Subscriptions whose
    /// receiver was dropped without an unsubscribe are pruned here.
    pub fn publish(&self, event: DetectionEvent) {
        self.subscribers
            .write()
            .retain(|s| s.sender.try_send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let (_rx_a, id_a) = bus.subscribe();
        let (_rx_b, id_b) = bus.subscribe();
        assert_ne!(id_a, id_b);
        assert_eq!(bus.subscriber_count(), 2);

        bus.unsubscribe(id_a);
        assert_eq!(bus.subscriber_count(), 1);

        // Unknown ids are a no-op
        bus.unsubscribe(id_a);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_every_subscriber_gets_its_own_stream() {
        let bus = EventBus::new();
        let (rx_a, _) = bus.subscribe();
        let (rx_b, _) = bus.subscribe();

        bus.publish(DetectionEvent::ConnectionChange(true));

        assert_eq!(
            rx_a.try_recv().unwrap(),
            DetectionEvent::ConnectionChange(true)
        );
        assert_eq!(
            rx_b.try_recv().unwrap(),
            DetectionEvent::ConnectionChange(true)
        );
    }

    #[test]
    fn test_events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let (rx, _) = bus.subscribe();

        let sequence = vec![
            DetectionEvent::ConfidenceUpdate {
                confidence: 0.4,
                detected: Some("A".to_string()),
            },
            DetectionEvent::ConfidenceUpdate {
                confidence: 0.9,
                detected: Some("B".to_string()),
            },
            DetectionEvent::LetterDetected("B".to_string()),
        ];
        for event in &sequence {
            bus.publish(event.clone());
        }

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received, sequence);
    }

    #[test]
    fn test_dropped_receiver_is_pruned_on_publish() {
        let bus = EventBus::new();
        let (rx, _) = bus.subscribe();
        let (rx_live, _) = bus.subscribe();
        drop(rx);

        bus.publish(DetectionEvent::ConnectionChange(false));

        assert_eq!(bus.subscriber_count(), 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[test]
    fn test_event_description() {
        let event = DetectionEvent::WordDetected("HELLO".to_string());
        assert_eq!(event.description(), "Word detected: HELLO");

        let event = DetectionEvent::ConfidenceUpdate {
            confidence: 0.25,
            detected: None,
        };
        assert_eq!(event.description(), "Confidence 25.0%");
    }
}
