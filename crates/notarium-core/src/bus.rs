//! In-process message bus with at-least-once redelivery.
//!
//! An explicitly constructed, passed-in handle — there is no global
//! registry. Publishers push raw payloads onto a named topic; a subscriber
//! drains the topic and acknowledges or rejects each delivery. A rejected
//! delivery is re-enqueued at the back of the topic queue, so consumers must
//! tolerate receiving the same payload arbitrarily many times.
//!
//! The redelivery limit is the bus's explicit dead-letter policy: a
//! delivery rejected more than `max_redeliveries` times is dropped with an
//! error-level log record instead of circulating forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{defaults, Error, Result};

/// Bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Maximum delivery attempts per message. `None` redelivers forever.
    pub max_redeliveries: Option<u32>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_redeliveries: Some(defaults::BUS_MAX_REDELIVERIES),
        }
    }
}

struct QueuedMessage {
    payload: Vec<u8>,
    attempt: u32,
}

struct TopicState {
    tx: mpsc::UnboundedSender<QueuedMessage>,
    /// Taken by the first subscriber; a topic has at most one.
    rx: Option<mpsc::UnboundedReceiver<QueuedMessage>>,
}

impl TopicState {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

struct BusInner {
    topics: Mutex<HashMap<String, TopicState>>,
    config: BusConfig,
}

/// Cheaply cloneable handle to the bus.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    /// Create a bus with the default redelivery policy.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with an explicit redelivery policy.
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Publish a raw payload onto a topic.
    ///
    /// Messages published before anyone subscribes are retained and
    /// delivered once a subscription opens.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let mut topics = self
            .inner
            .topics
            .lock()
            .map_err(|_| Error::Bus("bus lock poisoned".to_string()))?;
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(TopicState::new);
        state
            .tx
            .send(QueuedMessage {
                payload,
                attempt: 1,
            })
            .map_err(|_| Error::Bus(format!("topic {} is closed", topic)))?;
        debug!(topic, "Published message");
        Ok(())
    }

    /// Open the subscription for a topic.
    ///
    /// Each topic supports a single subscriber; a second call for the same
    /// topic fails. Run one consumer per process and let storage-level
    /// atomicity handle cross-process concurrency.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let mut topics = self
            .inner
            .topics
            .lock()
            .map_err(|_| Error::Bus("bus lock poisoned".to_string()))?;
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(TopicState::new);
        let rx = state
            .rx
            .take()
            .ok_or_else(|| Error::Bus(format!("topic {} already has a subscriber", topic)))?;
        Ok(Subscription {
            topic: topic.to_string(),
            rx,
            requeue: state.tx.clone(),
            max_redeliveries: self.inner.config.max_redeliveries,
        })
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// An open subscription to one topic.
pub struct Subscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<QueuedMessage>,
    requeue: mpsc::UnboundedSender<QueuedMessage>,
    max_redeliveries: Option<u32>,
}

impl Subscription {
    /// Topic this subscription drains.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next delivery. Returns `None` if the topic is closed.
    pub async fn recv(&mut self) -> Option<Delivery> {
        let msg = self.rx.recv().await?;
        Some(Delivery {
            topic: self.topic.clone(),
            payload: msg.payload,
            attempt: msg.attempt,
            requeue: self.requeue.clone(),
            max_redeliveries: self.max_redeliveries,
        })
    }
}

/// A single delivery of a message. Must be either acked or nacked.
pub struct Delivery {
    topic: String,
    payload: Vec<u8>,
    attempt: u32,
    requeue: mpsc::UnboundedSender<QueuedMessage>,
    max_redeliveries: Option<u32>,
}

impl Delivery {
    /// Raw message payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Delivery attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Acknowledge successful processing. The message is done.
    pub fn ack(self) {
        debug!(topic = %self.topic, attempt = self.attempt, "Message acked");
    }

    /// Reject the delivery. The message is re-enqueued unless it has
    /// exhausted the redelivery limit, in which case it is dropped with an
    /// error-level record (the dead-letter hook).
    pub fn nack(self) {
        if let Some(max) = self.max_redeliveries {
            if self.attempt >= max {
                error!(
                    topic = %self.topic,
                    attempt = self.attempt,
                    "Message exceeded redelivery limit, dropping"
                );
                return;
            }
        }
        let attempt = self.attempt + 1;
        debug!(topic = %self.topic, attempt, "Message nacked, re-enqueueing");
        let _ = self.requeue.send(QueuedMessage {
            payload: self.payload,
            attempt,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_subscribe_retains_messages() {
        let bus = MessageBus::new();
        bus.publish("t", b"one".to_vec()).unwrap();
        bus.publish("t", b"two".to_vec()).unwrap();

        let mut sub = bus.subscribe("t").unwrap();
        let first = sub.recv().await.unwrap();
        assert_eq!(first.payload(), b"one");
        assert_eq!(first.attempt(), 1);
        first.ack();

        let second = sub.recv().await.unwrap();
        assert_eq!(second.payload(), b"two");
        second.ack();
    }

    #[tokio::test]
    async fn test_nack_redelivers_with_incremented_attempt() {
        let bus = MessageBus::new();
        let mut sub = bus.subscribe("t").unwrap();
        bus.publish("t", b"payload".to_vec()).unwrap();

        let d = sub.recv().await.unwrap();
        assert_eq!(d.attempt(), 1);
        d.nack();

        let redelivered = sub.recv().await.unwrap();
        assert_eq!(redelivered.payload(), b"payload");
        assert_eq!(redelivered.attempt(), 2);
        redelivered.ack();
    }

    #[tokio::test]
    async fn test_redelivery_limit_drops_message() {
        let bus = MessageBus::with_config(BusConfig {
            max_redeliveries: Some(2),
        });
        let mut sub = bus.subscribe("t").unwrap();
        bus.publish("t", b"poison".to_vec()).unwrap();

        sub.recv().await.unwrap().nack();
        // attempt 2 == limit: nack drops instead of re-enqueueing
        sub.recv().await.unwrap().nack();

        bus.publish("t", b"after".to_vec()).unwrap();
        let next = sub.recv().await.unwrap();
        assert_eq!(next.payload(), b"after");
        next.ack();
    }

    #[tokio::test]
    async fn test_acked_message_is_not_redelivered() {
        let bus = MessageBus::new();
        let mut sub = bus.subscribe("t").unwrap();
        bus.publish("t", b"once".to_vec()).unwrap();
        sub.recv().await.unwrap().ack();

        bus.publish("t", b"next".to_vec()).unwrap();
        let d = sub.recv().await.unwrap();
        assert_eq!(d.payload(), b"next");
        d.ack();
    }

    #[tokio::test]
    async fn test_second_subscriber_is_rejected() {
        let bus = MessageBus::new();
        let _sub = bus.subscribe("t").unwrap();
        let err = bus.subscribe("t").err().unwrap();
        assert!(err.to_string().contains("already has a subscriber"));
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let bus = MessageBus::new();
        let mut a = bus.subscribe("a").unwrap();
        let mut b = bus.subscribe("b").unwrap();
        bus.publish("a", b"for-a".to_vec()).unwrap();
        bus.publish("b", b"for-b".to_vec()).unwrap();

        assert_eq!(a.recv().await.unwrap().payload(), b"for-a");
        assert_eq!(b.recv().await.unwrap().payload(), b"for-b");
    }
}
