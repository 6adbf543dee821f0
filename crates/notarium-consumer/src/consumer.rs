//! Event-consumer loop.
//!
//! Subscribes to the note-changed topic and drives each delivery through
//! the ingestion pipeline. Success acknowledges the message; any failure —
//! decode error, pipeline error, or a panic caught at the message boundary
//! — rejects it and lets the bus redeliver. The loop itself never dies to
//! a bad message.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use notarium_core::{defaults, Delivery, Error, MessageBus, NoteChangedEvent, Result, Subscription};

use crate::pipeline::NoteIngestor;

/// Configuration for the consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Topic carrying note-changed events.
    pub topic: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            topic: defaults::NOTE_CHANGED_TOPIC.to_string(),
        }
    }
}

impl ConsumerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTARIUM_NOTE_TOPIC` | `note.changed` | Topic to subscribe to |
    pub fn from_env() -> Self {
        let topic = std::env::var("NOTARIUM_NOTE_TOPIC")
            .unwrap_or_else(|_| defaults::NOTE_CHANGED_TOPIC.to_string());
        Self { topic }
    }

    /// Set the topic to subscribe to.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }
}

/// Handle for controlling a running consumer.
pub struct ConsumerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signal the consumer to shut down and wait for the loop to drain.
    ///
    /// An in-flight delivery is rejected rather than acknowledged, so the
    /// bus redelivers it to the next consumer instance.
    pub async fn shutdown(self) -> Result<()> {
        // A send error means the loop already stopped, which is fine.
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| Error::Internal(format!("Consumer task failed: {}", e)))?;
        Ok(())
    }
}

/// Consumer that drains a note-changed subscription.
pub struct Consumer {
    bus: MessageBus,
    ingestor: Arc<dyn NoteIngestor>,
    config: ConsumerConfig,
}

impl Consumer {
    /// Create a new consumer over the given bus and pipeline.
    pub fn new(bus: MessageBus, ingestor: Arc<dyn NoteIngestor>, config: ConsumerConfig) -> Self {
        Self {
            bus,
            ingestor,
            config,
        }
    }

    /// Open the subscription and start the receive loop.
    pub fn start(self) -> Result<ConsumerHandle> {
        let subscription = self.bus.subscribe(&self.config.topic)?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let ingestor = self.ingestor;
        let topic = self.config.topic;

        let join = tokio::spawn(async move {
            run(subscription, ingestor, shutdown_rx, topic).await;
        });

        Ok(ConsumerHandle { shutdown_tx, join })
    }
}

async fn run(
    mut subscription: Subscription,
    ingestor: Arc<dyn NoteIngestor>,
    mut shutdown_rx: mpsc::Receiver<()>,
    topic: String,
) {
    info!(
        subsystem = "consumer",
        component = "consumer",
        topic = %topic,
        "Consumer started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(topic = %topic, "Consumer received shutdown signal");
                break;
            }
            maybe = subscription.recv() => {
                let Some(delivery) = maybe else {
                    warn!(topic = %topic, "Topic closed, stopping consumer");
                    break;
                };
                // Shutdown raced the receive: reject without processing
                // so the message is redelivered elsewhere.
                if shutdown_rx.try_recv().is_ok() {
                    warn!(topic = %topic, "Shutdown during receive, rejecting in-flight message");
                    delivery.nack();
                    break;
                }
                process_delivery(ingestor.clone(), delivery).await;
            }
        }
    }

    info!(topic = %topic, "Consumer stopped");
}

/// Process one delivery: decode, ingest, ack/nack.
///
/// The pipeline runs in its own task so an unexpected panic is caught at
/// the join point and converted into a rejection instead of killing the
/// consume loop.
async fn process_delivery(ingestor: Arc<dyn NoteIngestor>, delivery: Delivery) {
    let attempt = delivery.attempt();

    let event: NoteChangedEvent = match serde_json::from_slice(delivery.payload()) {
        Ok(event) => event,
        Err(e) => {
            // Malformed input never becomes processable; still reject (not
            // drop) so the bus's redelivery limit applies.
            warn!(
                attempt,
                error = %e,
                "Malformed event payload, rejecting"
            );
            delivery.nack();
            return;
        }
    };

    let note_id: Uuid = event.note_id;
    let task = tokio::spawn(async move { ingestor.ingest(note_id).await });

    match task.await {
        Ok(Ok(())) => {
            delivery.ack();
        }
        Ok(Err(e)) => {
            warn!(
                note_id = %note_id,
                attempt,
                error = %e,
                "Ingest failed, rejecting for redelivery"
            );
            delivery.nack();
        }
        Err(join_err) => {
            error!(
                note_id = %note_id,
                attempt,
                error = %join_err,
                "Ingest task panicked, rejecting"
            );
            delivery.nack();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notarium_core::{BusConfig, Result};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Succeed,
        Fail,
        Panic,
    }

    struct StubIngestor {
        mode: Mutex<Mode>,
        calls: AtomicU32,
        seen: Mutex<Vec<Uuid>>,
    }

    impl StubIngestor {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode: Mutex::new(mode),
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn set_mode(&self, mode: Mode) {
            *self.mode.lock().unwrap() = mode;
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl NoteIngestor for StubIngestor {
        async fn ingest(&self, note_id: Uuid) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(note_id);
            // Drop the guard before panicking so the mutex stays usable
            // across redeliveries.
            let mode = *self.mode.lock().unwrap();
            match mode {
                Mode::Succeed => Ok(()),
                Mode::Fail => Err(Error::Embedding("stubbed failure".to_string())),
                Mode::Panic => panic!("stubbed panic"),
            }
        }
    }

    fn event_payload(note_id: Uuid) -> Vec<u8> {
        serde_json::to_vec(&NoteChangedEvent { note_id }).unwrap()
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within 1s");
    }

    fn start_consumer(
        bus: &MessageBus,
        ingestor: Arc<StubIngestor>,
    ) -> ConsumerHandle {
        Consumer::new(
            bus.clone(),
            ingestor,
            ConsumerConfig::default().with_topic("test.note.changed"),
        )
        .start()
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_ingest_acks() {
        let bus = MessageBus::new();
        let ingestor = StubIngestor::new(Mode::Succeed);
        let handle = start_consumer(&bus, ingestor.clone());

        let note_id = Uuid::new_v4();
        bus.publish("test.note.changed", event_payload(note_id)).unwrap();

        let i = ingestor.clone();
        wait_until(move || i.calls() == 1).await;
        assert_eq!(ingestor.seen.lock().unwrap().as_slice(), &[note_id]);

        // Acked: no redelivery shows up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ingestor.calls(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected_and_loop_survives() {
        let bus = MessageBus::with_config(BusConfig {
            max_redeliveries: Some(1),
        });
        let ingestor = StubIngestor::new(Mode::Succeed);
        let handle = start_consumer(&bus, ingestor.clone());

        bus.publish("test.note.changed", b"{not valid json".to_vec()).unwrap();
        bus.publish("test.note.changed", b"{\"wrong\":\"shape\"}".to_vec()).unwrap();

        // A subsequent well-formed message is still processed.
        let note_id = Uuid::new_v4();
        bus.publish("test.note.changed", event_payload(note_id)).unwrap();

        let i = ingestor.clone();
        wait_until(move || i.calls() == 1).await;
        assert_eq!(ingestor.seen.lock().unwrap().as_slice(), &[note_id]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_pipeline_failure_nacks_and_redelivery_retries() {
        // Unbounded redeliveries: the tight nack loop must not dead-letter
        // the message before the stub recovers.
        let bus = MessageBus::with_config(BusConfig {
            max_redeliveries: None,
        });
        let ingestor = StubIngestor::new(Mode::Fail);
        let handle = start_consumer(&bus, ingestor.clone());

        bus.publish("test.note.changed", event_payload(Uuid::new_v4())).unwrap();

        // First attempt fails and is redelivered.
        let i = ingestor.clone();
        wait_until(move || i.calls() >= 2).await;

        // Once the pipeline recovers, the redelivered message is acked.
        ingestor.set_mode(Mode::Succeed);
        let before = ingestor.calls();
        let i = ingestor.clone();
        wait_until(move || i.calls() > before).await;
        let settled = ingestor.calls();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ingestor.calls(), settled);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_nacked() {
        let bus = MessageBus::new();
        let ingestor = StubIngestor::new(Mode::Panic);
        let handle = start_consumer(&bus, ingestor.clone());

        bus.publish("test.note.changed", event_payload(Uuid::new_v4())).unwrap();

        // The panic is caught at the boundary and the message redelivered;
        // the loop keeps running.
        let i = ingestor.clone();
        wait_until(move || i.calls() >= 2).await;

        ingestor.set_mode(Mode::Succeed);
        let note_id = Uuid::new_v4();
        bus.publish("test.note.changed", event_payload(note_id)).unwrap();
        let i = ingestor.clone();
        wait_until(move || i.seen.lock().unwrap().contains(&note_id)).await;

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_delivery_processes_each_copy() {
        let bus = MessageBus::new();
        let ingestor = StubIngestor::new(Mode::Succeed);
        let handle = start_consumer(&bus, ingestor.clone());

        let note_id = Uuid::new_v4();
        bus.publish("test.note.changed", event_payload(note_id)).unwrap();
        bus.publish("test.note.changed", event_payload(note_id)).unwrap();

        let i = ingestor.clone();
        wait_until(move || i.calls() == 2).await;
        assert_eq!(ingestor.seen.lock().unwrap().as_slice(), &[note_id, note_id]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let bus = MessageBus::new();
        let ingestor = StubIngestor::new(Mode::Succeed);
        let handle = start_consumer(&bus, ingestor.clone());

        handle.shutdown().await.unwrap();

        // Dropping the subscription closes the topic, so a later publish
        // fails rather than queueing a message nobody will drain.
        let err = bus
            .publish("test.note.changed", event_payload(Uuid::new_v4()))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Bus(_)));
        assert_eq!(ingestor.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_consumer_on_same_topic_fails() {
        let bus = MessageBus::new();
        let first = Consumer::new(
            bus.clone(),
            StubIngestor::new(Mode::Succeed),
            ConsumerConfig::default().with_topic("t"),
        )
        .start()
        .unwrap();

        let second = Consumer::new(
            bus.clone(),
            StubIngestor::new(Mode::Succeed),
            ConsumerConfig::default().with_topic("t"),
        )
        .start();
        assert!(second.is_err());

        first.shutdown().await.unwrap();
    }

    #[test]
    fn test_consumer_config_default_topic() {
        let config = ConsumerConfig::default();
        assert_eq!(config.topic, defaults::NOTE_CHANGED_TOPIC);
    }

    #[test]
    fn test_consumer_config_with_topic() {
        let config = ConsumerConfig::default().with_topic("custom");
        assert_eq!(config.topic, "custom");
    }
}
