//! Fire-and-forget producer. Messages go into a bounded input channel, a
//! dispatch task hands each one to the [`Sink`] concurrently, and every outcome
//! is reported on one of two acknowledgment streams.
//!
//! Closing the producer drops whatever is still in flight: those messages are
//! reported on neither stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use metrics::counter;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::errors::{PublishError, SinkError};
use crate::metrics_consts::{IN_FLIGHT_DROPPED, MESSAGES_PUBLISHED};
use crate::sinks::{Delivery, Sink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug)]
pub struct ProducerSuccess {
    pub message: OutboundMessage,
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug)]
pub struct ProducerError {
    pub message: OutboundMessage,
    pub error: SinkError,
}

/// Receiving ends of the acknowledgment streams. Both close once the producer
/// is closed and no delivery is left holding a sender.
pub struct AckStreams {
    pub successes: mpsc::UnboundedReceiver<ProducerSuccess>,
    pub errors: mpsc::UnboundedReceiver<ProducerError>,
}

/// Input side of the producer.
#[derive(Clone)]
pub struct Publisher {
    input: mpsc::Sender<OutboundMessage>,
    in_flight: Arc<AtomicUsize>,
}

impl Publisher {
    /// Queues one message without waiting for its acknowledgment. Only waits
    /// when the input buffer is full.
    pub async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        // Counted before sending, the delivery may complete before send returns
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if let Err(mpsc::error::SendError(message)) =
            self.input.send(OutboundMessage::new(topic, payload)).await
        {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return Err(PublishError::Closed {
                topic: message.topic,
            });
        }

        counter!(MESSAGES_PUBLISHED).increment(1);
        Ok(())
    }
}

pub struct AsyncProducer {
    publisher: Publisher,
    dispatcher: JoinHandle<usize>,
    shutdown: oneshot::Sender<()>,
}

impl AsyncProducer {
    /// Spawns the dispatch task. `buffer` is the capacity of the input channel.
    pub fn start<S: Sink>(sink: S, buffer: usize) -> (AsyncProducer, AckStreams) {
        let (input_tx, input_rx) = mpsc::channel(buffer.max(1));
        let (success_tx, success_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let dispatcher = tokio::spawn(dispatch_loop(
            Arc::new(sink),
            input_rx,
            shutdown_rx,
            success_tx,
            error_tx,
            in_flight.clone(),
        ));

        (
            AsyncProducer {
                publisher: Publisher {
                    input: input_tx,
                    in_flight,
                },
                dispatcher,
                shutdown: shutdown_tx,
            },
            AckStreams {
                successes: success_rx,
                errors: error_rx,
            },
        )
    }

    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Messages published but not yet acknowledged on either stream.
    pub fn in_flight(&self) -> usize {
        self.publisher.in_flight.load(Ordering::Relaxed)
    }

    /// Stops the dispatch task and every outstanding delivery, closing both
    /// acknowledgment streams. Returns how many messages were dropped
    /// unacknowledged: deliveries cancelled before finishing plus anything
    /// still queued in the input buffer.
    pub async fn close(self) -> usize {
        let AsyncProducer {
            publisher,
            dispatcher,
            shutdown,
        } = self;
        drop(publisher);

        if shutdown.send(()).is_err() {
            debug!("producer dispatch task already stopped");
        }
        let dropped = match dispatcher.await {
            Ok(dropped) => dropped,
            Err(e) => {
                error!("producer dispatch task failed: {:?}", e);
                0
            }
        };

        if dropped > 0 {
            warn!("closed producer with {} messages in flight", dropped);
            counter!(IN_FLIGHT_DROPPED).increment(dropped as u64);
        }
        debug!("producer closed");
        dropped
    }
}

/// Runs until shutdown is requested, then cancels what is left and returns how
/// many messages were never acknowledged.
async fn dispatch_loop<S: Sink>(
    sink: Arc<S>,
    mut input: mpsc::Receiver<OutboundMessage>,
    mut shutdown: oneshot::Receiver<()>,
    successes: mpsc::UnboundedSender<ProducerSuccess>,
    errors: mpsc::UnboundedSender<ProducerError>,
    in_flight: Arc<AtomicUsize>,
) -> usize {
    let mut deliveries = JoinSet::new();
    let mut accepting = true;

    loop {
        tokio::select! {
            // A dropped sender counts as a request too
            _ = &mut shutdown => break,
            message = input.recv(), if accepting => match message {
                Some(message) => {
                    deliveries.spawn(deliver(
                        sink.clone(),
                        message,
                        successes.clone(),
                        errors.clone(),
                        in_flight.clone(),
                    ));
                }
                None => accepting = false,
            },
            Some(res) = deliveries.join_next(), if !deliveries.is_empty() => {
                if let Err(e) = res {
                    if e.is_panic() {
                        error!("delivery task panicked: {:?}", e);
                    }
                }
            }
        }
    }

    // A delivery that already sent its acknowledgment finishes normally, so
    // only the cancelled ones are counted
    deliveries.abort_all();
    let mut dropped = 0;
    while let Some(res) = deliveries.join_next().await {
        match res {
            Err(e) if e.is_cancelled() => dropped += 1,
            Err(e) => error!("delivery task panicked: {:?}", e),
            Ok(()) => {}
        }
    }

    input.close();
    while input.try_recv().is_ok() {
        dropped += 1;
    }
    in_flight.fetch_sub(dropped, Ordering::Relaxed);

    dropped
}

async fn deliver<S: Sink>(
    sink: Arc<S>,
    message: OutboundMessage,
    successes: mpsc::UnboundedSender<ProducerSuccess>,
    errors: mpsc::UnboundedSender<ProducerError>,
    in_flight: Arc<AtomicUsize>,
) {
    let result = sink.deliver(&message).await;
    in_flight.fetch_sub(1, Ordering::Relaxed);

    let sent = match result {
        Ok(Delivery { partition, offset }) => successes
            .send(ProducerSuccess {
                message,
                partition,
                offset,
            })
            .is_ok(),
        Err(error) => errors.send(ProducerError { message, error }).is_ok(),
    };
    if !sent {
        debug!("acknowledgment stream closed, outcome dropped");
    }
}
