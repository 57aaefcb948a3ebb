use metrics::counter;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::metrics_consts::{DELIVERIES_FAILED, DELIVERIES_SUCCEEDED};
use crate::producer::{ProducerError, ProducerSuccess};

/// Logs every delivered message until the success stream closes, then returns
/// how many were seen.
pub fn spawn_success_listener(mut successes: UnboundedReceiver<ProducerSuccess>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(ack) = successes.recv().await {
            info!(
                partition = ack.partition,
                offset = ack.offset,
                "message sent: {}",
                ack.message.payload
            );
            counter!(DELIVERIES_SUCCEEDED).increment(1);
            delivered += 1;
        }
        debug!("success stream closed after {} deliveries", delivered);
        delivered
    })
}

/// Logs every failed delivery until the error stream closes, then returns how
/// many were seen. Failures are not retried.
pub fn spawn_error_listener(mut errors: UnboundedReceiver<ProducerError>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut failed = 0;
        while let Some(ack) = errors.recv().await {
            error!(topic = %ack.message.topic, "failed to send message: {}", ack.error);
            counter!(DELIVERIES_FAILED).increment(1);
            failed += 1;
        }
        debug!("error stream closed after {} failures", failed);
        failed
    })
}
