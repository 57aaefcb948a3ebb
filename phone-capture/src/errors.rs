use rdkafka::error::KafkaError;
use thiserror::Error;

/// Why a single message could not be delivered. Reported on the error
/// acknowledgment stream, never to the caller of `publish`.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to produce to kafka: {0}")]
    Kafka(#[from] KafkaError),
    #[error("failed to produce to kafka (timeout)")]
    Canceled,
    #[error("message rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("producer is closed, message for topic {topic} dropped")]
    Closed { topic: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("error reading input: {0}")]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Publish(#[from] PublishError),
}
