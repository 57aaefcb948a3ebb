use async_trait::async_trait;
use common_kafka::config::KafkaConfig;
use common_kafka::kafka_producer::{create_kafka_producer, KafkaContext};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{error, instrument};

use crate::errors::SinkError;
use crate::producer::OutboundMessage;
use crate::sinks::{Delivery, Sink};

pub struct KafkaSink {
    producer: FutureProducer<KafkaContext>,
}

impl KafkaSink {
    /// Fails if the brokers cannot be reached within the metadata timeout.
    pub fn new(config: &KafkaConfig) -> Result<KafkaSink, KafkaError> {
        let producer = create_kafka_producer(config)?;
        Ok(KafkaSink { producer })
    }
}

#[async_trait]
impl Sink for KafkaSink {
    #[instrument(skip_all)]
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, SinkError> {
        // No key, partitioning is left to the client
        let record =
            FutureRecord::<(), str>::to(&message.topic).payload(message.payload.as_str());

        let ack = match self.producer.send_result(record) {
            Ok(ack) => ack,
            Err((e, _)) => {
                error!("failed to enqueue message: {}", e);
                return Err(SinkError::Kafka(e));
            }
        };

        match ack.await {
            // Cancelled due to timeout while retrying
            Err(_) => Err(SinkError::Canceled),
            Ok(Err((err, _))) => Err(SinkError::Kafka(err)),
            Ok(Ok((partition, offset))) => Ok(Delivery { partition, offset }),
        }
    }
}
