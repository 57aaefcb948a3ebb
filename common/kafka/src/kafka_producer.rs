use crate::config::KafkaConfig;

use metrics::{counter, gauge};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, Producer};
use rdkafka::ClientConfig;
use tracing::{debug, error, info, warn};

pub struct KafkaContext;

impl rdkafka::ClientContext for KafkaContext {
    fn stats(&self, stats: rdkafka::Statistics) {
        gauge!("kafka_callback_queue_depth").set(stats.replyq as f64);
        gauge!("kafka_producer_queue_depth").set(stats.msg_cnt as f64);
        gauge!("kafka_producer_queue_depth_limit").set(stats.msg_max as f64);
        gauge!("kafka_producer_queue_bytes").set(stats.msg_size as f64);
        gauge!("kafka_producer_queue_bytes_limit").set(stats.msg_size_max as f64);

        for (topic, stats) in stats.topics {
            gauge!(
                "kafka_produce_avg_batch_size_events",
                "topic" => topic
            )
            .set(stats.batchcnt.avg as f64);
        }

        for (_, stats) in stats.brokers {
            let id_string = format!("{}", stats.nodeid);
            gauge!(
                "kafka_broker_requests_pending",
                "broker" => id_string.clone()
            )
            .set(stats.outbuf_cnt as f64);
            gauge!(
                "kafka_broker_responses_awaiting",
                "broker" => id_string.clone()
            )
            .set(stats.waitresp_cnt as f64);
            counter!(
                "kafka_broker_tx_errors_total",
                "broker" => id_string
            )
            .absolute(stats.txerrs);
        }
    }
}

/// librdkafka settings for a producer, stats reported every ten seconds.
pub fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    for (key, value) in [
        ("bootstrap.servers", config.kafka_hosts.clone()),
        ("statistics.interval.ms", "10000".to_string()),
        ("linger.ms", config.kafka_producer_linger_ms.to_string()),
        (
            "message.timeout.ms",
            config.kafka_message_timeout_ms.to_string(),
        ),
        ("compression.codec", config.kafka_compression_codec.clone()),
        (
            "queue.buffering.max.kbytes",
            (config.kafka_producer_queue_mib * 1024).to_string(),
        ),
        (
            "queue.buffering.max.messages",
            config.kafka_producer_queue_messages.to_string(),
        ),
    ] {
        client_config.set(key, value);
    }

    if config.kafka_tls {
        client_config
            .set("security.protocol", "ssl")
            .set("enable.ssl.certificate.verification", "false");
    }

    client_config
}

/// Creates the producer and asks the brokers for the configured topic's
/// metadata, so an unreachable cluster fails here rather than on the first
/// delivery. Blocks for at most `kafka_metadata_timeout_ms`.
pub fn create_kafka_producer(
    config: &KafkaConfig,
) -> Result<FutureProducer<KafkaContext>, KafkaError> {
    let client_config = client_config(config);
    debug!("rdkafka configuration: {:?}", client_config);
    let producer: FutureProducer<KafkaContext> = client_config.create_with_context(KafkaContext)?;

    let metadata = producer
        .client()
        .fetch_metadata(Some(&config.kafka_topic), config.metadata_timeout())
        .map_err(|e| {
            error!(hosts = %config.kafka_hosts, "kafka brokers unreachable: {}", e);
            e
        })?;

    match metadata
        .topics()
        .iter()
        .find(|topic| topic.name() == config.kafka_topic)
    {
        Some(topic) if topic.error().is_none() => info!(
            topic = %config.kafka_topic,
            partitions = topic.partitions().len(),
            "connected to kafka at {}",
            config.kafka_hosts
        ),
        _ => warn!(
            topic = %config.kafka_topic,
            "connected to kafka at {}, topic metadata not available yet",
            config.kafka_hosts
        ),
    }

    Ok(producer)
}
