use std::time::Duration;

use envconfig::Envconfig;

/// Where and how phone numbers are produced.
#[derive(Envconfig, Clone, Debug)]
pub struct KafkaConfig {
    // Comma separated host:port list
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    #[envconfig(default = "test-topic")]
    pub kafka_topic: String,

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    // Startup fails if the brokers do not answer a metadata request within this
    #[envconfig(default = "10000")]
    pub kafka_metadata_timeout_ms: u64,

    // Retry budget per message before its delivery fails
    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32,

    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32,

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32,

    #[envconfig(default = "10000000")]
    pub kafka_producer_queue_messages: u32,

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd
}

impl KafkaConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.kafka_metadata_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use envconfig::Envconfig;

    use super::KafkaConfig;

    #[test]
    fn defaults_point_at_local_broker() {
        let config = KafkaConfig::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.kafka_hosts, "localhost:9092");
        assert_eq!(config.kafka_topic, "test-topic");
        assert_eq!(config.metadata_timeout(), Duration::from_secs(10));
        assert_eq!(config.kafka_compression_codec, "none");
        assert!(!config.kafka_tls);
    }

    #[test]
    fn topic_and_hosts_are_overridable() {
        let env = HashMap::from([
            (
                "KAFKA_HOSTS".to_string(),
                "kafka-1:9092,kafka-2:9092".to_string(),
            ),
            ("KAFKA_TOPIC".to_string(), "phone_numbers".to_string()),
            ("KAFKA_METADATA_TIMEOUT_MS".to_string(), "750".to_string()),
            ("KAFKA_TLS".to_string(), "true".to_string()),
        ]);
        let config = KafkaConfig::init_from_hashmap(&env).unwrap();
        assert_eq!(config.kafka_hosts, "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.kafka_topic, "phone_numbers");
        assert_eq!(config.metadata_timeout(), Duration::from_millis(750));
        assert!(config.kafka_tls);
    }
}
