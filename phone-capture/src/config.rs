use std::path::PathBuf;
use std::time::Duration;

use common_kafka::config::KafkaConfig;
use envconfig::Envconfig;
use tracing::Level;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(default = "reader/input.txt")]
    pub input_path: PathBuf,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    // Time given to in-flight messages after the input is exhausted, before the
    // producer is closed
    #[envconfig(default = "2000")]
    pub drain_delay_ms: u64,

    #[envconfig(default = "256")]
    pub producer_buffer: usize, // Capacity of the producer input channel

    #[envconfig(default = "false")]
    pub print_sink: bool,

    #[envconfig(default = "false")]
    pub export_prometheus: bool,

    #[envconfig(default = "9090")]
    pub metrics_port: u16,

    #[envconfig(default = "info")]
    pub log_level: Level,
}

impl Config {
    pub fn drain_delay(&self) -> Duration {
        Duration::from_millis(self.drain_delay_ms)
    }
}
