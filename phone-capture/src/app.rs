use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::AsyncBufRead;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::lines::{LineSource, PairBuilder};
use crate::listeners::{spawn_error_listener, spawn_success_listener};
use crate::metrics_consts::{BLANK_LINES, LINES_READ, MATCHES_FOUND};
use crate::producer::{AsyncProducer, Publisher};
use crate::sinks::kafka::KafkaSink;
use crate::sinks::print::PrintSink;
use crate::sinks::Sink;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub topic: String,
    pub drain_delay: Duration,
    pub producer_buffer: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        PipelineSettings {
            topic: config.kafka.kafka_topic.clone(),
            drain_delay: config.drain_delay(),
            producer_buffer: config.producer_buffer,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub published: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped_in_flight: usize,
}

/// Opens the input, connects the sink and runs the pipeline to completion.
/// Failing to open the input or to reach the brokers aborts before anything
/// is published.
pub async fn run(config: Config) -> anyhow::Result<RunSummary> {
    if config.export_prometheus {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("failed to install prometheus exporter")?;
        info!("metrics server listening on {}", metrics_addr);
    }

    let source = LineSource::open(&config.input_path)
        .await
        .with_context(|| format!("failed to open file {}", config.input_path.display()))?;

    let settings = PipelineSettings::from(&config);
    let summary = if config.print_sink {
        run_pipeline(source, PrintSink::default(), &settings).await?
    } else {
        let sink = KafkaSink::new(&config.kafka).context("failed to start Kafka producer")?;
        run_pipeline(source, sink, &settings).await?
    };

    Ok(summary)
}

/// Feeds every match of `source` to a producer on top of `sink`, waits the
/// fixed drain delay and closes the producer.
///
/// The drain delay is the only thing giving deliveries time to finish;
/// anything still in flight when it runs out is dropped and counted in
/// [`RunSummary::dropped_in_flight`]. A read error stops the scan but the
/// shutdown sequence still runs before it is returned.
pub async fn run_pipeline<R, S>(
    mut source: LineSource<R>,
    sink: S,
    settings: &PipelineSettings,
) -> Result<RunSummary, PipelineError>
where
    R: AsyncBufRead + Unpin,
    S: Sink,
{
    let (producer, acks) = AsyncProducer::start(sink, settings.producer_buffer);
    let success_listener = spawn_success_listener(acks.successes);
    let error_listener = spawn_error_listener(acks.errors);

    let mut summary = RunSummary::default();
    let publisher = producer.publisher();
    let scanned = scan(&mut source, &publisher, &settings.topic, &mut summary).await;
    drop(publisher);

    if let Err(e) = &scanned {
        error!("stopped reading input: {}", e);
    }

    info!(
        "published {} messages from {} lines, waiting {:?} for in-flight messages",
        summary.published, summary.lines_read, settings.drain_delay
    );
    tokio::time::sleep(settings.drain_delay).await;

    summary.dropped_in_flight = producer.close().await;
    summary.delivered = join_listener("success", success_listener).await;
    summary.failed = join_listener("error", error_listener).await;
    drop(source);

    info!(
        "delivered {}, failed {}, dropped {} in flight",
        summary.delivered, summary.failed, summary.dropped_in_flight
    );

    scanned.map(|()| summary)
}

async fn scan<R: AsyncBufRead + Unpin>(
    source: &mut LineSource<R>,
    publisher: &Publisher,
    topic: &str,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    let mut pairs = PairBuilder::new();

    while let Some(line) = source.next_line().await? {
        summary.lines_read += 1;
        counter!(LINES_READ).increment(1);
        if line.is_empty() {
            counter!(BLANK_LINES).increment(1);
        }

        let numbers = pairs.push(&line);
        counter!(MATCHES_FOUND).increment(numbers.len() as u64);
        for number in numbers {
            publisher.publish(topic, &number).await?;
            summary.published += 1;
        }
    }

    Ok(())
}

async fn join_listener(name: &str, listener: JoinHandle<u64>) -> u64 {
    match listener.await {
        Ok(count) => count,
        Err(e) => {
            error!("{} listener failed: {:?}", name, e);
            0
        }
    }
}
