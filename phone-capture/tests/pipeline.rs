use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use phone_capture::app::{run_pipeline, PipelineSettings, RunSummary};
use phone_capture::errors::{PipelineError, SinkError};
use phone_capture::lines::LineSource;
use phone_capture::producer::OutboundMessage;
use phone_capture::sinks::{Delivery, Sink};
use tokio::io::{AsyncRead, BufReader, ReadBuf};

/// Records every message and acknowledges it after an optional delay.
#[derive(Clone, Default)]
struct RecordingSink {
    received: Arc<Mutex<Vec<OutboundMessage>>>,
    delay: Option<Duration>,
}

impl RecordingSink {
    fn slow(delay: Duration) -> Self {
        RecordingSink {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn payloads(&self) -> Vec<String> {
        let mut payloads: Vec<String> = self
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.payload.clone())
            .collect();
        payloads.sort();
        payloads
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut received = self.received.lock().unwrap();
        received.push(message.clone());
        Ok(Delivery {
            partition: 0,
            offset: received.len() as i64 - 1,
        })
    }
}

struct BrokerDown;

#[async_trait]
impl Sink for BrokerDown {
    async fn deliver(&self, _: &OutboundMessage) -> Result<Delivery, SinkError> {
        Err(SinkError::Rejected("all brokers down".to_string()))
    }
}

/// Yields `data` once, then fails every further read.
struct FailingReader {
    data: &'static [u8],
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.data.is_empty() {
            return Poll::Ready(Err(io::Error::other("input device went away")));
        }
        let n = this.data.len().min(buf.remaining());
        buf.put_slice(&this.data[..n]);
        this.data = &this.data[n..];
        Poll::Ready(Ok(()))
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        topic: "phone_numbers".to_string(),
        drain_delay: Duration::from_secs(2),
        producer_buffer: 4,
    }
}

fn source(input: &'static str) -> LineSource<&'static [u8]> {
    LineSource::from_reader(input.as_bytes())
}

#[tokio::test(start_paused = true)]
async fn publishes_matches_from_adjacent_lines() {
    let sink = RecordingSink::default();
    let summary = run_pipeline(
        source("Call 212-555-0100 now\nor 555.0101 later\n"),
        sink.clone(),
        &settings(),
    )
    .await
    .unwrap();

    // The first number is found again in the combined window
    assert_eq!(
        sink.payloads(),
        vec!["212-555-0100", "212-555-0100", "555.0101"]
    );
    assert!(sink
        .received
        .lock()
        .unwrap()
        .iter()
        .all(|m| m.topic == "phone_numbers"));
    assert_eq!(
        summary,
        RunSummary {
            lines_read: 2,
            published: 3,
            delivered: 3,
            failed: 0,
            dropped_in_flight: 0,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn blank_line_breaks_the_window() {
    let sink = RecordingSink::default();
    let summary = run_pipeline(source("555-1234\n\n5678\n"), sink.clone(), &settings())
        .await
        .unwrap();

    assert_eq!(sink.payloads(), vec!["555-1234"]);
    assert_eq!(summary.lines_read, 3);
    assert_eq!(summary.published, 1);
}

#[tokio::test(start_paused = true)]
async fn number_wrapped_over_lines_is_published() {
    let sink = RecordingSink::default();
    run_pipeline(
        source("please call the front desk at 212-555\n0100 before noon\n"),
        sink.clone(),
        &settings(),
    )
    .await
    .unwrap();

    assert_eq!(sink.payloads(), vec!["212-555 0100"]);
}

#[tokio::test(start_paused = true)]
async fn input_without_numbers_publishes_nothing() {
    let sink = RecordingSink::default();
    let summary = run_pipeline(source("nothing\nto see\n\nhere\n"), sink.clone(), &settings())
        .await
        .unwrap();

    assert!(sink.payloads().is_empty());
    assert_eq!(summary.lines_read, 4);
    assert_eq!(summary.published, 0);
}

#[tokio::test(start_paused = true)]
async fn delivery_failures_do_not_stop_the_pipeline() {
    let summary = run_pipeline(
        source("555-1234\n\n555-9876\n\n555-0000\n"),
        BrokerDown,
        &settings(),
    )
    .await
    .unwrap();

    assert_eq!(summary.published, 3);
    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.dropped_in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_client_loses_messages_after_drain_delay() {
    // Slower than the drain delay: nothing is ever acknowledged
    let sink = RecordingSink::slow(Duration::from_secs(30));
    let summary = run_pipeline(source("555-1234\n\n555-9876\n"), sink.clone(), &settings())
        .await
        .unwrap();

    assert_eq!(summary.published, 2);
    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.dropped_in_flight, 2);
    assert!(sink.payloads().is_empty());
}

#[tokio::test(start_paused = true)]
async fn client_within_drain_delay_acknowledges_everything() {
    let sink = RecordingSink::slow(Duration::from_millis(500));
    let summary = run_pipeline(source("555-1234\n\n555-9876\n"), sink.clone(), &settings())
        .await
        .unwrap();

    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.dropped_in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn undecodable_line_is_scanned_past() {
    let sink = RecordingSink::default();
    let input: &'static [u8] = b"555-1234\n\ncaf\xe9 menu\n\n555-9876\n";
    let summary = run_pipeline(LineSource::from_reader(input), sink.clone(), &settings())
        .await
        .unwrap();

    assert_eq!(sink.payloads(), vec!["555-1234", "555-9876"]);
    assert_eq!(summary.lines_read, 5);
    assert_eq!(summary.delivered, 2);
}

#[tokio::test(start_paused = true)]
async fn read_error_runs_shutdown_then_fails() {
    let sink = RecordingSink::default();
    let reader = BufReader::new(FailingReader {
        data: b"555-1234\n\n555-9876\n",
    });
    let result = run_pipeline(LineSource::from_reader(reader), sink.clone(), &settings()).await;

    match result {
        Err(PipelineError::Read(e)) => assert_eq!(e.kind(), io::ErrorKind::Other),
        other => panic!("expected a read error, got {:?}", other),
    }
    // What was published before the error was still delivered
    assert_eq!(sink.payloads(), vec!["555-1234", "555-9876"]);
}
