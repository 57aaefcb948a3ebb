use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::errors::SinkError;
use crate::producer::OutboundMessage;
use crate::sinks::{Delivery, Sink};

#[derive(Default)]
pub struct PrintSink {
    next_offset: AtomicI64,
}

#[async_trait]
impl Sink for PrintSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, SinkError> {
        let offset = self.next_offset.fetch_add(1, Ordering::Relaxed);
        info!(topic = %message.topic, offset, "message: {}", message.payload);

        Ok(Delivery {
            partition: 0,
            offset,
        })
    }
}
