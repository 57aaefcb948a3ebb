use async_trait::async_trait;

use crate::errors::SinkError;
use crate::producer::OutboundMessage;

pub mod kafka;
pub mod print;

/// Where a delivered message landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Resolves once the broker acknowledged or rejected the message.
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, SinkError>;
}
