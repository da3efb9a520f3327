//! Streaming ingestion from Kafka.
//!
//! One consumer per topic. Records are collected into micro-batches and
//! flushed through a batch writer; each record's decode + validate +
//! assemble + put runs in isolation, so one bad record never blocks the
//! rest of its batch.

pub mod question_consumer;
pub mod trend_consumer;

pub use question_consumer::{QuestionBatchWriter, QuestionConsumer, QuestionConsumerConfig};
pub use trend_consumer::{TrendBatchWriter, TrendConsumer, TrendConsumerConfig};

/// One record pulled off a topic, with enough source context to log
/// failures against the partition/offset it came from.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl PendingRecord {
    pub fn new(partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            partition,
            offset,
            payload,
        }
    }
}

/// Per-batch tally returned by the batch writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub stored: usize,
    pub failed: usize,
}
