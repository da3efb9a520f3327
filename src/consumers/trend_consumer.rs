use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::KafkaConfig;
use crate::db::TrendRepo;
use crate::error::{IngestError, Result};
use crate::metrics;
use crate::models::{PeriodType, TrendRecord};

use super::{BatchOutcome, PendingRecord};

/// Trend consumer configuration
#[derive(Debug, Clone)]
pub struct TrendConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    pub batch_size: usize,
}

impl Default for TrendConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "qna-ingest-consumer-v1".to_string(),
            topic: "stackoverflow-trends".to_string(),
            batch_size: 100,
        }
    }
}

impl From<&KafkaConfig> for TrendConsumerConfig {
    fn from(kafka: &KafkaConfig) -> Self {
        Self {
            brokers: kafka.bootstrap_servers.clone(),
            group_id: kafka.group_id.clone(),
            topic: kafka.trend_topic.clone(),
            batch_size: kafka.batch_size,
        }
    }
}

/// Trend rollup event as published on the trend topic. Producers that
/// only count questions send `{tag, count}`; richer rollups carry the
/// full metric set and a period/timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendEvent {
    pub tag: String,

    /// hourly | daily | monthly; defaults to daily when absent.
    #[serde(default)]
    pub period_type: Option<String>,

    /// Epoch seconds; defaults to the ingestion time when absent.
    #[serde(default)]
    pub timestamp: Option<i64>,

    #[serde(default)]
    pub total_questions: i64,

    #[serde(default)]
    pub unanswered_percent: f64,

    #[serde(default)]
    pub accepted_percent: f64,

    #[serde(default)]
    pub avg_question_score: f64,

    #[serde(default)]
    pub avg_answer_score: f64,

    #[serde(default)]
    pub count: Option<i64>,
}

impl TrendEvent {
    /// Validate event message
    pub fn validate(&self) -> Result<()> {
        if self.tag.is_empty() {
            return Err(IngestError::Validation("Trend tag is empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the optional wire fields into a storable record. An
    /// unknown period string surfaces `InvalidPeriodType` here, before
    /// anything is written.
    pub fn resolve(self) -> Result<(TrendRecord, PeriodType)> {
        let period = match self.period_type.as_deref() {
            Some(p) => p.parse::<PeriodType>()?,
            None => PeriodType::Daily,
        };
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        let record = TrendRecord {
            tag: self.tag,
            timestamp,
            total_questions: self.total_questions,
            unanswered_percent: self.unanswered_percent,
            accepted_percent: self.accepted_percent,
            avg_question_score: self.avg_question_score,
            avg_answer_score: self.avg_answer_score,
            raw_count: self.count,
        };

        Ok((record, period))
    }
}

/// Flush path for trend micro-batches, separate from the Kafka consumer
/// so it can be driven without a broker.
#[derive(Clone)]
pub struct TrendBatchWriter {
    repo: TrendRepo,
    topic: String,
}

impl TrendBatchWriter {
    pub fn new(repo: TrendRepo, topic: String) -> Self {
        Self { repo, topic }
    }

    /// Store every record of a batch, isolating per-record failures.
    pub async fn handle_batch(&self, records: &[PendingRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if records.is_empty() {
            return outcome;
        }

        let batch_id = Uuid::new_v4();
        info!(
            %batch_id,
            topic = %self.topic,
            size = records.len(),
            "Flushing trend batch"
        );

        for record in records {
            match self.store_record(record).await {
                Ok(tag) => {
                    outcome.stored += 1;
                    metrics::record_ingested(&self.topic, "stored");
                    debug!(tag = %tag, %batch_id, "Ingested trend rollup");
                }
                Err(e) => {
                    outcome.failed += 1;
                    metrics::record_ingested(&self.topic, "failed");
                    error!(
                        topic = %self.topic,
                        partition = record.partition,
                        offset = record.offset,
                        %batch_id,
                        "Failed to ingest trend record: {}",
                        e
                    );
                }
            }
        }

        metrics::observe_batch_size(&self.topic, records.len());
        outcome
    }

    async fn store_record(&self, record: &PendingRecord) -> Result<String> {
        let event: TrendEvent = serde_json::from_slice(&record.payload)?;
        event.validate()?;

        let (trend, period) = event.resolve()?;
        let tag = trend.tag.clone();
        self.repo.insert_trend(&trend, period).await?;
        Ok(tag)
    }
}

/// Trend topic consumer. Same batching and flush behavior as the
/// question consumer.
pub struct TrendConsumer {
    consumer: StreamConsumer,
    writer: TrendBatchWriter,
    config: TrendConsumerConfig,
}

impl TrendConsumer {
    pub fn new(config: TrendConsumerConfig, repo: TrendRepo) -> Result<Self> {
        info!("Initializing trend consumer with config: {:?}", config);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| {
                error!("Failed to create Kafka consumer: {}", e);
                IngestError::Kafka(e.to_string())
            })?;

        consumer.subscribe(&[&config.topic]).map_err(|e| {
            error!("Failed to subscribe to topic: {}", e);
            IngestError::Kafka(e.to_string())
        })?;

        info!("Trend consumer subscribed to topic: {}", config.topic);

        let writer = TrendBatchWriter::new(repo, config.topic.clone());
        Ok(Self {
            consumer,
            writer,
            config,
        })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting trend consumer loop");

        let mut batch: Vec<PendingRecord> = Vec::with_capacity(self.config.batch_size);

        loop {
            match self.consumer.recv().await {
                Ok(msg) => {
                    match msg.payload() {
                        Some(payload) => {
                            batch.push(PendingRecord::new(
                                msg.partition(),
                                msg.offset(),
                                payload.to_vec(),
                            ));
                        }
                        None => {
                            debug!(
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "Trend message has no payload, skipping"
                            );
                        }
                    }

                    if batch.len() >= self.config.batch_size {
                        self.writer.handle_batch(&batch).await;
                        batch.clear();
                    }
                }
                Err(e) => {
                    error!("Kafka consumer error: {}", e);

                    if !batch.is_empty() {
                        self.writer.handle_batch(&batch).await;
                        batch.clear();
                    }

                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{ensure_tables, MemoryStore};
    use crate::schema::BucketTimezone;
    use std::sync::Arc;

    #[test]
    fn test_minimal_event_resolves_with_defaults() {
        let event: TrendEvent =
            serde_json::from_str(r#"{"tag": "spark", "count": 1500}"#).unwrap();
        assert!(event.validate().is_ok());

        let (record, period) = event.resolve().unwrap();
        assert_eq!(period, PeriodType::Daily);
        assert_eq!(record.raw_count, Some(1500));
        assert!(record.timestamp > 0);
        assert_eq!(record.total_questions, 0);
    }

    #[test]
    fn test_unknown_period_type_is_rejected() {
        let event: TrendEvent =
            serde_json::from_str(r#"{"tag": "spark", "period_type": "weekly"}"#).unwrap();
        let err = event.resolve().unwrap_err();
        assert!(matches!(err, IngestError::InvalidPeriodType(_)));
    }

    #[test]
    fn test_empty_tag_is_rejected() {
        let event: TrendEvent = serde_json::from_str(r#"{"tag": ""}"#).unwrap();
        assert!(event.validate().is_err());
    }

    #[tokio::test]
    async fn test_handle_batch_isolates_bad_records() {
        let store = Arc::new(MemoryStore::new());
        ensure_tables(store.as_ref()).await.unwrap();
        let repo = TrendRepo::new(store, BucketTimezone::Utc);
        let writer = TrendBatchWriter::new(repo.clone(), "stackoverflow-trends".to_string());

        let good = br#"{"tag": "spark", "period_type": "monthly",
                        "timestamp": 1654041600, "total_questions": 10}"#;
        let batch = vec![
            PendingRecord::new(0, 1, good.to_vec()),
            PendingRecord::new(0, 2, br#"{"tag": "spark", "period_type": "weekly"}"#.to_vec()),
        ];

        let outcome = writer.handle_batch(&batch).await;
        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.failed, 1);

        let points = repo
            .get_trends("spark", PeriodType::Monthly, None)
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].bucket, "202206");
    }
}
