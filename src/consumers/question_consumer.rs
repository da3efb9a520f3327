use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::KafkaConfig;
use crate::db::QnaRepo;
use crate::error::{IngestError, Result};
use crate::metrics;
use crate::models::{Answer, Question};

use super::{BatchOutcome, PendingRecord};

/// Question consumer configuration
#[derive(Debug, Clone)]
pub struct QuestionConsumerConfig {
    /// Kafka brokers (comma-separated)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Question topic name
    pub topic: String,
    /// Records per micro-batch
    pub batch_size: usize,
}

impl Default for QuestionConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "qna-ingest-consumer-v1".to_string(),
            topic: "stackoverflow-questions".to_string(),
            batch_size: 100,
        }
    }
}

impl From<&KafkaConfig> for QuestionConsumerConfig {
    fn from(kafka: &KafkaConfig) -> Self {
        Self {
            brokers: kafka.bootstrap_servers.clone(),
            group_id: kafka.group_id.clone(),
            topic: kafka.question_topic.clone(),
            batch_size: kafka.batch_size,
        }
    }
}

/// Question event as published on the question topic.
///
/// Expected format:
/// ```json
/// {
///   "question_id": 12345,
///   "title": "How to connect Spark to HBase?",
///   "body": "<p>...</p>",
///   "creation_date": 1654012800,
///   "score": 25,
///   "tags": ["spark", "hbase"],
///   "owner_reputation": 3500,
///   "answers": [{"answer_id": 98765, "body": "...", "score": 15,
///                "is_accepted": true, "owner_reputation": 12500}]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEvent {
    pub question_id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub creation_date: i64,

    #[serde(default)]
    pub score: i32,

    #[serde(default)]
    pub owner_reputation: i32,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Published by some producers; ignored here, the stored flag is
    /// derived from the answer set instead.
    #[serde(default)]
    pub is_answered: Option<bool>,

    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl QuestionEvent {
    /// Validate event message
    pub fn validate(&self) -> Result<()> {
        if self.question_id <= 0 {
            return Err(IngestError::Validation(format!(
                "Invalid question_id: {}",
                self.question_id
            )));
        }
        if self.title.is_empty() {
            return Err(IngestError::MissingRequiredField("title"));
        }
        if self.body.is_empty() {
            return Err(IngestError::MissingRequiredField("body"));
        }
        Ok(())
    }

    pub fn into_question(self) -> Question {
        Question {
            question_id: self.question_id,
            title: self.title,
            body: self.body,
            creation_date: self.creation_date,
            score: self.score,
            owner_reputation: self.owner_reputation,
            tags: self.tags,
            answers: self.answers,
        }
    }
}

/// Flush path for question micro-batches, separate from the Kafka
/// consumer so it can be driven without a broker.
#[derive(Clone)]
pub struct QuestionBatchWriter {
    repo: QnaRepo,
    topic: String,
}

impl QuestionBatchWriter {
    pub fn new(repo: QnaRepo, topic: String) -> Self {
        Self { repo, topic }
    }

    /// Store every record of a batch. Each record is handled in
    /// isolation: a failure is logged and counted, the batch continues.
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
            "Flushing question batch"
        );

        for record in records {
            match self.store_record(record).await {
                Ok(question_id) => {
                    outcome.stored += 1;
                    metrics::record_ingested(&self.topic, "stored");
                    debug!(question_id, %batch_id, "Ingested question");
                }
                Err(e) => {
                    outcome.failed += 1;
                    metrics::record_ingested(&self.topic, "failed");
                    error!(
                        topic = %self.topic,
                        partition = record.partition,
                        offset = record.offset,
                        %batch_id,
                        "Failed to ingest question record: {}",
                        e
                    );
                }
            }
        }

        metrics::observe_batch_size(&self.topic, records.len());
        outcome
    }

    async fn store_record(&self, record: &PendingRecord) -> Result<i64> {
        let event: QuestionEvent = serde_json::from_slice(&record.payload)?;
        event.validate()?;

        let question = event.into_question();
        let question_id = question.question_id;
        self.repo.insert_question(&question).await?;
        Ok(question_id)
    }
}

/// Question topic consumer.
///
/// Long-running; spawn `run` in a tokio task. Collects records into
/// micro-batches and flushes on size, or flushes the partial batch when
/// the underlying consumer errors.
pub struct QuestionConsumer {
    consumer: StreamConsumer,
    writer: QuestionBatchWriter,
    config: QuestionConsumerConfig,
}

impl QuestionConsumer {
    pub fn new(config: QuestionConsumerConfig, repo: QnaRepo) -> Result<Self> {
        info!("Initializing question consumer with config: {:?}", config);

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

        info!("Question consumer subscribed to topic: {}", config.topic);

        let writer = QuestionBatchWriter::new(repo, config.topic.clone());
        Ok(Self {
            consumer,
            writer,
            config,
        })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting question consumer loop");

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
                                "Question message has no payload, skipping"
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

                    // Flush any pending records before backing off.
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
