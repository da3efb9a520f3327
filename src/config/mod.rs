use serde::{Deserialize, Serialize};

use crate::schema::BucketTimezone;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Timezone used when truncating trend timestamps into buckets.
    /// Bucket strings are only comparable across writers that agree on this.
    #[serde(default)]
    pub bucket_timezone: BucketTimezone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "default_kafka_bootstrap_servers")]
    pub bootstrap_servers: String,
    #[serde(default = "default_kafka_group_id")]
    pub group_id: String,
    #[serde(default = "default_question_topic")]
    pub question_topic: String,
    #[serde(default = "default_trend_topic")]
    pub trend_topic: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_kafka_enabled")]
    pub enabled: bool,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_kafka_bootstrap_servers(),
            group_id: default_kafka_group_id(),
            question_topic: default_question_topic(),
            trend_topic: default_trend_topic(),
            batch_size: default_batch_size(),
            enabled: default_kafka_enabled(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            store: StoreConfig {
                bucket_timezone: std::env::var("BUCKET_TIMEZONE")
                    .unwrap_or_else(|_| "utc".to_string())
                    .parse()
                    .unwrap_or_default(),
            },
            kafka: KafkaConfig {
                bootstrap_servers: std::env::var("KAFKA_BOOTSTRAP_SERVERS")
                    .unwrap_or_else(|_| default_kafka_bootstrap_servers()),
                group_id: std::env::var("KAFKA_GROUP_ID")
                    .unwrap_or_else(|_| default_kafka_group_id()),
                question_topic: std::env::var("KAFKA_QUESTION_TOPIC")
                    .unwrap_or_else(|_| default_question_topic()),
                trend_topic: std::env::var("KAFKA_TREND_TOPIC")
                    .unwrap_or_else(|_| default_trend_topic()),
                batch_size: std::env::var("KAFKA_BATCH_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_batch_size),
                enabled: std::env::var("KAFKA_ENABLED")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
            },
        })
    }
}

fn default_kafka_bootstrap_servers() -> String {
    "localhost:9092".to_string()
}

fn default_kafka_group_id() -> String {
    "qna-ingest-consumer-v1".to_string()
}

fn default_question_topic() -> String {
    "stackoverflow-questions".to_string()
}

fn default_trend_topic() -> String {
    "stackoverflow-trends".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_kafka_enabled() -> bool {
    true
}
