use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qna_ingest_service::config::Config;
use qna_ingest_service::consumers::{
    QuestionConsumer, QuestionConsumerConfig, TrendConsumer, TrendConsumerConfig,
};
use qna_ingest_service::db::{ensure_tables, MemoryStore, QnaRepo, StoreGateway, TrendRepo};
use qna_ingest_service::metrics;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,qna_ingest_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting qna-ingest-service");

    let config =
        Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // In-tree store backend; the gateway trait is the seam for a real
    // wide-column client.
    let store: Arc<dyn StoreGateway> = Arc::new(MemoryStore::new());
    ensure_tables(store.as_ref())
        .await
        .context("Failed to bootstrap store tables")?;
    tracing::info!("Store tables ready");

    let qna_repo = QnaRepo::new(Arc::clone(&store));
    let trend_repo = TrendRepo::new(Arc::clone(&store), config.store.bucket_timezone);

    if config.kafka.enabled {
        match QuestionConsumer::new(QuestionConsumerConfig::from(&config.kafka), qna_repo.clone())
        {
            Ok(consumer) => {
                tokio::spawn(async move {
                    tracing::info!("Question consumer task started");
                    if let Err(e) = consumer.run().await {
                        tracing::error!("Question consumer failed: {:?}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to create question consumer: {:?}", e);
                tracing::warn!("Service will run without question ingestion");
            }
        }

        match TrendConsumer::new(TrendConsumerConfig::from(&config.kafka), trend_repo.clone()) {
            Ok(consumer) => {
                tokio::spawn(async move {
                    tracing::info!("Trend consumer task started");
                    if let Err(e) = consumer.run().await {
                        tracing::error!("Trend consumer failed: {:?}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to create trend consumer: {:?}", e);
                tracing::warn!("Service will run without trend ingestion");
            }
        }
    } else {
        tracing::warn!("Kafka ingestion disabled (KAFKA_ENABLED=false); serving health and metrics only");
    }

    let port = config.app.port;
    tracing::info!("Starting HTTP server on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(|| async { "READY" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .bind(("0.0.0.0", port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")
}
