//! Ingestion metrics
//!
//! Prometheus counters and histograms for the streaming consumers and
//! the store write path, served on `/metrics`.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

static INGEST_RECORDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "qna_ingest_records_total",
        "Records processed by the ingestion consumers",
        &["topic", "status"]
    )
    .expect("Failed to register qna_ingest_records_total")
});

static INGEST_BATCH_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "qna_ingest_batch_size",
        "Micro-batch sizes flushed by the ingestion consumers",
        &["topic"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]
    )
    .expect("Failed to register qna_ingest_batch_size")
});

static STORE_PUTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "qna_store_puts_total",
        "Rows written to the wide-column store",
        &["table"]
    )
    .expect("Failed to register qna_store_puts_total")
});

/// Record one ingested record outcome (status: stored/failed).
pub fn record_ingested(topic: &str, status: &str) {
    INGEST_RECORDS_TOTAL.with_label_values(&[topic, status]).inc();
}

/// Observe the size of a flushed micro-batch.
pub fn observe_batch_size(topic: &str, size: usize) {
    INGEST_BATCH_SIZE
        .with_label_values(&[topic])
        .observe(size as f64);
}

/// Count one row write per table.
pub fn record_store_put(table: &str) {
    STORE_PUTS_TOTAL.with_label_values(&[table]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
