//! Trend rollup reads and writes.

use std::sync::Arc;

use tracing::debug;

use crate::db::store::{ScanParams, StoreGateway};
use crate::error::Result;
use crate::metrics;
use crate::models::{PeriodType, TrendPoint, TrendRecord};
use crate::schema::{self, BucketTimezone};
use crate::services::assembler;

#[derive(Clone)]
pub struct TrendRepo {
    store: Arc<dyn StoreGateway>,
    timezone: BucketTimezone,
}

impl TrendRepo {
    pub fn new(store: Arc<dyn StoreGateway>, timezone: BucketTimezone) -> Self {
        Self { store, timezone }
    }

    /// Write one trend row. The row key is the (tag, period, bucket)
    /// identity, so re-ingesting the same rollup overwrites in place.
    pub async fn insert_trend(&self, trend: &TrendRecord, period: PeriodType) -> Result<()> {
        let (row_key, cells) = assembler::assemble_trend_record(trend, period, self.timezone)?;
        self.store.put(schema::TRENDS_TABLE, &row_key, cells).await?;
        metrics::record_store_put(schema::TRENDS_TABLE);

        debug!(row_key = %row_key, "Stored trend row");
        Ok(())
    }

    /// Trend points for one tag and period, in bucket order.
    /// `bucket_range` is inclusive on both ends.
    pub async fn get_trends(
        &self,
        tag: &str,
        period: PeriodType,
        bucket_range: Option<(&str, &str)>,
    ) -> Result<Vec<TrendPoint>> {
        let (prefix, start, stop) = schema::trend_scan_range(tag, period, bucket_range);
        let rows = self
            .store
            .scan(
                schema::TRENDS_TABLE,
                ScanParams {
                    prefix: Some(prefix),
                    start,
                    stop,
                    limit: None,
                },
            )
            .await?;

        rows.iter()
            .map(|(row_key, cells)| assembler::decode_trend_point(row_key, cells))
            .collect()
    }
}
