//! Row-key and time-bucket layout for the wide-column tables.
//!
//! Three tables back the service:
//! - `stackoverflow_qna`: one row per question, keyed by the decimal
//!   question id, with `question`/`answers`/`top_answers` families.
//! - `stackoverflow_trends`: one row per rollup, keyed
//!   `{tag}#{period}#{bucket}`.
//! - `stackoverflow_tag_index`: one row per tag; each question adds a
//!   timestamp-qualified cell so a prefix scan returns ids in
//!   chronological order.

use std::str::FromStr;

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::models::PeriodType;

pub const QNA_TABLE: &str = "stackoverflow_qna";
pub const TRENDS_TABLE: &str = "stackoverflow_trends";
pub const TAG_INDEX_TABLE: &str = "stackoverflow_tag_index";

pub const QUESTION_FAMILY: &str = "question";
pub const ANSWERS_FAMILY: &str = "answers";
pub const TOP_ANSWERS_FAMILY: &str = "top_answers";
pub const TREND_FAMILY: &str = "trend";
pub const TAG_INDEX_FAMILY: &str = "question_ids";

/// Separator inside trend row keys. Tags containing `#` corrupt the key;
/// this is a documented limitation of the layout, not validated away.
pub const KEY_SEPARATOR: char = '#';

/// Appended to an inclusive scan upper bound. Sorts above every character
/// that can appear in a bucket string, which turns an exclusive `row_stop`
/// into an inclusive bound on the bucket itself.
pub const SCAN_SENTINEL: char = '~';

/// Tag-index qualifiers are zero-padded to this width so lexicographic
/// qualifier order matches chronological order across timestamp widths.
pub const TAG_INDEX_TIMESTAMP_WIDTH: usize = 10;

/// Timezone used when truncating timestamps into bucket strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketTimezone {
    #[default]
    Utc,
    Local,
}

impl FromStr for BucketTimezone {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            other => Err(IngestError::Validation(format!(
                "Unknown bucket timezone: {}",
                other
            ))),
        }
    }
}

/// Truncate an epoch-seconds timestamp into the bucket string for the
/// given granularity: `YYYYMMDDHH`, `YYYYMMDD` or `YYYYMM`.
pub fn format_bucket(timestamp: i64, period: PeriodType, tz: BucketTimezone) -> Result<String> {
    let pattern = match period {
        PeriodType::Hourly => "%Y%m%d%H",
        PeriodType::Daily => "%Y%m%d",
        PeriodType::Monthly => "%Y%m",
    };

    let formatted = match tz {
        BucketTimezone::Utc => Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .map(|dt| dt.format(pattern).to_string()),
        BucketTimezone::Local => Local
            .timestamp_opt(timestamp, 0)
            .single()
            .map(|dt| dt.format(pattern).to_string()),
    };

    formatted.ok_or_else(|| {
        IngestError::Validation(format!("Timestamp {} is out of range", timestamp))
    })
}

pub fn trend_row_key(tag: &str, period: PeriodType, bucket: &str) -> String {
    format!("{tag}{KEY_SEPARATOR}{period}{KEY_SEPARATOR}{bucket}")
}

pub fn trend_row_prefix(tag: &str, period: PeriodType) -> String {
    format!("{tag}{KEY_SEPARATOR}{period}{KEY_SEPARATOR}")
}

/// Scan bounds for trend rows of one tag and period. Returns the row
/// prefix plus optional start/stop keys when a bucket range is given;
/// the stop key carries the sentinel so the end bucket is included.
pub fn trend_scan_range(
    tag: &str,
    period: PeriodType,
    bucket_range: Option<(&str, &str)>,
) -> (String, Option<String>, Option<String>) {
    let prefix = trend_row_prefix(tag, period);
    match bucket_range {
        Some((start, end)) => {
            let row_start = format!("{prefix}{start}");
            let row_stop = format!("{prefix}{end}{SCAN_SENTINEL}");
            (prefix, Some(row_start), Some(row_stop))
        }
        None => (prefix, None, None),
    }
}

/// Decompose a trend row key back into its identity triple.
pub fn decode_trend_row_key(row_key: &str) -> Result<(String, PeriodType, String)> {
    let mut parts = row_key.splitn(3, KEY_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(tag), Some(period), Some(bucket)) => {
            let period = period.parse::<PeriodType>()?;
            Ok((tag.to_string(), period, bucket.to_string()))
        }
        _ => Err(IngestError::Validation(format!(
            "Malformed trend row key: {}",
            row_key
        ))),
    }
}

/// Full column key (`question_ids:{timestamp}`) for one tag-index cell.
/// The timestamp is zero-padded so that qualifier order stays
/// chronological once timestamps cross a digit boundary.
pub fn tag_index_column(creation_timestamp: i64) -> String {
    format!("{TAG_INDEX_FAMILY}:{creation_timestamp:0width$}", width = TAG_INDEX_TIMESTAMP_WIDTH)
}
