use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// One answer to a question. `answer_id` is unique within its question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer_id: i64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub is_accepted: bool,
    #[serde(default)]
    pub owner_reputation: i32,
}

/// Write-side question input, as delivered by the ingestion topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: i64,
    pub title: String,
    pub body: String,
    pub creation_date: i64,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub owner_reputation: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// Read-side view of a stored question row, including the derived cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question_id: i64,
    pub title: String,
    pub body: String,
    pub creation_date: i64,
    pub score: i32,
    pub owner_reputation: i32,
    pub tags: Vec<String>,
    pub has_accepted: bool,
    pub is_unanswered: bool,
    pub answers: Vec<Answer>,
    /// Up to 3 answers picked by the ranking policy at write time.
    pub top_answers: Vec<Answer>,
}

/// Write-side trend rollup for one tag and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub tag: String,
    pub timestamp: i64,
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
    pub raw_count: Option<i64>,
}

/// Decoded trend row: the identity triple from the row key plus metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub tag: String,
    pub period_type: PeriodType,
    pub bucket: String,
    pub total_questions: i64,
    pub unanswered_percent: f64,
    pub accepted_percent: f64,
    pub avg_question_score: f64,
    pub avg_answer_score: f64,
    pub raw_count: Option<i64>,
}

/// Bucket granularity for trend rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Hourly,
    Daily,
    Monthly,
}

impl PeriodType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            other => Err(IngestError::InvalidPeriodType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_type_round_trip() {
        for period in [PeriodType::Hourly, PeriodType::Daily, PeriodType::Monthly] {
            assert_eq!(period.as_str().parse::<PeriodType>().unwrap(), period);
        }
    }

    #[test]
    fn test_period_type_rejects_unknown() {
        let err = "weekly".parse::<PeriodType>().unwrap_err();
        assert!(matches!(err, IngestError::InvalidPeriodType(ref s) if s == "weekly"));
    }

    #[test]
    fn test_question_deserialization_defaults() {
        let json = r#"{
            "question_id": 12345,
            "title": "How to connect Spark to HBase?",
            "body": "<p>Configuration issues.</p>",
            "creation_date": 1654012800
        }"#;

        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.question_id, 12345);
        assert_eq!(question.score, 0);
        assert!(question.tags.is_empty());
        assert!(question.answers.is_empty());
    }
}
