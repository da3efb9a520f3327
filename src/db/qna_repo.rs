//! Question reads and writes, plus tag-index maintenance.

use std::sync::Arc;

use tracing::debug;

use crate::db::store::{ScanParams, StoreGateway};
use crate::error::Result;
use crate::metrics;
use crate::models::{Question, QuestionRecord};
use crate::schema;
use crate::services::assembler;

/// Repository over the qna and tag-index tables. Holds a shared gateway
/// handle; cloning shares the underlying store.
#[derive(Clone)]
pub struct QnaRepo {
    store: Arc<dyn StoreGateway>,
}

impl QnaRepo {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    /// Write the full question row and one tag-index cell per tag.
    /// Re-inserting the same question id overwrites the previous row,
    /// so corrected records converge on latest-write-wins.
    pub async fn insert_question(&self, question: &Question) -> Result<()> {
        let (row_key, cells) = assembler::assemble_question_record(question)?;
        self.store.put(schema::QNA_TABLE, &row_key, cells).await?;
        metrics::record_store_put(schema::QNA_TABLE);

        for (tag_key, index_cells) in assembler::tag_index_entries(question) {
            self.store
                .merge(schema::TAG_INDEX_TABLE, &tag_key, index_cells)
                .await?;
            metrics::record_store_put(schema::TAG_INDEX_TABLE);
        }

        debug!(question_id = question.question_id, "Stored question row");
        Ok(())
    }

    pub async fn get_question(&self, question_id: i64) -> Result<Option<QuestionRecord>> {
        let row = self
            .store
            .get(schema::QNA_TABLE, &question_id.to_string())
            .await?;
        Ok(row.map(|cells| assembler::decode_question_record(question_id, &cells)))
    }

    /// Questions carrying a tag, in creation-time order, up to `limit`.
    /// `time_range` bounds the creation timestamp inclusively on both
    /// ends.
    pub async fn get_questions_by_tag(
        &self,
        tag: &str,
        limit: usize,
        time_range: Option<(i64, i64)>,
    ) -> Result<Vec<QuestionRecord>> {
        let rows = self
            .store
            .scan(
                schema::TAG_INDEX_TABLE,
                ScanParams {
                    prefix: Some(tag.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let column_range =
            time_range.map(|(start, end)| (schema::tag_index_column(start), schema::tag_index_column(end)));

        let mut question_ids: Vec<i64> = Vec::new();
        'rows: for (_, cells) in rows {
            for (column, value) in cells {
                if question_ids.len() >= limit {
                    break 'rows;
                }
                if let Some((lo, hi)) = &column_range {
                    if column < *lo || column > *hi {
                        continue;
                    }
                }
                if let Some(id) = std::str::from_utf8(&value).ok().and_then(|s| s.parse().ok()) {
                    question_ids.push(id);
                }
            }
        }

        let mut questions = Vec::with_capacity(question_ids.len());
        for id in question_ids {
            if let Some(record) = self.get_question(id).await? {
                questions.push(record);
            }
        }

        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{ensure_tables, MemoryStore, MockStoreGateway};
    use crate::error::IngestError;
    use crate::models::Answer;

    fn question(question_id: i64, creation_date: i64, tags: &[&str]) -> Question {
        Question {
            question_id,
            title: format!("question {}", question_id),
            body: "<p>body</p>".to_string(),
            creation_date,
            score: 1,
            owner_reputation: 100,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            answers: vec![Answer {
                answer_id: question_id * 10,
                body: "answer".to_string(),
                score: 2,
                is_accepted: false,
                owner_reputation: 50,
            }],
        }
    }

    async fn repo() -> QnaRepo {
        let store = Arc::new(MemoryStore::new());
        ensure_tables(store.as_ref()).await.unwrap();
        QnaRepo::new(store)
    }

    #[tokio::test]
    async fn test_insert_and_get_question() {
        let repo = repo().await;
        let q = question(1, 1_600_000_000, &["rust"]);
        repo.insert_question(&q).await.unwrap();

        let record = repo.get_question(1).await.unwrap().unwrap();
        assert_eq!(record.title, q.title);
        assert_eq!(record.answers.len(), 1);
        assert!(repo.get_question(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_questions_by_tag_in_creation_order() {
        let repo = repo().await;
        // Inserted out of creation order on purpose.
        repo.insert_question(&question(2, 1_600_000_200, &["rust"]))
            .await
            .unwrap();
        repo.insert_question(&question(1, 1_600_000_100, &["rust"]))
            .await
            .unwrap();
        repo.insert_question(&question(3, 1_600_000_300, &["python"]))
            .await
            .unwrap();

        let records = repo.get_questions_by_tag("rust", 10, None).await.unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.question_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_get_questions_by_tag_respects_limit_and_range() {
        let repo = repo().await;
        for (id, ts) in [(1, 100), (2, 200), (3, 300), (4, 400)] {
            repo.insert_question(&question(id, ts, &["rust"]))
                .await
                .unwrap();
        }

        let records = repo
            .get_questions_by_tag("rust", 10, Some((200, 300)))
            .await
            .unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.question_id).collect();
        assert_eq!(ids, vec![2, 3]);

        let records = repo.get_questions_by_tag("rust", 2, None).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failures_surface_to_callers() {
        let mut store = MockStoreGateway::new();
        store.expect_put().returning(|_, _, _| {
            Err(IngestError::StoreWriteFailed("disk full".to_string()))
        });

        let repo = QnaRepo::new(Arc::new(store));
        let err = repo
            .insert_question(&question(1, 100, &["rust"]))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::StoreWriteFailed(_)));
    }
}
