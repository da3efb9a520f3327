//! Cell-map assembly for question and trend rows, and the tolerant
//! decoders that invert it.
//!
//! Scalars are stored as their canonical string form: integers decimal,
//! booleans as the literal `"True"` / `"False"`, tag lists as a JSON
//! array. The stored layout is load-bearing; readers written against the
//! existing tables depend on these exact families and qualifiers.

use crate::db::store::CellMap;
use crate::error::{IngestError, Result};
use crate::models::{Answer, PeriodType, Question, QuestionRecord, TrendPoint, TrendRecord};
use crate::schema::{self, BucketTimezone};
use crate::services::ranking::select_top_answers;

const MAX_TOP_ANSWERS: usize = 3;

fn bool_cell(value: bool) -> Vec<u8> {
    if value {
        b"True".to_vec()
    } else {
        b"False".to_vec()
    }
}

fn answer_cells(cells: &mut CellMap, family: &str, prefix: &str, answer: &Answer) {
    cells.insert(
        format!("{family}:{prefix}_id"),
        answer.answer_id.to_string().into_bytes(),
    );
    cells.insert(
        format!("{family}:{prefix}_body"),
        answer.body.clone().into_bytes(),
    );
    cells.insert(
        format!("{family}:{prefix}_score"),
        answer.score.to_string().into_bytes(),
    );
    cells.insert(
        format!("{family}:{prefix}_is_accepted"),
        bool_cell(answer.is_accepted),
    );
    cells.insert(
        format!("{family}:{prefix}_owner_reputation"),
        answer.owner_reputation.to_string().into_bytes(),
    );
}

/// Build the full qna row for a question: one cell per question
/// attribute, per-answer cells indexed from 1, the ranked top answers,
/// and the derived `has_accepted` / `is_unanswered` booleans.
///
/// Title and body are identity-bearing fields and are never silently
/// defaulted on write.
pub fn assemble_question_record(question: &Question) -> Result<(String, CellMap)> {
    if question.title.is_empty() {
        return Err(IngestError::MissingRequiredField("title"));
    }
    if question.body.is_empty() {
        return Err(IngestError::MissingRequiredField("body"));
    }

    let row_key = question.question_id.to_string();
    let mut cells = CellMap::new();

    cells.insert(
        format!("{}:title", schema::QUESTION_FAMILY),
        question.title.clone().into_bytes(),
    );
    cells.insert(
        format!("{}:body", schema::QUESTION_FAMILY),
        question.body.clone().into_bytes(),
    );
    cells.insert(
        format!("{}:creation_date", schema::QUESTION_FAMILY),
        question.creation_date.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:score", schema::QUESTION_FAMILY),
        question.score.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:owner_reputation", schema::QUESTION_FAMILY),
        question.owner_reputation.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:tags", schema::QUESTION_FAMILY),
        serde_json::to_string(&question.tags)?.into_bytes(),
    );

    let has_accepted = question.answers.iter().any(|a| a.is_accepted);
    cells.insert(
        format!("{}:has_accepted", schema::QUESTION_FAMILY),
        bool_cell(has_accepted),
    );
    cells.insert(
        format!("{}:is_unanswered", schema::QUESTION_FAMILY),
        bool_cell(question.answers.is_empty()),
    );

    for (i, answer) in question.answers.iter().enumerate() {
        answer_cells(
            &mut cells,
            schema::ANSWERS_FAMILY,
            &format!("answer{}", i + 1),
            answer,
        );
    }

    for (i, answer) in select_top_answers(&question.answers).iter().enumerate() {
        answer_cells(
            &mut cells,
            schema::TOP_ANSWERS_FAMILY,
            &format!("top{}", i + 1),
            answer,
        );
    }

    Ok((row_key, cells))
}

/// One tag-index entry per tag: the tag is the row key, the padded
/// creation timestamp the qualifier, the question id the value.
pub fn tag_index_entries(question: &Question) -> Vec<(String, CellMap)> {
    let column = schema::tag_index_column(question.creation_date);
    let value = question.question_id.to_string().into_bytes();

    question
        .tags
        .iter()
        .map(|tag| {
            let mut cells = CellMap::new();
            cells.insert(column.clone(), value.clone());
            (tag.clone(), cells)
        })
        .collect()
}

/// Build the trend row. Metrics the rollup did not supply default to
/// zero; `raw_count` is only written when present.
pub fn assemble_trend_record(
    trend: &TrendRecord,
    period: PeriodType,
    tz: BucketTimezone,
) -> Result<(String, CellMap)> {
    let bucket = schema::format_bucket(trend.timestamp, period, tz)?;
    let row_key = schema::trend_row_key(&trend.tag, period, &bucket);

    let mut cells = CellMap::new();
    cells.insert(
        format!("{}:total_questions", schema::TREND_FAMILY),
        trend.total_questions.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:unanswered_percent", schema::TREND_FAMILY),
        trend.unanswered_percent.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:accepted_percent", schema::TREND_FAMILY),
        trend.accepted_percent.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:avg_question_score", schema::TREND_FAMILY),
        trend.avg_question_score.to_string().into_bytes(),
    );
    cells.insert(
        format!("{}:avg_answer_score", schema::TREND_FAMILY),
        trend.avg_answer_score.to_string().into_bytes(),
    );
    if let Some(raw_count) = trend.raw_count {
        cells.insert(
            format!("{}:raw_count", schema::TREND_FAMILY),
            raw_count.to_string().into_bytes(),
        );
    }

    Ok((row_key, cells))
}

fn cell_str(cells: &CellMap, column: &str) -> String {
    cells
        .get(column)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default()
}

fn cell_parse<T: std::str::FromStr + Default>(cells: &CellMap, column: &str) -> T {
    cells
        .get(column)
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

fn cell_bool(cells: &CellMap, column: &str) -> bool {
    cells.get(column).map(|v| v.as_slice() == b"True").unwrap_or(false)
}

fn decode_answer(cells: &CellMap, family: &str, prefix: &str) -> Option<Answer> {
    let id_column = format!("{family}:{prefix}_id");
    if !cells.contains_key(&id_column) {
        return None;
    }

    Some(Answer {
        answer_id: cell_parse(cells, &id_column),
        body: cell_str(cells, &format!("{family}:{prefix}_body")),
        score: cell_parse(cells, &format!("{family}:{prefix}_score")),
        is_accepted: cell_bool(cells, &format!("{family}:{prefix}_is_accepted")),
        owner_reputation: cell_parse(cells, &format!("{family}:{prefix}_owner_reputation")),
    })
}

/// Inverse of [`assemble_question_record`]. Missing cells default to
/// empty / zero / false rather than failing, so a partially-written row
/// still decodes.
pub fn decode_question_record(question_id: i64, cells: &CellMap) -> QuestionRecord {
    let tags: Vec<String> = cells
        .get(&format!("{}:tags", schema::QUESTION_FAMILY))
        .and_then(|v| serde_json::from_slice(v).ok())
        .unwrap_or_default();

    let mut answers = Vec::new();
    let mut i = 1;
    while let Some(answer) = decode_answer(cells, schema::ANSWERS_FAMILY, &format!("answer{i}")) {
        answers.push(answer);
        i += 1;
    }

    let top_answers: Vec<Answer> = (1..=MAX_TOP_ANSWERS)
        .filter_map(|i| decode_answer(cells, schema::TOP_ANSWERS_FAMILY, &format!("top{i}")))
        .collect();

    QuestionRecord {
        question_id,
        title: cell_str(cells, &format!("{}:title", schema::QUESTION_FAMILY)),
        body: cell_str(cells, &format!("{}:body", schema::QUESTION_FAMILY)),
        creation_date: cell_parse(cells, &format!("{}:creation_date", schema::QUESTION_FAMILY)),
        score: cell_parse(cells, &format!("{}:score", schema::QUESTION_FAMILY)),
        owner_reputation: cell_parse(
            cells,
            &format!("{}:owner_reputation", schema::QUESTION_FAMILY),
        ),
        tags,
        has_accepted: cell_bool(cells, &format!("{}:has_accepted", schema::QUESTION_FAMILY)),
        is_unanswered: cell_bool(cells, &format!("{}:is_unanswered", schema::QUESTION_FAMILY)),
        answers,
        top_answers,
    }
}

/// Decode one trend row. The identity triple comes from the row key;
/// metric cells are tolerant of absence like the question decoder.
pub fn decode_trend_point(row_key: &str, cells: &CellMap) -> Result<TrendPoint> {
    let (tag, period_type, bucket) = schema::decode_trend_row_key(row_key)?;

    let raw_count_column = format!("{}:raw_count", schema::TREND_FAMILY);
    let raw_count = cells
        .get(&raw_count_column)
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|s| s.parse().ok());

    Ok(TrendPoint {
        tag,
        period_type,
        bucket,
        total_questions: cell_parse(cells, &format!("{}:total_questions", schema::TREND_FAMILY)),
        unanswered_percent: cell_parse(
            cells,
            &format!("{}:unanswered_percent", schema::TREND_FAMILY),
        ),
        accepted_percent: cell_parse(cells, &format!("{}:accepted_percent", schema::TREND_FAMILY)),
        avg_question_score: cell_parse(
            cells,
            &format!("{}:avg_question_score", schema::TREND_FAMILY),
        ),
        avg_answer_score: cell_parse(
            cells,
            &format!("{}:avg_answer_score", schema::TREND_FAMILY),
        ),
        raw_count,
    })
}
