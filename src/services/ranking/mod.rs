//! Top-answer selection.
//!
//! The stored `top_answers` family is a derived view: up to three answers
//! picked deterministically from the full answer set, so the read path can
//! serve "best answers" without rescoring.

use crate::models::Answer;

const MAX_TOP_ANSWERS: usize = 3;

/// Select up to three top answers for a question.
///
/// Policy, in order:
/// 1. The first accepted answer in input order always takes slot 0.
///    Multiple accepted flags are tolerated input; only the first counts.
/// 2. Answers whose owner reputation exceeds 1000, highest score first,
///    until three are selected.
/// 3. Any remaining answers regardless of reputation, highest score
///    first, until three are selected or the input runs out.
///
/// Already-selected answers are excluded by `answer_id`, so structurally
/// identical answers with distinct ids are ranked independently. Sorting
/// is stable: answers with equal scores keep their input order.
pub fn select_top_answers(answers: &[Answer]) -> Vec<Answer> {
    if answers.is_empty() {
        return Vec::new();
    }

    let mut top: Vec<Answer> = Vec::with_capacity(MAX_TOP_ANSWERS);

    let accepted = answers.iter().find(|a| a.is_accepted);
    if let Some(answer) = accepted {
        top.push(answer.clone());
    }
    let accepted_id = accepted.map(|a| a.answer_id);

    let mut high_rep: Vec<&Answer> = answers
        .iter()
        .filter(|a| a.owner_reputation > 1000 && Some(a.answer_id) != accepted_id)
        .collect();
    high_rep.sort_by(|a, b| b.score.cmp(&a.score));

    for answer in high_rep {
        if top.len() >= MAX_TOP_ANSWERS {
            break;
        }
        top.push(answer.clone());
    }

    if top.len() < MAX_TOP_ANSWERS {
        let selected: Vec<i64> = top.iter().map(|a| a.answer_id).collect();
        let mut remaining: Vec<&Answer> = answers
            .iter()
            .filter(|a| !selected.contains(&a.answer_id))
            .collect();
        remaining.sort_by(|a, b| b.score.cmp(&a.score));

        for answer in remaining {
            if top.len() >= MAX_TOP_ANSWERS {
                break;
            }
            top.push(answer.clone());
        }
    }

    top
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(answer_id: i64, score: i32, is_accepted: bool, owner_reputation: i32) -> Answer {
        Answer {
            answer_id,
            body: format!("answer {}", answer_id),
            score,
            is_accepted,
            owner_reputation,
        }
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(select_top_answers(&[]).is_empty());
    }

    #[test]
    fn test_output_length_is_capped_at_three() {
        for n in 0..6 {
            let answers: Vec<Answer> =
                (0..n).map(|i| answer(i as i64, i, false, 0)).collect();
            assert_eq!(select_top_answers(&answers).len(), n.min(3));
        }
    }

    #[test]
    fn test_accepted_answer_takes_first_slot() {
        let answers = vec![
            answer(1, 5, false, 500),
            answer(2, 3, true, 200),
            answer(3, 9, false, 1500),
        ];

        let top = select_top_answers(&answers);
        let ids: Vec<i64> = top.iter().map(|a| a.answer_id).collect();

        // Accepted first, then high reputation by score, then fallback.
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_score_fallback_when_no_accepted_or_high_rep() {
        let scores = [1, 5, 3, 9, 2];
        let answers: Vec<Answer> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| answer(i as i64 + 1, score, false, 100))
            .collect();

        let top = select_top_answers(&answers);
        let picked: Vec<i32> = top.iter().map(|a| a.score).collect();

        assert_eq!(picked, vec![9, 5, 3]);
        assert!(top.iter().all(|a| !a.is_accepted));
    }

    #[test]
    fn test_only_first_accepted_answer_counts() {
        let answers = vec![
            answer(1, 1, true, 100),
            answer(2, 10, true, 100),
            answer(3, 5, false, 100),
        ];

        let top = select_top_answers(&answers);
        assert_eq!(top[0].answer_id, 1);
        // The second accepted answer still competes on score.
        assert_eq!(top[1].answer_id, 2);
        assert_eq!(top[2].answer_id, 3);
    }

    #[test]
    fn test_accepted_answer_is_not_selected_twice() {
        // Accepted answer also clears the reputation bar; it must not
        // reappear in the high-reputation pass.
        let answers = vec![answer(1, 9, true, 5000), answer(2, 4, false, 2000)];

        let top = select_top_answers(&answers);
        let ids: Vec<i64> = top.iter().map(|a| a.answer_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_structurally_identical_answers_rank_independently() {
        // Field-for-field identical to the chosen accepted answer apart
        // from the id: exclusion is by id, so the twin still gets a slot
        // through the high-reputation pass.
        let accepted = answer(1, 9, true, 5000);
        let mut twin = accepted.clone();
        twin.answer_id = 2;
        twin.body = accepted.body.clone();

        let top = select_top_answers(&[accepted, twin]);
        let ids: Vec<i64> = top.iter().map(|a| a.answer_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let answers = vec![
            answer(1, 5, false, 2000),
            answer(2, 5, false, 2000),
            answer(3, 5, false, 2000),
            answer(4, 5, false, 2000),
        ];

        let top = select_top_answers(&answers);
        let ids: Vec<i64> = top.iter().map(|a| a.answer_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let answers = vec![
            answer(1, 5, false, 500),
            answer(2, 3, true, 200),
            answer(3, 9, false, 1500),
            answer(4, 9, false, 1500),
            answer(5, -2, false, 0),
        ];

        assert_eq!(select_top_answers(&answers), select_top_answers(&answers));
    }

    #[test]
    fn test_input_is_left_untouched() {
        let answers = vec![answer(1, 2, false, 100), answer(2, 7, false, 100)];
        let snapshot = answers.clone();
        let _ = select_top_answers(&answers);
        assert_eq!(answers, snapshot);
    }
}
