use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of one player's turn on one question, fixed at finish time.
///
/// Every session member gets exactly one of these per finished question.
/// Players who never submitted get the zero result with `answer: None`;
/// `was_online` records whether they were connected when scoring ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub correct: bool,
    pub points: u32,
    /// Speed-bonus placement, only ever 1 to 3.
    pub rank: Option<u8>,
    /// The raw submitted answer, `None` for non-submitters.
    pub answer: Option<String>,
    pub was_online: bool,
}

impl AnswerResult {
    /// Result recorded for members with no submission on the books.
    pub fn missed(was_online: bool) -> Self {
        Self {
            correct: false,
            points: 0,
            rank: None,
            answer: None,
            was_online,
        }
    }

    /// Result for a submitted answer that evaluated as wrong.
    pub fn incorrect(answer: String) -> Self {
        Self {
            correct: false,
            points: 0,
            rank: None,
            answer: Some(answer),
            was_online: true,
        }
    }
}

/// One row of the score table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub nickname: String,
    pub score: u32,
    pub correct_answers: usize,
    pub total_answers: usize,
    /// 1-based position after sorting and truncation.
    pub rank: usize,
    /// Per-question results, attached only for detailed reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_scores: Option<BTreeMap<usize, AnswerResult>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missed_result_is_the_zero_result() {
        let res = AnswerResult::missed(false);
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["correct"], false);
        assert_eq!(json["points"], 0);
        assert_eq!(json["rank"], serde_json::Value::Null);
        assert_eq!(json["answer"], serde_json::Value::Null);
        assert_eq!(json["was_online"], false);
    }

    #[test]
    fn incorrect_result_keeps_the_raw_answer() {
        let res = AnswerResult::incorrect("[2,0]".into());
        assert!(!res.correct);
        assert_eq!(res.answer.as_deref(), Some("[2,0]"));
        assert!(res.was_online);
    }

    #[test]
    fn leaderboard_entry_omits_detail_unless_present() {
        let entry = LeaderboardEntry {
            nickname: "ada".into(),
            score: 13,
            correct_answers: 1,
            total_answers: 1,
            rank: 1,
            question_scores: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("question_scores").is_none());

        let detailed = LeaderboardEntry {
            question_scores: Some(BTreeMap::from([(
                0,
                AnswerResult {
                    correct: true,
                    points: 13,
                    rank: Some(1),
                    answer: Some("0".into()),
                    was_online: true,
                },
            )])),
            ..entry
        };
        let json = serde_json::to_value(&detailed).unwrap();
        assert_eq!(json["question_scores"]["0"]["points"], 13);
    }

    #[test]
    fn result_serde_roundtrip() {
        let res = AnswerResult {
            correct: true,
            points: 12,
            rank: Some(2),
            answer: Some("42".into()),
            was_online: true,
        };
        let json = serde_json::to_string(&res).unwrap();
        let parsed: AnswerResult = serde_json::from_str(&json).unwrap();
        assert_eq!(res, parsed);
    }
}
