use serde::{Deserialize, Serialize};

use crate::ids::QuizId;

/// Answer formats the evaluator understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Number,
    Order,
}

fn default_time_limit() -> u32 {
    30
}

fn default_points() -> u32 {
    10
}

fn default_speed_bonus() -> bool {
    true
}

/// One question as captured in a session's snapshot at creation time.
///
/// `correct_answer` is a raw string the evaluator decodes per kind: a choice
/// index for single choice, a JSON index list for multiple choice and order,
/// a decimal for number questions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionSpec {
    #[serde(rename = "question_type")]
    pub kind: QuestionKind,
    #[serde(rename = "question_text")]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default = "default_speed_bonus")]
    pub speed_bonus: bool,
}

impl QuestionSpec {
    pub fn new(
        kind: QuestionKind,
        text: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            options: Vec::new(),
            correct_answer: correct_answer.into(),
            time_limit: default_time_limit(),
            points: default_points(),
            speed_bonus: default_speed_bonus(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Player-facing copy with the correct answer structurally absent.
    pub fn public_view(&self) -> PublicQuestion {
        PublicQuestion {
            kind: self.kind,
            text: self.text.clone(),
            options: self.options.clone(),
            time_limit: self.time_limit,
            points: self.points,
            speed_bonus: self.speed_bonus,
        }
    }
}

/// What players are allowed to see while a question is live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    #[serde(rename = "question_type")]
    pub kind: QuestionKind,
    #[serde(rename = "question_text")]
    pub text: String,
    pub options: Vec<String>,
    pub time_limit: u32,
    pub points: u32,
    pub speed_bonus: bool,
}

/// The contract with the quiz service: everything a session needs, captured
/// once at creation. Later edits to the quiz never reach a running game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub quiz_id: QuizId,
    #[serde(default)]
    pub title: Option<String>,
    pub questions: Vec<QuestionSpec>,
}

impl QuizSnapshot {
    pub fn new(quiz_id: QuizId, title: Option<String>, questions: Vec<QuestionSpec>) -> Self {
        Self {
            quiz_id,
            title,
            questions,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Export title, falling back for untitled quizzes.
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Quiz Game")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uses_snake_case_on_the_wire() {
        let json = serde_json::to_value(QuestionKind::MultipleChoice).unwrap();
        assert_eq!(json, serde_json::json!("multiple_choice"));
        let parsed: QuestionKind = serde_json::from_value(serde_json::json!("order")).unwrap();
        assert_eq!(parsed, QuestionKind::Order);
    }

    #[test]
    fn spec_fills_defaults_for_omitted_fields() {
        let spec: QuestionSpec = serde_json::from_str(
            r#"{"question_type": "number", "question_text": "2+2?", "correct_answer": "4"}"#,
        )
        .unwrap();
        assert_eq!(spec.time_limit, 30);
        assert_eq!(spec.points, 10);
        assert!(spec.speed_bonus);
        assert!(spec.options.is_empty());
    }

    #[test]
    fn public_view_strips_the_correct_answer() {
        let spec = QuestionSpec::new(QuestionKind::SingleChoice, "Capital of France?", "0")
            .with_options(vec!["Paris".into(), "Lyon".into()]);
        let json = serde_json::to_value(spec.public_view()).unwrap();
        assert!(json.get("correct_answer").is_none());
        assert_eq!(json["question_text"], "Capital of France?");
        assert_eq!(json["options"][0], "Paris");
    }

    #[test]
    fn snapshot_title_falls_back_when_untitled() {
        let untitled = QuizSnapshot::new(QuizId::new(), None, vec![]);
        assert_eq!(untitled.title_or_default(), "Quiz Game");
        let titled = QuizSnapshot::new(QuizId::new(), Some("Geography".into()), vec![]);
        assert_eq!(titled.title_or_default(), "Geography");
    }

    #[test]
    fn spec_serde_roundtrip() {
        let spec = QuestionSpec::new(QuestionKind::Order, "Sort these", "[0,1,2]")
            .with_options(vec!["a".into(), "b".into(), "c".into()]);
        let json = serde_json::to_string(&spec).unwrap();
        let parsed: QuestionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, parsed);
    }
}
