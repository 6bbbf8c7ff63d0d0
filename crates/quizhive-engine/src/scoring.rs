use quizhive_core::QuestionKind;

/// Distance within which a number answer still counts as correct.
pub const NUMBER_TOLERANCE: f64 = 0.01;

/// How many of the fastest correct answers earn a bonus.
pub const SPEED_BONUS_RANKS: usize = 3;

/// Decide whether a raw submitted answer matches the correct one.
///
/// Submissions are whatever the client sent. Anything that fails to decode
/// for the question's kind counts as wrong, never as an error.
pub fn evaluate(kind: QuestionKind, submitted: &str, correct: &str) -> bool {
    match kind {
        QuestionKind::SingleChoice => submitted == correct,
        QuestionKind::MultipleChoice => {
            match (parse_index_list(submitted), parse_index_list(correct)) {
                (Some(mut a), Some(mut b)) => {
                    // Selection order is irrelevant; duplicate picks are not.
                    a.sort_unstable();
                    b.sort_unstable();
                    a == b
                }
                _ => false,
            }
        }
        QuestionKind::Number => match (parse_number(submitted), parse_number(correct)) {
            (Some(a), Some(b)) => (a - b).abs() < NUMBER_TOLERANCE,
            _ => false,
        },
        QuestionKind::Order => match (parse_index_list(submitted), parse_index_list(correct)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Points and recorded placement for a correct answer at the given 1-based
/// speed rank. Only the three fastest get a bonus and a rank on the books.
pub fn award(base_points: u32, speed_rank: usize, bonus_enabled: bool) -> (u32, Option<u8>) {
    if bonus_enabled && speed_rank <= SPEED_BONUS_RANKS {
        (base_points + speed_bonus(speed_rank), Some(speed_rank as u8))
    } else {
        (base_points, None)
    }
}

/// Extra points for the three fastest correct answers: +3, +2, +1.
pub fn speed_bonus(speed_rank: usize) -> u32 {
    match speed_rank {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => 0,
    }
}

fn parse_index_list(raw: &str) -> Option<Vec<i64>> {
    serde_json::from_str(raw).ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}
