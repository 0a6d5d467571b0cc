//! Answer grading engine.
//!
//! Pure functions that decide correctness and points for one answer. Choice
//! questions compare the first selected option against the options flagged
//! correct. Short-answer questions compare normalized text against one or
//! more reference variants and fall back to a key-word overlap heuristic for
//! half credit.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::GradingError;
use crate::model::{AnswerGrade, AnswerOption, OptionId, Question, QuestionType, StudentAnswer};

/// Minimum fraction of reference key words a short answer must contain to
/// earn half credit.
pub const PARTIAL_CREDIT_THRESHOLD: f64 = 0.70;

/// Reference words shorter than this are ignored by the overlap heuristic.
pub const MIN_KEY_WORD_LEN: usize = 3;

/// Separates acceptable variants inside a short-answer reference string.
pub const VARIANT_SEPARATOR: char = ';';

const STRIPPED_PUNCTUATION: [char; 4] = ['.', ',', '!', '?'];

/// Why an answer received the points it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    /// Recorded as incorrect, awarded half the question's points.
    PartialCredit,
    Incorrect,
    /// Nothing to grade against (no correct option, no reference answer, or
    /// an empty submission). Needs a human.
    Ungradable,
}

/// Outcome of grading one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub is_correct: bool,
    pub points: u32,
    pub verdict: Verdict,
}

impl Grade {
    fn correct(points: u32) -> Self {
        Self {
            is_correct: true,
            points,
            verdict: Verdict::Correct,
        }
    }

    fn partial(points: u32) -> Self {
        Self {
            is_correct: false,
            points,
            verdict: Verdict::PartialCredit,
        }
    }

    fn incorrect() -> Self {
        Self {
            is_correct: false,
            points: 0,
            verdict: Verdict::Incorrect,
        }
    }

    fn ungradable() -> Self {
        Self {
            is_correct: false,
            points: 0,
            verdict: Verdict::Ungradable,
        }
    }

    /// The fields persisted on the answer row.
    pub fn to_answer_grade(self) -> AnswerGrade {
        AnswerGrade {
            is_correct: self.is_correct,
            points_awarded: self.points,
        }
    }
}

/// Grade an answer according to its question's type.
///
/// `options` are the question's answer options; they are ignored for
/// short-answer questions.
pub fn grade_answer(
    question: &Question,
    options: &[AnswerOption],
    answer: &StudentAnswer,
) -> Result<Grade, GradingError> {
    if let Some(detail) = shape_problem(
        &question.kind,
        &answer.selected_option_ids,
        &answer.text_answer,
    ) {
        return Err(GradingError::ShapeMismatch {
            question_id: question.id,
            kind: question.kind.clone(),
            detail,
        });
    }

    match &question.kind {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            Ok(grade_choice_answer(question, options, answer))
        }
        QuestionType::ShortAnswer => Ok(grade_short_answer(question, answer)),
        QuestionType::Other(tag) => Err(GradingError::UnsupportedQuestionType(tag.clone())),
    }
}

/// Describe why an answer shape does not fit a question type, if it doesn't.
///
/// Choice questions carry no free text and short-answer questions carry no
/// option selection. Types the engine cannot grade accept any shape.
pub fn shape_problem(
    kind: &QuestionType,
    selected_option_ids: &[OptionId],
    text_answer: &str,
) -> Option<String> {
    match kind {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            (!text_answer.trim().is_empty())
                .then(|| "choice questions take selected options, not free text".to_string())
        }
        QuestionType::ShortAnswer => (!selected_option_ids.is_empty())
            .then(|| "short-answer questions take free text, not selected options".to_string()),
        QuestionType::Other(_) => None,
    }
}

/// Grade a multiple-choice or true/false answer.
///
/// Only the first selected option counts. A question with no option flagged
/// correct cannot be graded and awards nothing.
pub fn grade_choice_answer(
    question: &Question,
    options: &[AnswerOption],
    answer: &StudentAnswer,
) -> Grade {
    let correct: HashSet<OptionId> = options
        .iter()
        .filter(|o| o.is_correct && o.question_id == question.id)
        .map(|o| o.id)
        .collect();

    if correct.is_empty() {
        return Grade::ungradable();
    }

    match answer.selected_option_ids.first() {
        Some(selected) if correct.contains(selected) => Grade::correct(question.points),
        _ => Grade::incorrect(),
    }
}

/// Grade a short free-text answer against the question's reference answer.
pub fn grade_short_answer(question: &Question, answer: &StudentAnswer) -> Grade {
    let variants = reference_variants(question.correct_answer.as_deref().unwrap_or_default());
    let submitted = normalize_answer(&answer.text_answer);

    let Some(first_variant) = variants.first() else {
        return Grade::ungradable();
    };
    if submitted.is_empty() {
        return Grade::ungradable();
    }

    if variants.iter().any(|v| *v == submitted) {
        return Grade::correct(question.points);
    }

    let half = question.points / 2;
    match key_word_overlap(first_variant, &submitted) {
        Some(overlap) if overlap >= PARTIAL_CREDIT_THRESHOLD && half > 0 => Grade::partial(half),
        _ => Grade::incorrect(),
    }
}

/// Normalize free text for comparison.
///
/// Lowercases, drops `.`, `,`, `!` and `?`, trims, and collapses whitespace
/// runs to a single space.
pub fn normalize_answer(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a reference answer into its normalized, non-empty variants.
pub fn reference_variants(reference: &str) -> Vec<String> {
    reference
        .split(VARIANT_SEPARATOR)
        .map(normalize_answer)
        .filter(|v| !v.is_empty())
        .collect()
}

/// Fraction of the reference's key words found in the submission.
///
/// Both inputs must already be normalized. Returns `None` when the reference
/// has no key words.
pub fn key_word_overlap(reference: &str, submitted: &str) -> Option<f64> {
    let key_words: Vec<&str> = reference
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_KEY_WORD_LEN)
        .collect();
    if key_words.is_empty() {
        return None;
    }

    let found = key_words.iter().filter(|w| submitted.contains(**w)).count();
    Some(found as f64 / key_words.len() as f64)
}
