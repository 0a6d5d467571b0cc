//! Core data model types for quizmark.
//!
//! Catalog records (quizzes, questions, answer options) are owned by the
//! external CRUD layer and read as snapshots. Attempts and student answers are
//! the records this crate creates and mutates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// College (tenant) identifier. Every read and write is scoped by it.
pub type TenantId = i64;
pub type CourseId = i64;
pub type QuizId = i64;
pub type QuestionId = i64;
pub type OptionId = i64;
pub type StudentId = i64;
pub type AttemptId = Uuid;
pub type AnswerId = Uuid;

// ---------------------------------------------------------------------------
// Question catalog
// ---------------------------------------------------------------------------

/// A quiz as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub tenant_id: TenantId,
    pub course_id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// The kind of a question, which selects the grading strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    /// A type tag the catalog knows about but the grading engine does not.
    Other(String),
}

impl QuestionType {
    /// Returns `true` for question types answered by selecting options.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }

    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Ok(match normalized.as_str() {
            "multiple_choice" | "mcq" => QuestionType::MultipleChoice,
            "true_false" | "boolean" => QuestionType::TrueFalse,
            "short_answer" | "text" => QuestionType::ShortAnswer,
            _ => QuestionType::Other(normalized),
        })
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<QuestionType> for String {
    fn from(kind: QuestionType) -> Self {
        kind.as_str().to_string()
    }
}

/// A question as stored in the catalog. Immutable while attempts are graded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub tenant_id: TenantId,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub text: String,
    /// Points awarded for a fully correct answer. Always positive.
    pub points: u32,
    /// Reference answer for short-answer questions. Acceptable variants are
    /// separated by `;`.
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

/// A question together with its options, as loaded from a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogQuestion {
    pub question: Question,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

/// A quiz and everything needed to grade it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizCatalog {
    pub quiz: Quiz,
    #[serde(default)]
    pub questions: Vec<CatalogQuestion>,
}

impl QuizCatalog {
    /// Move the quiz and its questions into another tenant.
    pub fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.quiz.tenant_id = tenant_id;
        for q in &mut self.questions {
            q.question.tenant_id = tenant_id;
        }
    }

    pub fn max_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |acc, q| acc.saturating_add(q.question.points))
    }
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// Lifecycle state of a quiz attempt.
///
/// `InProgress -> Completed -> Graded`, with `Graded` re-enterable through a
/// manual grade. Nothing leads back to `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Graded,
}

impl AttemptStatus {
    /// Answers may only be recorded while the attempt is open.
    pub fn accepts_answers(self) -> bool {
        self == AttemptStatus::InProgress
    }

    /// An attempt is submitted exactly once.
    pub fn can_submit(self) -> bool {
        self == AttemptStatus::InProgress
    }

    pub fn can_manual_grade(self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::Graded)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::Completed => write!(f, "completed"),
            AttemptStatus::Graded => write!(f, "graded"),
        }
    }
}

/// One student's single pass at a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub student_id: StudentId,
    pub tenant_id: TenantId,
    pub course_id: CourseId,
    pub started_at: DateTime<Utc>,
    /// Unset until the attempt is submitted.
    pub ended_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
    /// Unset until grading completes.
    pub total_score: Option<u32>,
}

/// Data needed to create an attempt row.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: QuizId,
    pub student_id: StudentId,
    pub tenant_id: TenantId,
    pub course_id: CourseId,
    pub started_at: DateTime<Utc>,
}

/// Fields of an attempt that change after creation.
#[derive(Debug, Clone, Default)]
pub struct AttemptUpdate {
    pub status: Option<AttemptStatus>,
    pub total_score: Option<u32>,
    pub ended_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// A student's answer to one question within an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: AnswerId,
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
    pub tenant_id: TenantId,
    /// Used by choice questions. Only the first entry is graded.
    #[serde(default)]
    pub selected_option_ids: Vec<OptionId>,
    /// Used by short-answer questions, empty otherwise.
    #[serde(default)]
    pub text_answer: String,
    pub is_correct: Option<bool>,
    pub points_awarded: Option<u32>,
    pub answered_at: DateTime<Utc>,
}

impl StudentAnswer {
    pub fn is_graded(&self) -> bool {
        self.points_awarded.is_some()
    }
}

/// What a student sends for one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    #[serde(default)]
    pub selected_option_ids: Vec<OptionId>,
    #[serde(default)]
    pub text_answer: String,
}

impl AnswerSubmission {
    pub fn choice(option_ids: impl Into<Vec<OptionId>>) -> Self {
        Self {
            selected_option_ids: option_ids.into(),
            text_answer: String::new(),
        }
    }

    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            selected_option_ids: Vec::new(),
            text_answer: answer.into(),
        }
    }
}

/// Data needed to insert or overwrite the answer for (attempt, question).
#[derive(Debug, Clone)]
pub struct AnswerUpsert {
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
    pub tenant_id: TenantId,
    pub submission: AnswerSubmission,
    pub answered_at: DateTime<Utc>,
}

/// Grading result written back onto an answer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerGrade {
    pub is_correct: bool,
    pub points_awarded: u32,
}

// ---------------------------------------------------------------------------
// Rosters
// ---------------------------------------------------------------------------

/// One answer in a student's batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub submission: AnswerSubmission,
}

/// Everything one student answered, graded as a single attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSubmission {
    pub student_id: StudentId,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}
