//! Error types for the attempt lifecycle and the grading engine.
//!
//! `NotFound`, `Validation`, `StateConflict` and `AlreadyStarted` abort the
//! operation that raised them. A `GradingError` raised for one answer during
//! submission is collected on the outcome and the batch continues.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptId, AttemptStatus, QuestionId, QuestionType, QuizId, StudentId};

pub type Result<T, E = QuizError> = std::result::Result<T, E>;

/// Errors returned by the orchestrator and the storage collaborators.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The record does not exist, or exists outside the caller's tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request is malformed or does not fit the question it targets.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The attempt is not in a state that allows the operation.
    #[error("cannot {operation} attempt {attempt_id}: attempt is {status}")]
    StateConflict {
        attempt_id: AttemptId,
        status: AttemptStatus,
        operation: &'static str,
    },

    /// A second attempt was started for the same quiz and student.
    #[error("student {student_id} already has an attempt for quiz {quiz_id}")]
    AlreadyStarted { quiz_id: QuizId, student_id: StudentId },

    #[error(transparent)]
    Grading(#[from] GradingError),

    /// The storage backend failed.
    #[error("store error: {0}")]
    Store(String),
}

impl QuizError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        QuizError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QuizError::NotFound { .. })
    }

    /// Returns `true` for errors caused by the current state of stored data
    /// rather than by the request itself.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            QuizError::StateConflict { .. } | QuizError::AlreadyStarted { .. }
        )
    }
}

/// Reasons the engine could not grade a single answer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GradingError {
    #[error("question type '{0}' cannot be graded automatically")]
    UnsupportedQuestionType(String),

    /// The answered question is no longer in the catalog.
    #[error("question {0} is no longer available")]
    QuestionUnavailable(QuestionId),

    /// The stored answer does not have the shape its question expects.
    #[error("answer to {kind} question {question_id} has the wrong shape: {detail}")]
    ShapeMismatch {
        question_id: QuestionId,
        kind: QuestionType,
        detail: String,
    },
}
