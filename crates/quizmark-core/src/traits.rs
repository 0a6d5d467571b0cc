//! Collaborator traits the orchestrator reads and writes through.
//!
//! Persistence lives outside this crate. `quizmark-store` provides an
//! in-memory implementation; a database-backed one implements the same traits.
//! Every method is scoped by a tenant id, and rows belonging to another tenant
//! must be reported as not found.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    AnswerGrade, AnswerId, AnswerOption, AnswerUpsert, AttemptId, AttemptUpdate, NewAttempt,
    Question, QuestionId, Quiz, QuizAttempt, QuizId, StudentAnswer, StudentId, TenantId,
};

// ---------------------------------------------------------------------------
// Question catalog
// ---------------------------------------------------------------------------

/// Read access to quizzes, questions and answer options.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn get_quiz(&self, tenant_id: TenantId, quiz_id: QuizId) -> Result<Quiz>;

    async fn list_questions_for_quiz(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
    ) -> Result<Vec<Question>>;

    async fn get_question(&self, tenant_id: TenantId, question_id: QuestionId) -> Result<Question>;

    /// Options of a choice question. Empty for short-answer questions.
    async fn list_options_for_question(
        &self,
        tenant_id: TenantId,
        question_id: QuestionId,
    ) -> Result<Vec<AnswerOption>>;
}

// ---------------------------------------------------------------------------
// Attempt persistence
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Create an attempt row. Must fail with `QuizError::AlreadyStarted` when
    /// the (quiz, student) pair already has one.
    async fn create_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt>;

    async fn find_attempt(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
        student_id: StudentId,
    ) -> Result<Option<QuizAttempt>>;

    async fn get_attempt(&self, tenant_id: TenantId, attempt_id: AttemptId) -> Result<QuizAttempt>;

    /// Apply the set fields of `update` and return the stored row.
    async fn update_attempt(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
        update: AttemptUpdate,
    ) -> Result<QuizAttempt>;

    async fn list_attempts_for_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> Result<Vec<QuizAttempt>>;

    async fn list_attempts_for_quiz(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>>;
}

// ---------------------------------------------------------------------------
// Answer persistence
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Insert the answer for (attempt, question), or overwrite the existing
    /// one. Overwriting clears any previous grade.
    async fn upsert_answer(&self, answer: AnswerUpsert) -> Result<StudentAnswer>;

    /// Answers of an attempt in the order they were first recorded, at most
    /// `limit` of them.
    async fn list_answers_for_attempt(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
        limit: usize,
    ) -> Result<Vec<StudentAnswer>>;

    async fn get_answer(&self, tenant_id: TenantId, answer_id: AnswerId) -> Result<StudentAnswer>;

    async fn update_answer(
        &self,
        tenant_id: TenantId,
        answer_id: AnswerId,
        grade: AnswerGrade,
    ) -> Result<StudentAnswer>;
}
