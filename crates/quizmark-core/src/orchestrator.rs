//! Attempt orchestrator: the quiz attempt state machine.
//!
//! `start` opens an attempt, `submit_answer` records answers while it is in
//! progress, `submit` grades every answer and finalizes the attempt, and
//! `manual_grade` lets an instructor override the total afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GradingError, QuizError, Result};
use crate::grading::{grade_answer, shape_problem, Grade};
use crate::model::{
    AnswerId, AnswerSubmission, AnswerUpsert, AttemptId, AttemptStatus, AttemptUpdate,
    NewAttempt, Question, QuestionId, QuizAttempt, QuizId, StudentAnswer, StudentId, TenantId,
};
use crate::statistics::{compute_quiz_statistics, QuizStatistics};
use crate::traits::{AnswerStore, AttemptStore, QuestionCatalog};

/// Upper bound on answers graded per attempt.
pub const DEFAULT_MAX_ANSWERS_PER_ATTEMPT: usize = 1000;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Answers recorded and graded per attempt, at most.
    pub max_answers_per_attempt: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_answers_per_attempt: DEFAULT_MAX_ANSWERS_PER_ATTEMPT,
        }
    }
}

/// An answer that was graded during submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub answer_id: AnswerId,
    pub question_id: QuestionId,
    pub grade: Grade,
}

/// An answer the engine could not grade. Its points count as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerFailure {
    pub answer_id: AnswerId,
    pub question_id: QuestionId,
    pub error: GradingError,
}

/// Result of submitting an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub attempt: QuizAttempt,
    pub graded: Vec<GradedAnswer>,
    pub failures: Vec<AnswerFailure>,
}

impl SubmitOutcome {
    pub fn is_fully_graded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An attempt together with its recorded answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub attempt: QuizAttempt,
    pub answers: Vec<StudentAnswer>,
}

/// Drives quiz attempts through their lifecycle.
pub struct AttemptOrchestrator {
    catalog: Arc<dyn QuestionCatalog>,
    attempts: Arc<dyn AttemptStore>,
    answers: Arc<dyn AnswerStore>,
    config: OrchestratorConfig,
}

impl AttemptOrchestrator {
    pub fn new(
        catalog: Arc<dyn QuestionCatalog>,
        attempts: Arc<dyn AttemptStore>,
        answers: Arc<dyn AnswerStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            catalog,
            attempts,
            answers,
            config,
        }
    }

    /// Open a new attempt for a student. A student gets one attempt per quiz.
    pub async fn start(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
        student_id: StudentId,
    ) -> Result<QuizAttempt> {
        let quiz = self.catalog.get_quiz(tenant_id, quiz_id).await?;

        if self
            .attempts
            .find_attempt(tenant_id, quiz_id, student_id)
            .await?
            .is_some()
        {
            return Err(QuizError::AlreadyStarted {
                quiz_id,
                student_id,
            });
        }

        let attempt = self
            .attempts
            .create_attempt(NewAttempt {
                quiz_id,
                student_id,
                tenant_id,
                course_id: quiz.course_id,
                started_at: Utc::now(),
            })
            .await?;

        info!(
            attempt_id = %attempt.id,
            quiz_id,
            student_id,
            tenant_id,
            "attempt started"
        );
        Ok(attempt)
    }

    /// Record or overwrite the answer to one question of an open attempt.
    pub async fn submit_answer(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
        question_id: QuestionId,
        submission: AnswerSubmission,
    ) -> Result<StudentAnswer> {
        let attempt = self.attempts.get_attempt(tenant_id, attempt_id).await?;
        if !attempt.status.accepts_answers() {
            return Err(QuizError::StateConflict {
                attempt_id,
                status: attempt.status,
                operation: "answer",
            });
        }

        let question = self.catalog.get_question(tenant_id, question_id).await?;
        if question.quiz_id != attempt.quiz_id {
            return Err(QuizError::Validation(format!(
                "question {question_id} does not belong to quiz {}",
                attempt.quiz_id
            )));
        }
        self.validate_submission(tenant_id, &question, &submission)
            .await?;

        let existing = self
            .answers
            .list_answers_for_attempt(tenant_id, attempt_id, self.config.max_answers_per_attempt)
            .await?;
        let is_new = !existing.iter().any(|a| a.question_id == question_id);
        if is_new && existing.len() >= self.config.max_answers_per_attempt {
            return Err(QuizError::Validation(format!(
                "attempt {attempt_id} already has {} answers",
                existing.len()
            )));
        }

        let answer = self
            .answers
            .upsert_answer(AnswerUpsert {
                attempt_id,
                question_id,
                tenant_id,
                submission,
                answered_at: Utc::now(),
            })
            .await?;

        debug!(%attempt_id, question_id, overwritten = !is_new, "answer recorded");
        Ok(answer)
    }

    async fn validate_submission(
        &self,
        tenant_id: TenantId,
        question: &Question,
        submission: &AnswerSubmission,
    ) -> Result<()> {
        if let Some(problem) = shape_problem(
            &question.kind,
            &submission.selected_option_ids,
            &submission.text_answer,
        ) {
            return Err(QuizError::Validation(format!(
                "question {}: {problem}",
                question.id
            )));
        }

        if submission.selected_option_ids.is_empty() {
            return Ok(());
        }
        let options = self
            .catalog
            .list_options_for_question(tenant_id, question.id)
            .await?;
        if let Some(unknown) = submission
            .selected_option_ids
            .iter()
            .find(|id| !options.iter().any(|o| o.id == **id))
        {
            return Err(QuizError::Validation(format!(
                "option {unknown} does not belong to question {}",
                question.id
            )));
        }
        Ok(())
    }

    /// Grade every answer of an open attempt and finalize it.
    ///
    /// Answers the engine cannot grade are reported in
    /// [`SubmitOutcome::failures`] and contribute nothing to the total; they
    /// do not stop the attempt from reaching `Graded`.
    ///
    /// Every answer is graded before any grade is written. If a write fails
    /// the attempt stays `InProgress` and a later `submit` regrades it.
    pub async fn submit(&self, tenant_id: TenantId, attempt_id: AttemptId) -> Result<SubmitOutcome> {
        let attempt = self.attempts.get_attempt(tenant_id, attempt_id).await?;
        if !attempt.status.can_submit() {
            return Err(QuizError::StateConflict {
                attempt_id,
                status: attempt.status,
                operation: "submit",
            });
        }

        let answers = self
            .answers
            .list_answers_for_attempt(tenant_id, attempt_id, self.config.max_answers_per_attempt)
            .await?;

        let mut graded = Vec::with_capacity(answers.len());
        let mut failures = Vec::new();

        for answer in &answers {
            match self.grade_one(tenant_id, answer).await {
                Ok(grade) => {
                    debug!(
                        %attempt_id,
                        question_id = answer.question_id,
                        verdict = ?grade.verdict,
                        points = grade.points,
                        "answer graded"
                    );
                    graded.push(GradedAnswer {
                        answer_id: answer.id,
                        question_id: answer.question_id,
                        grade,
                    });
                }
                Err(QuizError::Grading(cause)) => {
                    warn!(
                        %attempt_id,
                        answer_id = %answer.id,
                        question_id = answer.question_id,
                        "skipping answer: {cause}"
                    );
                    failures.push(AnswerFailure {
                        answer_id: answer.id,
                        question_id: answer.question_id,
                        error: cause,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        let mut total: u32 = 0;
        for answer in &graded {
            let stored = self
                .answers
                .update_answer(tenant_id, answer.answer_id, answer.grade.to_answer_grade())
                .await?;
            total = total.saturating_add(stored.points_awarded.unwrap_or(0));
        }

        let attempt = self
            .attempts
            .update_attempt(
                tenant_id,
                attempt_id,
                AttemptUpdate {
                    status: Some(AttemptStatus::Graded),
                    total_score: Some(total),
                    ended_at: Some(Utc::now()),
                },
            )
            .await?;

        info!(
            %attempt_id,
            total_score = total,
            graded = graded.len(),
            failed = failures.len(),
            "attempt graded"
        );
        Ok(SubmitOutcome {
            attempt,
            graded,
            failures,
        })
    }

    /// Grade one stored answer. Catalog lookups that come back not found are
    /// grading failures for that answer, not for the attempt.
    async fn grade_one(&self, tenant_id: TenantId, answer: &StudentAnswer) -> Result<Grade> {
        let question = match self.catalog.get_question(tenant_id, answer.question_id).await {
            Ok(q) => q,
            Err(e) if e.is_not_found() => {
                return Err(GradingError::QuestionUnavailable(answer.question_id).into())
            }
            Err(e) => return Err(e),
        };
        let options = if question.kind.is_choice() {
            self.catalog
                .list_options_for_question(tenant_id, question.id)
                .await?
        } else {
            Vec::new()
        };
        Ok(grade_answer(&question, &options, answer)?)
    }

    /// Overwrite the total score of a submitted attempt.
    pub async fn manual_grade(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
        score: u32,
    ) -> Result<QuizAttempt> {
        let attempt = self.attempts.get_attempt(tenant_id, attempt_id).await?;
        if !attempt.status.can_manual_grade() {
            return Err(QuizError::StateConflict {
                attempt_id,
                status: attempt.status,
                operation: "manually grade",
            });
        }

        let updated = self
            .attempts
            .update_attempt(
                tenant_id,
                attempt_id,
                AttemptUpdate {
                    status: Some(AttemptStatus::Graded),
                    total_score: Some(score),
                    ended_at: attempt.ended_at.or_else(|| Some(Utc::now())),
                },
            )
            .await?;

        info!(
            %attempt_id,
            previous_score = ?attempt.total_score,
            score,
            "attempt manually graded"
        );
        Ok(updated)
    }

    pub async fn attempt(&self, tenant_id: TenantId, attempt_id: AttemptId) -> Result<QuizAttempt> {
        self.attempts.get_attempt(tenant_id, attempt_id).await
    }

    pub async fn attempt_with_answers(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
    ) -> Result<AttemptDetail> {
        let attempt = self.attempts.get_attempt(tenant_id, attempt_id).await?;
        let answers = self
            .answers
            .list_answers_for_attempt(tenant_id, attempt_id, self.config.max_answers_per_attempt)
            .await?;
        Ok(AttemptDetail { attempt, answers })
    }

    pub async fn attempts_for_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> Result<Vec<QuizAttempt>> {
        self.attempts
            .list_attempts_for_student(tenant_id, student_id)
            .await
    }

    pub async fn attempts_for_quiz(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>> {
        self.attempts.list_attempts_for_quiz(tenant_id, quiz_id).await
    }

    /// Score distribution and per-question results over every attempt at a quiz.
    pub async fn quiz_statistics(&self, tenant_id: TenantId, quiz_id: QuizId) -> Result<QuizStatistics> {
        let questions = self
            .catalog
            .list_questions_for_quiz(tenant_id, quiz_id)
            .await?;
        let attempts = self.attempts.list_attempts_for_quiz(tenant_id, quiz_id).await?;

        let mut answers_by_attempt: HashMap<AttemptId, Vec<StudentAnswer>> = HashMap::new();
        for attempt in &attempts {
            let answers = self
                .answers
                .list_answers_for_attempt(tenant_id, attempt.id, self.config.max_answers_per_attempt)
                .await?;
            answers_by_attempt.insert(attempt.id, answers);
        }

        let results: Vec<AttemptDetail> = attempts
            .into_iter()
            .map(|attempt| AttemptDetail {
                answers: answers_by_attempt.remove(&attempt.id).unwrap_or_default(),
                attempt,
            })
            .collect();

        Ok(compute_quiz_statistics(&questions, &results))
    }
}
