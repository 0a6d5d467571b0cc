//! Batch grading engine.
//!
//! Runs the full attempt lifecycle for every student of a roster against one
//! quiz. Attempts share no state, so they run concurrently up to the
//! configured parallelism.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::QuizError;
use crate::model::{QuizId, StudentId, StudentSubmission, TenantId};
use crate::orchestrator::AttemptOrchestrator;
use crate::report::{GradebookEntry, GradebookReport, QuizSummary, RejectedAnswer, StudentFailure};
use crate::traits::QuestionCatalog;

/// Configuration for the batch engine.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum attempts in flight.
    pub parallelism: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_student_start(&self, student_id: StudentId);
    fn on_student_complete(&self, entry: &GradebookEntry);
    fn on_student_error(&self, student_id: StudentId, error: &str);
    fn on_batch_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_student_start(&self, _: StudentId) {}
    fn on_student_complete(&self, _: &GradebookEntry) {}
    fn on_student_error(&self, _: StudentId, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// Grades whole rosters through an [`AttemptOrchestrator`].
pub struct BatchGrader {
    orchestrator: Arc<AttemptOrchestrator>,
    catalog: Arc<dyn QuestionCatalog>,
    config: BatchConfig,
}

impl BatchGrader {
    pub fn new(
        orchestrator: Arc<AttemptOrchestrator>,
        catalog: Arc<dyn QuestionCatalog>,
        config: BatchConfig,
    ) -> Self {
        Self {
            orchestrator,
            catalog,
            config,
        }
    }

    /// Start, answer and submit one attempt per student, then gather the
    /// results into a gradebook.
    pub async fn run(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
        roster: &[StudentSubmission],
        progress: &dyn ProgressReporter,
    ) -> Result<GradebookReport> {
        let start = Instant::now();
        let quiz = self.catalog.get_quiz(tenant_id, quiz_id).await?;
        let questions = self
            .catalog
            .list_questions_for_quiz(tenant_id, quiz_id)
            .await?;

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for student in roster {
            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&semaphore);

            futures.push(async move {
                let student_id = student.student_id;
                let inner = async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                    progress.on_student_start(student_id);
                    grade_student(&orchestrator, tenant_id, quiz_id, student).await
                };
                (student_id, inner.await)
            });
        }

        let mut entries = Vec::new();
        let mut failed_students = Vec::new();
        let total = futures.len();

        while let Some((student_id, result)) = futures.next().await {
            match result {
                Ok(entry) => {
                    progress.on_student_complete(&entry);
                    entries.push(entry);
                }
                Err(e) => {
                    tracing::error!("grading failed for student {student_id}: {e:#}");
                    progress.on_student_error(student_id, &e.to_string());
                    failed_students.push(StudentFailure {
                        student_id,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        let elapsed = start.elapsed();
        progress.on_batch_complete(total, entries.len(), failed_students.len(), elapsed);

        entries.sort_by_key(|e| e.student_id);
        failed_students.sort_by_key(|f| f.student_id);

        let statistics = self.orchestrator.quiz_statistics(tenant_id, quiz_id).await?;

        Ok(GradebookReport {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            tenant_id,
            quiz: QuizSummary {
                id: quiz.id,
                course_id: quiz.course_id,
                title: quiz.title,
                question_count: questions.len(),
                max_points: statistics.max_possible,
            },
            entries,
            failed_students,
            statistics,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}

/// Run one student's attempt. Answers refused by validation are recorded on
/// the entry; anything else fails the student.
async fn grade_student(
    orchestrator: &AttemptOrchestrator,
    tenant_id: TenantId,
    quiz_id: QuizId,
    student: &StudentSubmission,
) -> Result<GradebookEntry> {
    let attempt = orchestrator
        .start(tenant_id, quiz_id, student.student_id)
        .await?;

    let mut rejected = Vec::new();
    for answer in &student.answers {
        match orchestrator
            .submit_answer(
                tenant_id,
                attempt.id,
                answer.question_id,
                answer.submission.clone(),
            )
            .await
        {
            Ok(_) => {}
            Err(e @ (QuizError::Validation(_) | QuizError::NotFound { .. })) => {
                tracing::warn!(
                    student_id = student.student_id,
                    question_id = answer.question_id,
                    "answer rejected: {e}"
                );
                rejected.push(RejectedAnswer {
                    question_id: answer.question_id,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    let outcome = orchestrator.submit(tenant_id, attempt.id).await?;
    Ok(GradebookEntry {
        student_id: student.student_id,
        attempt: outcome.attempt,
        graded: outcome.graded,
        failures: outcome.failures,
        rejected,
    })
}
