//! In-memory store implementing every quizmark collaborator trait.
//!
//! Catalog rows are keyed by (tenant, id), so tenants may reuse ids. Attempt
//! and answer rows carry their tenant id; every lookup checks the caller's
//! tenant and reports rows of other tenants as not found.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use quizmark_core::error::{QuizError, Result};
use quizmark_core::model::{
    AnswerGrade, AnswerId, AnswerOption, AnswerUpsert, AttemptId, AttemptStatus, AttemptUpdate,
    NewAttempt, Question, QuestionId, Quiz, QuizAttempt, QuizCatalog, QuizId, StudentAnswer,
    StudentId, TenantId,
};
use quizmark_core::traits::{AnswerStore, AttemptStore, QuestionCatalog};

#[derive(Default)]
struct State {
    quizzes: HashMap<(TenantId, QuizId), Quiz>,
    questions: HashMap<(TenantId, QuestionId), Question>,
    options: HashMap<(TenantId, QuestionId), Vec<AnswerOption>>,
    attempts: HashMap<AttemptId, QuizAttempt>,
    /// (tenant, quiz, student) -> attempt
    attempt_keys: HashMap<(TenantId, QuizId, StudentId), AttemptId>,
    answers: HashMap<AnswerId, StudentAnswer>,
    /// (attempt, question) -> answer
    answer_keys: HashMap<(AttemptId, QuestionId), AnswerId>,
    /// Answer ids per attempt in first-recorded order.
    answer_order: HashMap<AttemptId, Vec<AnswerId>>,
}

impl State {
    fn attempt(&self, tenant_id: TenantId, attempt_id: AttemptId) -> Result<&QuizAttempt> {
        self.attempts
            .get(&attempt_id)
            .filter(|a| a.tenant_id == tenant_id)
            .ok_or_else(|| QuizError::not_found("attempt", attempt_id))
    }

    fn question(&self, tenant_id: TenantId, question_id: QuestionId) -> Result<&Question> {
        self.questions
            .get(&(tenant_id, question_id))
            .ok_or_else(|| QuizError::not_found("question", question_id))
    }
}

/// A thread-safe, tenant-scoped store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with one quiz catalog.
    pub fn with_catalog(catalog: &QuizCatalog) -> Result<Self> {
        let store = Self::new();
        store.load_catalog(catalog)?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| QuizError::Store("memory store lock poisoned".into()))
    }

    /// Insert or replace a quiz with all of its questions and options.
    pub fn load_catalog(&self, catalog: &QuizCatalog) -> Result<()> {
        self.insert_quiz(catalog.quiz.clone())?;
        for entry in &catalog.questions {
            self.insert_question(entry.question.clone(), entry.options.clone())?;
        }
        tracing::debug!(
            quiz_id = catalog.quiz.id,
            tenant_id = catalog.quiz.tenant_id,
            questions = catalog.questions.len(),
            "catalog loaded"
        );
        Ok(())
    }

    pub fn insert_quiz(&self, quiz: Quiz) -> Result<()> {
        self.lock()?.quizzes.insert((quiz.tenant_id, quiz.id), quiz);
        Ok(())
    }

    /// Insert or replace a question. The quiz must already exist in the
    /// question's tenant.
    pub fn insert_question(&self, question: Question, options: Vec<AnswerOption>) -> Result<()> {
        let mut state = self.lock()?;
        if !state
            .quizzes
            .contains_key(&(question.tenant_id, question.quiz_id))
        {
            return Err(QuizError::not_found("quiz", question.quiz_id));
        }
        if let Some(foreign) = options.iter().find(|o| o.question_id != question.id) {
            return Err(QuizError::Validation(format!(
                "option {} belongs to question {}, not {}",
                foreign.id, foreign.question_id, question.id
            )));
        }
        let key = (question.tenant_id, question.id);
        state.options.insert(key, options);
        state.questions.insert(key, question);
        Ok(())
    }

    /// Remove a question and its options from the catalog. Recorded answers
    /// are left in place.
    pub fn remove_question(&self, tenant_id: TenantId, question_id: QuestionId) -> Result<()> {
        let mut state = self.lock()?;
        state.question(tenant_id, question_id)?;
        state.questions.remove(&(tenant_id, question_id));
        state.options.remove(&(tenant_id, question_id));
        Ok(())
    }
}

#[async_trait]
impl QuestionCatalog for MemoryStore {
    async fn get_quiz(&self, tenant_id: TenantId, quiz_id: QuizId) -> Result<Quiz> {
        self.lock()?
            .quizzes
            .get(&(tenant_id, quiz_id))
            .cloned()
            .ok_or_else(|| QuizError::not_found("quiz", quiz_id))
    }

    async fn list_questions_for_quiz(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
    ) -> Result<Vec<Question>> {
        let state = self.lock()?;
        if !state.quizzes.contains_key(&(tenant_id, quiz_id)) {
            return Err(QuizError::not_found("quiz", quiz_id));
        }
        let mut questions: Vec<Question> = state
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz_id && q.tenant_id == tenant_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.id);
        Ok(questions)
    }

    async fn get_question(&self, tenant_id: TenantId, question_id: QuestionId) -> Result<Question> {
        self.lock()?.question(tenant_id, question_id).cloned()
    }

    async fn list_options_for_question(
        &self,
        tenant_id: TenantId,
        question_id: QuestionId,
    ) -> Result<Vec<AnswerOption>> {
        let state = self.lock()?;
        state.question(tenant_id, question_id)?;
        Ok(state
            .options
            .get(&(tenant_id, question_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn create_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt> {
        let mut state = self.lock()?;
        let key = (attempt.tenant_id, attempt.quiz_id, attempt.student_id);
        if state.attempt_keys.contains_key(&key) {
            return Err(QuizError::AlreadyStarted {
                quiz_id: attempt.quiz_id,
                student_id: attempt.student_id,
            });
        }

        let row = QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id: attempt.quiz_id,
            student_id: attempt.student_id,
            tenant_id: attempt.tenant_id,
            course_id: attempt.course_id,
            started_at: attempt.started_at,
            ended_at: None,
            status: AttemptStatus::InProgress,
            total_score: None,
        };
        state.attempt_keys.insert(key, row.id);
        state.attempts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_attempt(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
        student_id: StudentId,
    ) -> Result<Option<QuizAttempt>> {
        let state = self.lock()?;
        Ok(state
            .attempt_keys
            .get(&(tenant_id, quiz_id, student_id))
            .and_then(|id| state.attempts.get(id))
            .cloned())
    }

    async fn get_attempt(&self, tenant_id: TenantId, attempt_id: AttemptId) -> Result<QuizAttempt> {
        self.lock()?.attempt(tenant_id, attempt_id).cloned()
    }

    async fn update_attempt(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
        update: AttemptUpdate,
    ) -> Result<QuizAttempt> {
        let mut state = self.lock()?;
        state.attempt(tenant_id, attempt_id)?;
        let row = state
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| QuizError::not_found("attempt", attempt_id))?;

        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(score) = update.total_score {
            row.total_score = Some(score);
        }
        if let Some(ended_at) = update.ended_at {
            row.ended_at = Some(ended_at);
        }
        Ok(row.clone())
    }

    async fn list_attempts_for_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> Result<Vec<QuizAttempt>> {
        let state = self.lock()?;
        let mut attempts: Vec<QuizAttempt> = state
            .attempts
            .values()
            .filter(|a| a.tenant_id == tenant_id && a.student_id == student_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| (a.started_at, a.quiz_id));
        Ok(attempts)
    }

    async fn list_attempts_for_quiz(
        &self,
        tenant_id: TenantId,
        quiz_id: QuizId,
    ) -> Result<Vec<QuizAttempt>> {
        let state = self.lock()?;
        let mut attempts: Vec<QuizAttempt> = state
            .attempts
            .values()
            .filter(|a| a.tenant_id == tenant_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| (a.started_at, a.student_id));
        Ok(attempts)
    }
}

#[async_trait]
impl AnswerStore for MemoryStore {
    async fn upsert_answer(&self, answer: AnswerUpsert) -> Result<StudentAnswer> {
        let mut state = self.lock()?;
        state.attempt(answer.tenant_id, answer.attempt_id)?;

        let key = (answer.attempt_id, answer.question_id);
        let existing_id = state.answer_keys.get(&key).copied();
        if let Some(existing) = existing_id.and_then(|id| state.answers.get_mut(&id)) {
            existing.selected_option_ids = answer.submission.selected_option_ids;
            existing.text_answer = answer.submission.text_answer;
            existing.is_correct = None;
            existing.points_awarded = None;
            existing.answered_at = answer.answered_at;
            return Ok(existing.clone());
        }

        let row = StudentAnswer {
            id: Uuid::new_v4(),
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            tenant_id: answer.tenant_id,
            selected_option_ids: answer.submission.selected_option_ids,
            text_answer: answer.submission.text_answer,
            is_correct: None,
            points_awarded: None,
            answered_at: answer.answered_at,
        };
        state.answer_keys.insert(key, row.id);
        state
            .answer_order
            .entry(answer.attempt_id)
            .or_default()
            .push(row.id);
        state.answers.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_answers_for_attempt(
        &self,
        tenant_id: TenantId,
        attempt_id: AttemptId,
        limit: usize,
    ) -> Result<Vec<StudentAnswer>> {
        let state = self.lock()?;
        state.attempt(tenant_id, attempt_id)?;
        Ok(state
            .answer_order
            .get(&attempt_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.answers.get(id))
                    .filter(|a| a.tenant_id == tenant_id)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_answer(&self, tenant_id: TenantId, answer_id: AnswerId) -> Result<StudentAnswer> {
        self.lock()?
            .answers
            .get(&answer_id)
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| QuizError::not_found("answer", answer_id))
    }

    async fn update_answer(
        &self,
        tenant_id: TenantId,
        answer_id: AnswerId,
        grade: AnswerGrade,
    ) -> Result<StudentAnswer> {
        let mut state = self.lock()?;
        let row = state
            .answers
            .get_mut(&answer_id)
            .filter(|a| a.tenant_id == tenant_id)
            .ok_or_else(|| QuizError::not_found("answer", answer_id))?;
        row.is_correct = Some(grade.is_correct);
        row.points_awarded = Some(grade.points_awarded);
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quizmark_core::model::{AnswerSubmission, CatalogQuestion, QuestionType};

    fn catalog(tenant_id: TenantId) -> QuizCatalog {
        QuizCatalog {
            quiz: Quiz {
                id: 1,
                tenant_id,
                course_id: 5,
                title: "Sets".into(),
                description: String::new(),
            },
            questions: vec![CatalogQuestion {
                question: Question {
                    id: 10,
                    quiz_id: 1,
                    tenant_id,
                    kind: QuestionType::TrueFalse,
                    text: "The empty set is a subset of every set.".into(),
                    points: 1,
                    correct_answer: None,
                },
                options: vec![
                    AnswerOption {
                        id: 100,
                        question_id: 10,
                        text: "True".into(),
                        is_correct: true,
                    },
                    AnswerOption {
                        id: 101,
                        question_id: 10,
                        text: "False".into(),
                        is_correct: false,
                    },
                ],
            }],
        }
    }

    fn new_attempt(tenant_id: TenantId, student_id: StudentId) -> NewAttempt {
        NewAttempt {
            quiz_id: 1,
            student_id,
            tenant_id,
            course_id: 5,
            started_at: Utc::now(),
        }
    }

    fn upsert(tenant_id: TenantId, attempt_id: AttemptId, submission: AnswerSubmission) -> AnswerUpsert {
        AnswerUpsert {
            attempt_id,
            question_id: 10,
            tenant_id,
            submission,
            answered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn catalog_is_tenant_scoped() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();

        assert_eq!(store.get_quiz(1, 1).await.unwrap().title, "Sets");
        assert!(store.get_quiz(2, 1).await.unwrap_err().is_not_found());
        assert!(store.get_question(2, 10).await.unwrap_err().is_not_found());
        assert!(store
            .list_options_for_question(2, 10)
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(store.list_options_for_question(1, 10).await.unwrap().len(), 2);
        assert_eq!(store.list_questions_for_quiz(1, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tenants_may_reuse_catalog_ids() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let mut other = catalog(2);
        other.quiz.title = "Other college".into();
        other.questions[0].options.truncate(1);
        store.load_catalog(&other).unwrap();

        assert_eq!(store.get_quiz(1, 1).await.unwrap().title, "Sets");
        assert_eq!(store.get_quiz(2, 1).await.unwrap().title, "Other college");
        assert_eq!(store.get_question(1, 10).await.unwrap().tenant_id, 1);
        assert_eq!(store.get_question(2, 10).await.unwrap().tenant_id, 2);
        assert_eq!(store.list_options_for_question(1, 10).await.unwrap().len(), 2);
        assert_eq!(store.list_options_for_question(2, 10).await.unwrap().len(), 1);
        assert_eq!(store.list_questions_for_quiz(1, 1).await.unwrap().len(), 1);

        store.remove_question(2, 10).unwrap();
        assert!(store.get_question(2, 10).await.unwrap_err().is_not_found());
        assert_eq!(store.get_question(1, 10).await.unwrap().id, 10);
    }

    #[tokio::test]
    async fn insert_question_requires_quiz_in_tenant() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let mut question = catalog(2).questions.remove(0).question;
        question.id = 11;
        let err = store.insert_question(question, vec![]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn create_attempt_rejects_duplicates() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let first = store.create_attempt(new_attempt(1, 7)).await.unwrap();
        assert_eq!(first.status, AttemptStatus::InProgress);

        let err = store.create_attempt(new_attempt(1, 7)).await.unwrap_err();
        assert!(err.is_conflict());

        let found = store.find_attempt(1, 1, 7).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(store.find_attempt(2, 1, 7).await.unwrap().is_none());
        assert!(store.get_attempt(2, first.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_attempt_applies_set_fields() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let attempt = store.create_attempt(new_attempt(1, 7)).await.unwrap();

        let updated = store
            .update_attempt(
                1,
                attempt.id,
                AttemptUpdate {
                    total_score: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_score, Some(3));
        assert_eq!(updated.status, AttemptStatus::InProgress);
        assert!(updated.ended_at.is_none());

        let err = store
            .update_attempt(2, attempt.id, AttemptUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn upsert_overwrites_and_clears_grade() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let attempt = store.create_attempt(new_attempt(1, 7)).await.unwrap();

        let first = store
            .upsert_answer(upsert(1, attempt.id, AnswerSubmission::choice(vec![101])))
            .await
            .unwrap();
        store
            .update_answer(
                1,
                first.id,
                AnswerGrade {
                    is_correct: false,
                    points_awarded: 0,
                },
            )
            .await
            .unwrap();

        let second = store
            .upsert_answer(upsert(1, attempt.id, AnswerSubmission::choice(vec![100])))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.selected_option_ids, vec![100]);
        assert_eq!(second.points_awarded, None);

        let answers = store
            .list_answers_for_attempt(1, attempt.id, 1000)
            .await
            .unwrap();
        assert_eq!(answers.len(), 1);
    }

    #[tokio::test]
    async fn answers_are_tenant_scoped() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let attempt = store.create_attempt(new_attempt(1, 7)).await.unwrap();

        let err = store
            .upsert_answer(upsert(2, attempt.id, AnswerSubmission::choice(vec![100])))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let answer = store
            .upsert_answer(upsert(1, attempt.id, AnswerSubmission::choice(vec![100])))
            .await
            .unwrap();
        assert!(store.get_answer(2, answer.id).await.unwrap_err().is_not_found());
        assert!(store
            .list_answers_for_attempt(2, attempt.id, 10)
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(store.get_answer(1, answer.id).await.unwrap().id, answer.id);
    }

    #[tokio::test]
    async fn list_attempts_by_student_and_quiz() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        store.create_attempt(new_attempt(1, 7)).await.unwrap();
        store.create_attempt(new_attempt(1, 8)).await.unwrap();

        assert_eq!(store.list_attempts_for_quiz(1, 1).await.unwrap().len(), 2);
        assert_eq!(store.list_attempts_for_student(1, 7).await.unwrap().len(), 1);
        assert!(store.list_attempts_for_quiz(2, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_question_keeps_answers() {
        let store = MemoryStore::with_catalog(&catalog(1)).unwrap();
        let attempt = store.create_attempt(new_attempt(1, 7)).await.unwrap();
        store
            .upsert_answer(upsert(1, attempt.id, AnswerSubmission::choice(vec![100])))
            .await
            .unwrap();

        store.remove_question(1, 10).unwrap();
        assert!(store.get_question(1, 10).await.unwrap_err().is_not_found());
        assert_eq!(
            store
                .list_answers_for_attempt(1, attempt.id, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
