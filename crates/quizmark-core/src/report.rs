//! Gradebook report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CourseId, QuestionId, QuizAttempt, QuizId, StudentId, TenantId};
use crate::orchestrator::{AnswerFailure, GradedAnswer};
use crate::statistics::QuizStatistics;

/// Results of grading a roster of students against one quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradebookReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub quiz: QuizSummary,
    /// One entry per student whose attempt was graded, ordered by student id.
    pub entries: Vec<GradebookEntry>,
    /// Students whose attempt could not be started or submitted.
    #[serde(default)]
    pub failed_students: Vec<StudentFailure>,
    pub statistics: QuizStatistics,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of the graded quiz (without questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: QuizId,
    pub course_id: CourseId,
    pub title: String,
    pub question_count: usize,
    pub max_points: u32,
}

/// One student's graded attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradebookEntry {
    pub student_id: StudentId,
    pub attempt: QuizAttempt,
    pub graded: Vec<GradedAnswer>,
    /// Answers recorded but not gradable automatically.
    #[serde(default)]
    pub failures: Vec<AnswerFailure>,
    /// Answers refused when they were submitted.
    #[serde(default)]
    pub rejected: Vec<RejectedAnswer>,
}

impl GradebookEntry {
    pub fn total_score(&self) -> u32 {
        self.attempt.total_score.unwrap_or(0)
    }

    /// Score as a percentage of `max_points`, 0 for an empty quiz.
    pub fn percent(&self, max_points: u32) -> f64 {
        if max_points == 0 {
            return 0.0;
        }
        self.total_score() as f64 / max_points as f64 * 100.0
    }

    /// Answers that need a human: ungradable or refused.
    pub fn needs_review(&self) -> bool {
        !self.failures.is_empty() || !self.rejected.is_empty()
    }
}

/// An answer refused at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedAnswer {
    pub question_id: QuestionId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentFailure {
    pub student_id: StudentId,
    pub error: String,
}

impl GradebookReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize gradebook")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write gradebook to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read gradebook from {}", path.display()))?;
        let report: GradebookReport =
            serde_json::from_str(&content).context("failed to parse gradebook JSON")?;
        Ok(report)
    }

    pub fn entry_for(&self, student_id: StudentId) -> Option<&GradebookEntry> {
        self.entries.iter().find(|e| e.student_id == student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradingError;
    use crate::grading::{Grade, Verdict};
    use crate::model::AttemptStatus;

    fn sample_report() -> GradebookReport {
        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id: 3,
            student_id: 42,
            tenant_id: 1,
            course_id: 9,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            status: AttemptStatus::Graded,
            total_score: Some(6),
        };
        GradebookReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            tenant_id: 1,
            quiz: QuizSummary {
                id: 3,
                course_id: 9,
                title: "Trees".into(),
                question_count: 3,
                max_points: 8,
            },
            entries: vec![GradebookEntry {
                student_id: 42,
                graded: vec![GradedAnswer {
                    answer_id: Uuid::new_v4(),
                    question_id: 1,
                    grade: Grade {
                        is_correct: true,
                        points: 6,
                        verdict: Verdict::Correct,
                    },
                }],
                failures: vec![AnswerFailure {
                    answer_id: Uuid::new_v4(),
                    question_id: 2,
                    error: GradingError::UnsupportedQuestionType("essay".into()),
                }],
                rejected: vec![],
                attempt,
            }],
            failed_students: vec![],
            statistics: QuizStatistics::default(),
            duration_ms: 12,
        }
    }

    #[test]
    fn entry_percent_and_review() {
        let report = sample_report();
        let entry = report.entry_for(42).unwrap();
        assert_eq!(entry.total_score(), 6);
        assert!((entry.percent(8) - 75.0).abs() < 1e-9);
        assert_eq!(entry.percent(0), 0.0);
        assert!(entry.needs_review());
        assert!(report.entry_for(7).is_none());
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gradebook.json");
        let report = sample_report();
        report.save_json(&path).unwrap();

        let loaded = GradebookReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.quiz.title, "Trees");
        assert_eq!(
            loaded.entries[0].failures[0].error,
            GradingError::UnsupportedQuestionType("essay".into())
        );
    }

    #[test]
    fn load_missing_file_fails() {
        let result = GradebookReport::load_json(Path::new("/nonexistent/gradebook.json"));
        assert!(result.is_err());
    }
}
