//! Score distribution and per-question statistics for a quiz.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{AttemptStatus, Question, QuestionId};
use crate::orchestrator::AttemptDetail;

/// Aggregate results over all attempts at one quiz.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizStatistics {
    /// Attempts in any state.
    pub attempt_count: usize,
    /// Attempts that reached `Graded` with a total score.
    pub graded_count: usize,
    /// Sum of the points of every question in the quiz.
    pub max_possible: u32,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: u32,
    pub max_score: u32,
    /// Mean score as a percentage of `max_possible`.
    pub mean_percent: f64,
    pub per_question: BTreeMap<QuestionId, QuestionStats>,
}

/// How students did on one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: QuestionId,
    pub points: u32,
    /// Answers recorded for this question.
    pub answered: usize,
    /// Answers graded as correct.
    pub correct: usize,
    /// Answers awarded partial credit (incorrect, but with points).
    pub partial: usize,
    /// Mean points over graded answers.
    pub mean_points: f64,
    /// `correct / graded answers`, 0 when nothing was graded.
    pub correct_rate: f64,
}

/// Compute quiz statistics from attempts and their answers.
///
/// Score statistics only consider graded attempts. Answers to questions
/// missing from `questions` are ignored.
pub fn compute_quiz_statistics(questions: &[Question], results: &[AttemptDetail]) -> QuizStatistics {
    let max_possible = questions
        .iter()
        .fold(0u32, |acc, q| acc.saturating_add(q.points));

    let mut scores: Vec<u32> = results
        .iter()
        .filter(|r| r.attempt.status == AttemptStatus::Graded)
        .filter_map(|r| r.attempt.total_score)
        .collect();
    scores.sort_unstable();

    let graded_count = scores.len();
    let mean_score = mean(scores.iter().map(|&s| s as f64));
    let mean_percent = if max_possible > 0 {
        mean_score / max_possible as f64 * 100.0
    } else {
        0.0
    };

    let mut per_question: BTreeMap<QuestionId, QuestionStats> = questions
        .iter()
        .map(|q| {
            (
                q.id,
                QuestionStats {
                    question_id: q.id,
                    points: q.points,
                    ..Default::default()
                },
            )
        })
        .collect();
    let mut points_by_question: BTreeMap<QuestionId, Vec<u32>> = BTreeMap::new();

    for answer in results.iter().flat_map(|r| r.answers.iter()) {
        let Some(stats) = per_question.get_mut(&answer.question_id) else {
            continue;
        };
        stats.answered += 1;
        if answer.is_correct == Some(true) {
            stats.correct += 1;
        }
        if let Some(points) = answer.points_awarded {
            if answer.is_correct == Some(false) && points > 0 {
                stats.partial += 1;
            }
            points_by_question
                .entry(answer.question_id)
                .or_default()
                .push(points);
        }
    }

    for (question_id, points) in &points_by_question {
        if let Some(stats) = per_question.get_mut(question_id) {
            stats.mean_points = mean(points.iter().map(|&p| p as f64));
            stats.correct_rate = stats.correct as f64 / points.len() as f64;
        }
    }

    QuizStatistics {
        attempt_count: results.len(),
        graded_count,
        max_possible,
        mean_score,
        median_score: median(&scores),
        min_score: scores.first().copied().unwrap_or(0),
        max_score: scores.last().copied().unwrap_or(0),
        mean_percent,
        per_question,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Median of sorted scores.
fn median(sorted: &[u32]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionType, QuizAttempt, StudentAnswer};
    use chrono::Utc;
    use uuid::Uuid;

    fn question(id: QuestionId, points: u32) -> Question {
        Question {
            id,
            quiz_id: 1,
            tenant_id: 1,
            kind: QuestionType::ShortAnswer,
            text: String::new(),
            points,
            correct_answer: Some("x".into()),
        }
    }

    fn detail(status: AttemptStatus, score: Option<u32>, answers: &[(QuestionId, bool, u32)]) -> AttemptDetail {
        let attempt_id = Uuid::new_v4();
        AttemptDetail {
            attempt: QuizAttempt {
                id: attempt_id,
                quiz_id: 1,
                student_id: 1,
                tenant_id: 1,
                course_id: 1,
                started_at: Utc::now(),
                ended_at: None,
                status,
                total_score: score,
            },
            answers: answers
                .iter()
                .map(|&(question_id, correct, points)| StudentAnswer {
                    id: Uuid::new_v4(),
                    attempt_id,
                    question_id,
                    tenant_id: 1,
                    selected_option_ids: vec![],
                    text_answer: "x".into(),
                    is_correct: Some(correct),
                    points_awarded: Some(points),
                    answered_at: Utc::now(),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_quiz() {
        let stats = compute_quiz_statistics(&[], &[]);
        assert_eq!(stats.attempt_count, 0);
        assert_eq!(stats.mean_score, 0.0);
        assert_eq!(stats.median_score, 0.0);
        assert_eq!(stats.mean_percent, 0.0);
    }

    #[test]
    fn score_distribution_over_graded_attempts() {
        let questions = vec![question(1, 4), question(2, 6)];
        let results = vec![
            detail(AttemptStatus::Graded, Some(10), &[(1, true, 4), (2, true, 6)]),
            detail(AttemptStatus::Graded, Some(4), &[(1, true, 4), (2, false, 0)]),
            detail(AttemptStatus::Graded, Some(7), &[(1, true, 4), (2, false, 3)]),
            detail(AttemptStatus::InProgress, None, &[]),
        ];

        let stats = compute_quiz_statistics(&questions, &results);
        assert_eq!(stats.attempt_count, 4);
        assert_eq!(stats.graded_count, 3);
        assert_eq!(stats.max_possible, 10);
        assert_eq!(stats.min_score, 4);
        assert_eq!(stats.max_score, 10);
        assert_eq!(stats.median_score, 7.0);
        assert!((stats.mean_score - 7.0).abs() < 1e-9);
        assert!((stats.mean_percent - 70.0).abs() < 1e-9);

        let q2 = &stats.per_question[&2];
        assert_eq!(q2.answered, 3);
        assert_eq!(q2.correct, 1);
        assert_eq!(q2.partial, 1);
        assert!((q2.mean_points - 3.0).abs() < 1e-9);
        assert!((q2.correct_rate - 1.0 / 3.0).abs() < 1e-9);

        assert_eq!(stats.per_question[&1].correct_rate, 1.0);
    }

    #[test]
    fn median_of_even_count() {
        assert_eq!(median(&[2, 4, 6, 8]), 5.0);
        assert_eq!(median(&[3]), 3.0);
    }
}
