//! The `quizmark stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizmark_core::report::GradebookReport;

pub fn execute(report_path: PathBuf, format: String) -> Result<()> {
    let report = GradebookReport::load_json(&report_path)?;
    let stats = &report.statistics;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!(
        "Quiz {}: {} (course {}, tenant {})",
        report.quiz.id, report.quiz.title, report.quiz.course_id, report.tenant_id
    );
    println!(
        "Attempts: {} ({} graded, {} failed)",
        stats.attempt_count,
        stats.graded_count,
        report.failed_students.len()
    );
    println!(
        "Scores: mean {:.2}, median {:.1}, min {}, max {} of {} ({:.1}%)",
        stats.mean_score,
        stats.median_score,
        stats.min_score,
        stats.max_score,
        stats.max_possible,
        stats.mean_percent
    );

    let mut table = Table::new();
    table.set_header(vec![
        "Question", "Points", "Answered", "Correct", "Partial", "Mean", "Correct %",
    ]);
    for q in stats.per_question.values() {
        table.add_row(vec![
            Cell::new(q.question_id),
            Cell::new(q.points),
            Cell::new(q.answered),
            Cell::new(q.correct),
            Cell::new(q.partial),
            Cell::new(format!("{:.2}", q.mean_points)),
            Cell::new(format!("{:.1}%", q.correct_rate * 100.0)),
        ]);
    }
    println!("\n{table}");

    let review: Vec<_> = report
        .entries
        .iter()
        .filter(|e| e.needs_review())
        .map(|e| e.student_id.to_string())
        .collect();
    if !review.is_empty() {
        println!("\nNeeds review: {}", review.join(", "));
    }

    Ok(())
}
