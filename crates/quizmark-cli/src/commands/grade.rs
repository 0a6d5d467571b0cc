//! The `quizmark grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use quizmark_core::config::load_config_from;
use quizmark_core::engine::{BatchConfig, BatchGrader, ProgressReporter};
use quizmark_core::grading::Verdict;
use quizmark_core::model::{StudentId, TenantId};
use quizmark_core::parser;
use quizmark_core::report::{GradebookEntry, GradebookReport};
use quizmark_core::AttemptOrchestrator;
use quizmark_store::MemoryStore;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_student_start(&self, student_id: StudentId) {
        eprintln!("  Starting: student {student_id}");
    }

    fn on_student_complete(&self, entry: &GradebookEntry) {
        let review = if entry.needs_review() {
            " (needs review)"
        } else {
            ""
        };
        eprintln!(
            "  Done: student {} scored {}{review}",
            entry.student_id,
            entry.total_score()
        );
    }

    fn on_student_error(&self, student_id: StudentId, error: &str) {
        eprintln!("  ERROR: student {student_id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {completed}/{total} graded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    quiz_path: PathBuf,
    roster_path: PathBuf,
    tenant: Option<TenantId>,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let tenant_id = tenant.unwrap_or(config.default_tenant);
    let batch_config = BatchConfig {
        parallelism: parallelism.unwrap_or(config.parallelism),
    };
    anyhow::ensure!(
        batch_config.parallelism >= 1,
        "parallelism must be at least 1"
    );
    let output = output.unwrap_or_else(|| config.output_dir.clone());
    tracing::debug!(
        tenant_id,
        parallelism = batch_config.parallelism,
        output = %output.display(),
        "grading configuration"
    );

    let mut catalog = parser::parse_quiz_catalog(&quiz_path)?;
    catalog.assign_tenant(tenant_id);
    for w in parser::validate_quiz_catalog(&catalog) {
        match w.question_id {
            Some(id) => eprintln!("Warning: question {id}: {}", w.message),
            None => eprintln!("Warning: {}", w.message),
        }
    }

    let roster = parser::parse_roster(&roster_path)?;

    let store = Arc::new(MemoryStore::with_catalog(&catalog)?);
    let orchestrator = Arc::new(AttemptOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        config.orchestrator_config(),
    ));
    let grader = BatchGrader::new(orchestrator, store, batch_config);

    eprintln!(
        "quizmark v{} - Grading {} students on quiz {} ({}) for tenant {}",
        env!("CARGO_PKG_VERSION"),
        roster.len(),
        catalog.quiz.id,
        catalog.quiz.title,
        tenant_id
    );
    eprintln!();

    let report = grader
        .run(tenant_id, catalog.quiz.id, &roster, &ConsoleReporter)
        .await?;

    print_summary(&report);

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("gradebook-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Gradebook saved to: {}", path.display());

    Ok(())
}

fn print_summary(report: &GradebookReport) {
    use comfy_table::{Cell, Table};

    let max_points = report.quiz.max_points;
    let mut table = Table::new();
    table.set_header(vec![
        "Student", "Score", "Percent", "Correct", "Partial", "Review",
    ]);

    for entry in &report.entries {
        let count = |verdict: Verdict| {
            entry
                .graded
                .iter()
                .filter(|g| g.grade.verdict == verdict)
                .count()
        };
        table.add_row(vec![
            Cell::new(entry.student_id),
            Cell::new(format!("{}/{max_points}", entry.total_score())),
            Cell::new(format!("{:.1}%", entry.percent(max_points))),
            Cell::new(count(Verdict::Correct)),
            Cell::new(count(Verdict::PartialCredit)),
            Cell::new(if entry.needs_review() { "yes" } else { "" }),
        ]);
    }

    for failure in &report.failed_students {
        table.add_row(vec![
            Cell::new(failure.student_id),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(format!("failed: {}", failure.error)),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "Mean {:.2} / {max_points} ({:.1}%), median {:.1}",
        report.statistics.mean_score, report.statistics.mean_percent, report.statistics.median_score
    );
}
