//! The `quizmark validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizmark_core::parser;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let catalogs = if quiz_path.is_dir() {
        parser::load_catalog_directory(&quiz_path)?
    } else {
        vec![parser::parse_quiz_catalog(&quiz_path)?]
    };

    let mut total_warnings = 0;

    for catalog in &catalogs {
        println!(
            "Quiz {}: {} ({} questions, {} points)",
            catalog.quiz.id,
            catalog.quiz.title,
            catalog.questions.len(),
            catalog.max_points()
        );

        let warnings = parser::validate_quiz_catalog(catalog);
        for w in &warnings {
            let prefix = w
                .question_id
                .map(|id| format!("  [question {id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
