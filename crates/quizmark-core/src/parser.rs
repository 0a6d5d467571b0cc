//! TOML quiz catalog and roster parser.
//!
//! Loads quizzes (with their questions and options) and student rosters from
//! TOML files, and validates catalogs for questions that can never be graded
//! automatically.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    AnswerOption, AnswerSubmission, CatalogQuestion, CourseId, OptionId, Question, QuestionId,
    QuestionType, Quiz, QuizCatalog, QuizId, StudentId, StudentSubmission, SubmittedAnswer,
    TenantId,
};

/// Tenant assigned to catalogs that do not name one.
pub const DEFAULT_TENANT_ID: TenantId = 1;

/// Intermediate TOML structure for parsing quiz catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: QuizId,
    #[serde(default)]
    tenant_id: Option<TenantId>,
    course_id: CourseId,
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: QuestionId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    points: i64,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: OptionId,
    text: String,
    #[serde(default)]
    correct: bool,
}

/// Parse a single TOML file into a `QuizCatalog`.
pub fn parse_quiz_catalog(path: &Path) -> Result<QuizCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_catalog_str(&content, path)
}

/// Parse a TOML string into a `QuizCatalog` (useful for testing).
pub fn parse_quiz_catalog_str(content: &str, source_path: &Path) -> Result<QuizCatalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let tenant_id = parsed.quiz.tenant_id.unwrap_or(DEFAULT_TENANT_ID);
    let quiz_id = parsed.quiz.id;

    let mut question_ids = HashSet::new();
    let mut option_ids = HashSet::new();

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            anyhow::ensure!(
                question_ids.insert(q.id),
                "duplicate question id {} in {}",
                q.id,
                source_path.display()
            );
            let points = u32::try_from(q.points)
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("question {}: points must be a positive integer", q.id)
                })?;

            let options = q
                .options
                .into_iter()
                .map(|o| {
                    anyhow::ensure!(
                        option_ids.insert(o.id),
                        "duplicate option id {} in question {}",
                        o.id,
                        q.id
                    );
                    Ok(AnswerOption {
                        id: o.id,
                        question_id: q.id,
                        text: o.text,
                        is_correct: o.correct,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(CatalogQuestion {
                question: Question {
                    id: q.id,
                    quiz_id,
                    tenant_id,
                    kind: QuestionType::from(q.kind),
                    text: q.text,
                    points,
                    correct_answer: q.correct_answer,
                },
                options,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuizCatalog {
        quiz: Quiz {
            id: quiz_id,
            tenant_id,
            course_id: parsed.quiz.course_id,
            title: parsed.quiz.title,
            description: parsed.quiz.description,
        },
        questions,
    })
}

/// Recursively load all `.toml` quiz catalogs from a directory.
pub fn load_catalog_directory(dir: &Path) -> Result<Vec<QuizCatalog>> {
    let mut catalogs = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            catalogs.extend(load_catalog_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz_catalog(&path) {
                Ok(catalog) => catalogs.push(catalog),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(catalogs)
}

// ---------------------------------------------------------------------------
// Rosters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TomlRosterFile {
    #[serde(default)]
    students: Vec<TomlStudent>,
}

#[derive(Debug, Deserialize)]
struct TomlStudent {
    id: StudentId,
    #[serde(default)]
    answers: Vec<TomlAnswer>,
}

#[derive(Debug, Deserialize)]
struct TomlAnswer {
    question: QuestionId,
    #[serde(default)]
    options: Vec<OptionId>,
    #[serde(default)]
    text: String,
}

/// Parse a roster of student submissions from a TOML file.
pub fn parse_roster(path: &Path) -> Result<Vec<StudentSubmission>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster file: {}", path.display()))?;

    parse_roster_str(&content, path)
}

/// Parse a roster from a TOML string.
///
/// Answer shapes are not checked here; the orchestrator rejects answers that
/// do not fit their question when they are submitted.
pub fn parse_roster_str(content: &str, source_path: &Path) -> Result<Vec<StudentSubmission>> {
    let parsed: TomlRosterFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut seen = HashSet::new();
    parsed
        .students
        .into_iter()
        .map(|s| {
            anyhow::ensure!(
                seen.insert(s.id),
                "student {} appears more than once in {}",
                s.id,
                source_path.display()
            );
            Ok(StudentSubmission {
                student_id: s.id,
                answers: s
                    .answers
                    .into_iter()
                    .map(|a| SubmittedAnswer {
                        question_id: a.question,
                        submission: AnswerSubmission {
                            selected_option_ids: a.options,
                            text_answer: a.text,
                        },
                    })
                    .collect(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<QuestionId>,
    /// Warning message.
    pub message: String,
}

/// Validate a quiz catalog for questions that will not grade automatically.
pub fn validate_quiz_catalog(catalog: &QuizCatalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if catalog.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "quiz has no questions".into(),
        });
    }

    for CatalogQuestion { question, options } in &catalog.questions {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(question.id),
                message,
            })
        };

        if question.text.trim().is_empty() {
            warn("question text is empty".into());
        }

        match &question.kind {
            QuestionType::MultipleChoice | QuestionType::TrueFalse => {
                if !options.iter().any(|o| o.is_correct) {
                    warn("no option is marked correct; answers will never be auto-graded".into());
                }
                if question.kind == QuestionType::TrueFalse && options.len() != 2 {
                    warn(format!(
                        "true/false question has {} options, expected 2",
                        options.len()
                    ));
                }
                if question.correct_answer.is_some() {
                    warn("correct_answer is ignored for choice questions".into());
                }
            }
            QuestionType::ShortAnswer => {
                let has_reference = question
                    .correct_answer
                    .as_deref()
                    .is_some_and(|r| !crate::grading::reference_variants(r).is_empty());
                if !has_reference {
                    warn("no reference answer; answers need manual grading".into());
                }
                if !options.is_empty() {
                    warn("options are ignored for short-answer questions".into());
                }
            }
            QuestionType::Other(tag) => {
                warn(format!("question type '{tag}' cannot be graded automatically"));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[quiz]
id = 7
tenant_id = 3
course_id = 21
title = "Data Structures"
description = "Week 4 check-in"

[[questions]]
id = 1
type = "multiple_choice"
text = "Lookup cost in a balanced BST?"
points = 2

[[questions.options]]
id = 11
text = "O(log n)"
correct = true

[[questions.options]]
id = 12
text = "O(n)"

[[questions]]
id = 2
type = "short_answer"
text = "Name the structure that keeps keys ordered for O(log n) search."
points = 4
correct_answer = "binary search tree;BST"
"#;

    #[test]
    fn parse_valid_toml() {
        let catalog = parse_quiz_catalog_str(VALID_TOML, &PathBuf::from("quiz.toml")).unwrap();
        assert_eq!(catalog.quiz.id, 7);
        assert_eq!(catalog.quiz.tenant_id, 3);
        assert_eq!(catalog.quiz.course_id, 21);
        assert_eq!(catalog.questions.len(), 2);
        assert_eq!(catalog.max_points(), 6);

        let mcq = &catalog.questions[0];
        assert_eq!(mcq.question.kind, QuestionType::MultipleChoice);
        assert_eq!(mcq.question.tenant_id, 3);
        assert_eq!(mcq.options.len(), 2);
        assert!(mcq.options[0].is_correct);
        assert!(!mcq.options[1].is_correct);
        assert_eq!(mcq.options[1].question_id, 1);

        assert!(validate_quiz_catalog(&catalog).is_empty());
    }

    #[test]
    fn parse_defaults_tenant() {
        let toml = r#"
[quiz]
id = 1
course_id = 2
title = "Minimal"
"#;
        let catalog = parse_quiz_catalog_str(toml, &PathBuf::from("quiz.toml")).unwrap();
        assert_eq!(catalog.quiz.tenant_id, DEFAULT_TENANT_ID);
        assert!(catalog.questions.is_empty());
    }

    #[test]
    fn parse_rejects_non_positive_points() {
        let toml = r#"
[quiz]
id = 1
course_id = 2
title = "Bad points"

[[questions]]
id = 1
type = "short_answer"
points = 0
"#;
        let err = parse_quiz_catalog_str(toml, &PathBuf::from("quiz.toml")).unwrap_err();
        assert!(err.to_string().contains("points must be a positive integer"));
    }

    #[test]
    fn parse_rejects_duplicate_ids() {
        let toml = r#"
[quiz]
id = 1
course_id = 2
title = "Dupes"

[[questions]]
id = 5
type = "short_answer"
points = 1

[[questions]]
id = 5
type = "short_answer"
points = 1
"#;
        let err = parse_quiz_catalog_str(toml, &PathBuf::from("quiz.toml")).unwrap_err();
        assert!(err.to_string().contains("duplicate question id 5"));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_quiz_catalog_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_ungradable_questions() {
        let toml = r#"
[quiz]
id = 1
course_id = 2
title = "Warnings"

[[questions]]
id = 1
type = "true_false"
text = "The sky is green."
points = 1

[[questions.options]]
id = 10
text = "True"

[[questions]]
id = 2
type = "short_answer"
text = "Explain recursion."
points = 3

[[questions]]
id = 3
type = "essay"
text = "Discuss."
points = 10
"#;
        let catalog = parse_quiz_catalog_str(toml, &PathBuf::from("quiz.toml")).unwrap();
        let warnings = validate_quiz_catalog(&catalog);
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();

        assert!(messages.iter().any(|m| m.contains("no option is marked correct")));
        assert!(messages.iter().any(|m| m.contains("expected 2")));
        assert!(messages.iter().any(|m| m.contains("no reference answer")));
        assert!(messages.iter().any(|m| m.contains("'essay'")));
        assert!(warnings.iter().all(|w| w.question_id.is_some()));
    }

    #[test]
    fn parse_roster_answers() {
        let toml = r#"
[[students]]
id = 100

[[students.answers]]
question = 1
options = [11]

[[students.answers]]
question = 2
text = "a binary search tree"

[[students]]
id = 101
"#;
        let roster = parse_roster_str(toml, &PathBuf::from("roster.toml")).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].answers.len(), 2);
        assert_eq!(roster[0].answers[0].submission, AnswerSubmission::choice(vec![11]));
        assert_eq!(
            roster[0].answers[1].submission,
            AnswerSubmission::text("a binary search tree")
        );
        assert!(roster[1].answers.is_empty());
    }

    #[test]
    fn parse_roster_rejects_duplicate_students() {
        let toml = r#"
[[students]]
id = 100

[[students]]
id = 100
"#;
        assert!(parse_roster_str(toml, &PathBuf::from("roster.toml")).is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quiz.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();

        let catalogs = load_catalog_directory(dir.path()).unwrap();
        assert_eq!(catalogs.len(), 1);
        assert_eq!(catalogs[0].quiz.title, "Data Structures");
    }
}
