//! The `quizmark init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("quizmark.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("quizzes")?;
    write_if_missing(Path::new("quizzes/example.toml"), EXAMPLE_QUIZ)?;

    std::fs::create_dir_all("rosters")?;
    write_if_missing(Path::new("rosters/example.toml"), EXAMPLE_ROSTER)?;

    println!("\nNext steps:");
    println!("  1. Edit quizmark.toml to set your tenant");
    println!("  2. Run: quizmark validate --quiz quizzes/example.toml");
    println!("  3. Run: quizmark grade --quiz quizzes/example.toml --roster rosters/example.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizmark configuration

default_tenant = 1
parallelism = 4
max_answers_per_attempt = 1000
output_dir = "./quizmark-results"
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
id = 1
course_id = 101
title = "Data Structures Warm-up"
description = "Three questions, one of each gradable type"

[[questions]]
id = 1
type = "multiple_choice"
text = "What is the time complexity of binary search on a sorted array?"
points = 2

[[questions.options]]
id = 11
text = "O(n)"

[[questions.options]]
id = 12
text = "O(log n)"
correct = true

[[questions.options]]
id = 13
text = "O(1)"

[[questions]]
id = 2
type = "true_false"
text = "A queue is a first-in, first-out structure."
points = 1

[[questions.options]]
id = 21
text = "True"
correct = true

[[questions.options]]
id = 22
text = "False"

[[questions]]
id = 3
type = "short_answer"
text = "Which tree keeps every left child smaller and every right child larger than its parent?"
points = 4
correct_answer = "binary search tree;BST"
"#;

const EXAMPLE_ROSTER: &str = r#"[[students]]
id = 1001

[[students.answers]]
question = 1
options = [12]

[[students.answers]]
question = 2
options = [21]

[[students.answers]]
question = 3
text = "BST"

[[students]]
id = 1002

[[students.answers]]
question = 1
options = [11]

[[students.answers]]
question = 2
options = [22]

[[students.answers]]
question = 3
text = "some kind of binary search tree"

[[students]]
id = 1003

[[students.answers]]
question = 3
text = "a hash map"
"#;
