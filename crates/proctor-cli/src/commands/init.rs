//! The `proctor init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("proctor.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("catalogs/example.toml"), EXAMPLE_CATALOG)?;
    write_if_missing(Path::new("scripts/example.toml"), EXAMPLE_SCRIPT)?;

    println!("\nNext steps:");
    println!("  1. Edit catalogs/example.toml with your own questions");
    println!("  2. Run: proctor validate --catalog catalogs");
    println!(
        "  3. Run: proctor run --test example --component intro --roadmap getting-started --script scripts/example.toml"
    );

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# proctor configuration

catalog = "./catalogs"
history = "./proctor-history.json"
tick_ms = 1000
environment = "console"

[policy]
soft_violation_limit = 2
extra_blocked_shortcuts = []
warning_below_secs = 60
critical_below_secs = 30
"#;

const EXAMPLE_CATALOG: &str = r#"[[tests]]
id = "example"
title = "Example Test"
description = "A short test to get started"
time_limit_minutes = 5
passing_score_percent = 80
max_attempts = 3

[[tests.questions]]
id = "q1"
question = "Which keyword is used to declare a variable that cannot be reassigned?"
type = "multiple-choice"
options = ["var", "let", "const", "final"]
correct_answer = "const"
points = 50

[[tests.questions]]
id = "q2"
question = "JavaScript is a compiled language."
type = "true-false"
correct_answer = false
points = 50
"#;

const EXAMPLE_SCRIPT: &str = r#"name = "example: all correct"

[[steps]]
action = "acknowledge"

[[steps]]
action = "start"

[[steps]]
action = "answer"
question = "q1"
value = "const"

[[steps]]
action = "next"

[[steps]]
action = "answer"
question = "q2"
value = false

[[steps]]
action = "submit"
"#;
