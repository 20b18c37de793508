//! TOML test catalog parser.
//!
//! Loads test definitions from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerValue, Question, QuestionKind, TestCatalog, TestDefinition};

/// Intermediate TOML structure for parsing catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    tests: Vec<TomlTest>,
}

#[derive(Debug, Deserialize)]
struct TomlTest {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_time_limit")]
    time_limit_minutes: u32,
    #[serde(default = "default_passing_score")]
    passing_score_percent: u32,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

fn default_time_limit() -> u32 {
    15
}

fn default_passing_score() -> u32 {
    80
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default)]
    question: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: AnswerValue,
    #[serde(default = "default_points")]
    points: u32,
}

fn default_points() -> u32 {
    20
}

/// Parse a single TOML file into its test definitions.
pub fn parse_catalog(path: &Path) -> Result<Vec<TestDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into test definitions (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Vec<TestDefinition>> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    parsed
        .tests
        .into_iter()
        .map(|t| {
            let questions = t
                .questions
                .into_iter()
                .map(|q| {
                    let kind: QuestionKind = q
                        .kind
                        .parse()
                        .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;
                    Ok(Question {
                        id: q.id,
                        question: q.question,
                        kind,
                        options: q.options,
                        correct_answer: q.correct_answer.to_string(),
                        points: q.points,
                    })
                })
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("invalid question in test '{}'", t.id))?;

            Ok(TestDefinition {
                id: t.id,
                title: t.title,
                description: t.description,
                questions,
                time_limit_minutes: t.time_limit_minutes,
                passing_score_percent: t.passing_score_percent,
                max_attempts: t.max_attempts,
            })
        })
        .collect()
}

/// Load a catalog from a single file or, recursively, from every `.toml`
/// file under a directory.
pub fn load_catalog(path: &Path) -> Result<TestCatalog> {
    let tests = if path.is_dir() {
        load_catalog_directory(path)?
    } else {
        parse_catalog(path)?
    };
    let mut catalog = TestCatalog::new();
    catalog.extend(tests);
    Ok(catalog)
}

/// Recursively load all `.toml` catalog files from a directory.
pub fn load_catalog_directory(dir: &Path) -> Result<Vec<TestDefinition>> {
    let mut tests = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            tests.extend(load_catalog_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_catalog(&path) {
                Ok(parsed) => tests.extend(parsed),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(tests)
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The test ID.
    pub test_id: String,
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate test definitions for common authoring mistakes.
pub fn validate_tests(tests: &[TestDefinition]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut seen_tests = HashSet::new();

    for test in tests {
        let mut warn = |question_id: Option<&str>, message: String| {
            warnings.push(ValidationWarning {
                test_id: test.id.clone(),
                question_id: question_id.map(str::to_string),
                message,
            });
        };

        if !seen_tests.insert(test.id.as_str()) {
            warn(None, format!("duplicate test ID: {}", test.id));
        }
        if test.questions.is_empty() {
            warn(None, "test has no questions".into());
        }
        if test.time_limit_minutes == 0 {
            warn(None, "time limit is zero; the timer expires immediately".into());
        }
        if test.passing_score_percent > 100 {
            warn(
                None,
                format!(
                    "passing score {}% can never be reached",
                    test.passing_score_percent
                ),
            );
        }
        if test.max_attempts == 0 {
            warn(None, "max_attempts is zero; the test can never be taken".into());
        }

        let mut seen_questions = HashSet::new();
        for q in &test.questions {
            if !seen_questions.insert(q.id.as_str()) {
                warn(Some(&q.id), format!("duplicate question ID: {}", q.id));
            }
            if q.points == 0 {
                warn(Some(&q.id), "question is worth zero points".into());
            }
            match q.kind {
                QuestionKind::MultipleChoice => {
                    if q.options.is_empty() {
                        warn(Some(&q.id), "multiple-choice question has no options".into());
                    } else if !q.options.contains(&q.correct_answer) {
                        warn(
                            Some(&q.id),
                            format!(
                                "correct answer '{}' is not one of the options",
                                q.correct_answer
                            ),
                        );
                    }
                }
                QuestionKind::TrueFalse => {
                    if q.correct_answer != "true" && q.correct_answer != "false" {
                        warn(
                            Some(&q.id),
                            format!(
                                "true-false answer must be 'true' or 'false', got '{}'",
                                q.correct_answer
                            ),
                        );
                    }
                }
            }
        }
    }

    warnings
}

/// Validate every test in a catalog.
pub fn validate_catalog(catalog: &TestCatalog) -> Vec<ValidationWarning> {
    let tests: Vec<TestDefinition> = catalog.iter().cloned().collect();
    validate_tests(&tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[[tests]]
id = "html-css-basics"
title = "HTML & CSS Fundamentals Test"
description = "Test your knowledge of HTML structure and CSS styling"
time_limit_minutes = 15
passing_score_percent = 80
max_attempts = 3

[[tests.questions]]
id = "html-1"
question = "Which HTML element is used to define the main content of a document?"
type = "multiple-choice"
options = ["<header>", "<main>", "<section>", "<article>"]
correct_answer = "<main>"
points = 20

[[tests.questions]]
id = "html-2"
question = "CSS stands for Cascading Style Sheets."
type = "true-false"
correct_answer = true
points = 20
"#;

    #[test]
    fn parse_valid_toml() {
        let tests = parse_catalog_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(tests.len(), 1);
        let test = &tests[0];
        assert_eq!(test.id, "html-css-basics");
        assert_eq!(test.questions.len(), 2);
        assert_eq!(test.questions[0].kind, QuestionKind::MultipleChoice);
        assert_eq!(test.questions[1].correct_answer, "true");
        assert!(validate_tests(&tests).is_empty());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[[tests]]
id = "minimal"
title = "Minimal"

[[tests.questions]]
id = "q1"
type = "true-false"
correct_answer = "false"
"#;
        let tests = parse_catalog_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(tests[0].time_limit_minutes, 15);
        assert_eq!(tests[0].passing_score_percent, 80);
        assert_eq!(tests[0].max_attempts, 3);
        assert_eq!(tests[0].questions[0].points, 20);
    }

    #[test]
    fn parse_unknown_question_type() {
        let toml = r#"
[[tests]]
id = "bad"
title = "Bad"

[[tests.questions]]
id = "q1"
type = "essay"
correct_answer = "anything"
"#;
        let err = parse_catalog_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("unknown question type"));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_catalog_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_authoring_mistakes() {
        let toml = r#"
[[tests]]
id = "dupes"
title = "Dupes"
passing_score_percent = 120

[[tests.questions]]
id = "same"
type = "multiple-choice"
options = ["a", "b"]
correct_answer = "c"

[[tests.questions]]
id = "same"
type = "true-false"
correct_answer = "yes"
points = 0

[[tests]]
id = "dupes"
title = "Empty"
"#;
        let tests = parse_catalog_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_tests(&tests);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("duplicate question ID"));
        assert!(has("duplicate test ID"));
        assert!(has("not one of the options"));
        assert!(has("must be 'true' or 'false'"));
        assert!(has("zero points"));
        assert!(has("can never be reached"));
        assert!(has("no questions"));
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frontend.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not [valid").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("html-css-basics").is_some());
    }
}
