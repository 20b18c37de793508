//! Core data model types for proctor.
//!
//! Test definitions and questions are immutable content owned by the
//! catalog; answer sets are mutated only by the session controller; a
//! `TestResult` is produced once per attempt and handed to the caller.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "multiple-choice"),
            QuestionKind::TrueFalse => write!(f, "true-false"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple-choice" | "multiple_choice" | "mc" => Ok(QuestionKind::MultipleChoice),
            "true-false" | "true_false" | "tf" => Ok(QuestionKind::TrueFalse),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A single scored question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the test.
    pub id: String,
    /// The question text shown to the candidate.
    #[serde(default)]
    pub question: String,
    /// Question kind.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Choices for multiple-choice questions.
    #[serde(default)]
    pub options: Vec<String>,
    /// The expected answer, compared by exact string match.
    pub correct_answer: String,
    /// Points awarded for a correct answer.
    pub points: u32,
}

/// An immutable test definition from the content source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ordered questions.
    #[serde(default)]
    pub questions: Vec<Question>,
    pub time_limit_minutes: u32,
    pub passing_score_percent: u32,
    pub max_attempts: u32,
}

impl TestDefinition {
    /// The countdown length in seconds.
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    /// Look up a question by id.
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Sum of all question points.
    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points)).sum()
    }
}

/// A submitted answer. Choice questions yield text, true/false widgets may
/// yield a boolean; both are graded by their string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Text(String),
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Bool(b) => write!(f, "{b}"),
            AnswerValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        AnswerValue::Text(s)
    }
}

impl From<bool> for AnswerValue {
    fn from(b: bool) -> Self {
        AnswerValue::Bool(b)
    }
}

/// Answers keyed by question id. A later answer for the same question
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(HashMap<String, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, overwriting any previous one.
    pub fn insert(&mut self, question_id: impl Into<String>, value: AnswerValue) {
        self.0.insert(question_id.into(), value);
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.0.get(question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<AnswerValue>> FromIterator<(K, V)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One graded question in a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: String,
    /// String form of the submitted answer; empty when unanswered.
    pub answer: String,
    pub correct: bool,
}

/// The immutable outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: String,
    pub component_id: String,
    pub roadmap_id: String,
    /// Percentage score, 0 to 100.
    pub score: u32,
    /// `score * 2`.
    pub rating: u32,
    /// `rating / 100`, at most 2.
    pub stars: u32,
    pub passed: bool,
    /// Prior attempts for the same test and component, plus one.
    pub attempt_count: u32,
    pub completed_at: DateTime<Utc>,
    /// Graded answers in question order.
    pub answers: Vec<GradedAnswer>,
    /// Set when the attempt ended by force-end or by a proctoring violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
}

impl TestResult {
    /// Number of questions answered correctly.
    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.correct).count()
    }

    /// Whether the attempt ended early (force-end or violation).
    pub fn was_terminated(&self) -> bool {
        self.termination_reason.is_some()
    }
}

/// Whether the caller should offer another attempt after `result`.
pub fn retake_available(test: &TestDefinition, result: &TestResult) -> bool {
    !result.passed && result.attempt_count < test.max_attempts
}

/// A read-only mapping from test id to definition.
#[derive(Debug, Clone, Default)]
pub struct TestCatalog {
    tests: BTreeMap<String, Arc<TestDefinition>>,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a test, returning the definition it replaced if the id was taken.
    pub fn insert(&mut self, test: TestDefinition) -> Option<Arc<TestDefinition>> {
        self.tests.insert(test.id.clone(), Arc::new(test))
    }

    pub fn get(&self, test_id: &str) -> Option<Arc<TestDefinition>> {
        self.tests.get(test_id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestDefinition> {
        self.tests.values().map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl Extend<TestDefinition> for TestCatalog {
    fn extend<I: IntoIterator<Item = TestDefinition>>(&mut self, iter: I) {
        for test in iter {
            self.insert(test);
        }
    }
}
