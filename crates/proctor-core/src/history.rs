//! Attempt history with JSON persistence.
//!
//! The engine only reads the history to stamp `attempt_count`; saving it is
//! the caller's job.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::TestResult;

/// Prior results, in completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptHistory {
    #[serde(default)]
    pub results: Vec<TestResult>,
}

impl AttemptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded attempts for a `(test_id, component_id)` pair.
    pub fn prior_attempts(&self, test_id: &str, component_id: &str) -> u32 {
        let count = self
            .results
            .iter()
            .filter(|r| r.test_id == test_id && r.component_id == component_id)
            .count();
        saturating_count(count)
    }

    /// All recorded attempts for a test, across components.
    pub fn for_test<'a>(&'a self, test_id: &'a str) -> impl Iterator<Item = &'a TestResult> + 'a {
        self.results.iter().filter(move |r| r.test_id == test_id)
    }

    /// Append a finished attempt.
    pub fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Save the history as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize history")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write history to {}", path.display()))?;
        Ok(())
    }

    /// Load a history from a JSON file. A missing file is an empty history.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read history from {}", path.display()))?;
        let history: AttemptHistory =
            serde_json::from_str(&content).context("failed to parse history JSON")?;
        Ok(history)
    }
}

/// Who is taking the test and how many times they already have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptContext {
    pub component_id: String,
    pub roadmap_id: String,
    pub prior_attempts: u32,
}

impl AttemptContext {
    pub fn new(component_id: impl Into<String>, roadmap_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            roadmap_id: roadmap_id.into(),
            prior_attempts: 0,
        }
    }

    /// Build a context whose prior attempt count comes from `history`.
    pub fn from_history(
        history: &AttemptHistory,
        test_id: &str,
        component_id: impl Into<String>,
        roadmap_id: impl Into<String>,
    ) -> Self {
        let component_id = component_id.into();
        let prior_attempts = history.prior_attempts(test_id, &component_id);
        Self {
            component_id,
            roadmap_id: roadmap_id.into(),
            prior_attempts,
        }
    }

    pub fn with_prior_attempts(mut self, prior_attempts: u32) -> Self {
        self.prior_attempts = prior_attempts;
        self
    }
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(test_id: &str, component_id: &str, score: u32) -> TestResult {
        TestResult {
            test_id: test_id.into(),
            component_id: component_id.into(),
            roadmap_id: "frontend-react".into(),
            score,
            rating: score * 2,
            stars: score * 2 / 100,
            passed: score >= 80,
            attempt_count: 1,
            completed_at: Utc::now(),
            answers: vec![],
            termination_reason: None,
        }
    }

    #[test]
    fn counts_attempts_per_test_and_component() {
        let mut history = AttemptHistory::new();
        history.record(result("html", "comp-1", 40));
        history.record(result("html", "comp-1", 60));
        history.record(result("html", "comp-2", 60));
        history.record(result("js", "comp-1", 60));

        assert_eq!(history.prior_attempts("html", "comp-1"), 2);
        assert_eq!(history.prior_attempts("html", "comp-3"), 0);
        assert_eq!(history.for_test("html").count(), 3);

        let ctx = AttemptContext::from_history(&history, "html", "comp-1", "frontend-react");
        assert_eq!(ctx.prior_attempts, 2);
    }

    #[test]
    fn attempt_counts_saturate() {
        assert_eq!(saturating_count(3), 3);
        assert_eq!(saturating_count(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(saturating_count(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn json_roundtrip() {
        let mut history = AttemptHistory::new();
        history.record(result("html", "comp-1", 100));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        history.save_json(&path).unwrap();
        let loaded = AttemptHistory::load_json(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.results[0].score, 100);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AttemptHistory::load_json(&dir.path().join("none.json")).unwrap();
        assert!(loaded.is_empty());
    }
}
