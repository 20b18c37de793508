//! The `proctor history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use proctor_core::history::AttemptHistory;
use proctor_env::load_config_from;

pub fn execute(
    history: Option<PathBuf>,
    test: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let history_path = match history {
        Some(path) => path,
        None => load_config_from(config_path.as_deref())?.history,
    };
    let history = AttemptHistory::load_json(&history_path)?;

    let results: Vec<_> = match &test {
        Some(test_id) => history.for_test(test_id).collect(),
        None => history.results.iter().collect(),
    };

    if results.is_empty() {
        println!("No attempts recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Completed",
        "Test",
        "Component",
        "Attempt",
        "Score",
        "Stars",
        "Passed",
        "Ended",
    ]);

    for result in &results {
        table.add_row(vec![
            Cell::new(result.completed_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&result.test_id),
            Cell::new(&result.component_id),
            Cell::new(result.attempt_count),
            Cell::new(format!("{}%", result.score)),
            Cell::new(result.stars),
            Cell::new(if result.passed { "yes" } else { "no" }),
            Cell::new(result.termination_reason.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    println!("{} attempt(s)", results.len());
    Ok(())
}
