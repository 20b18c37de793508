//! The `proctor list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use proctor_core::parser;
use proctor_env::load_config_from;

pub fn execute(catalog: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let catalog_path = match catalog {
        Some(path) => path,
        None => load_config_from(config_path.as_deref())?.catalog,
    };
    let catalog = parser::load_catalog(&catalog_path)?;

    if catalog.is_empty() {
        println!("No tests found in {}", catalog_path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID",
        "Title",
        "Questions",
        "Time limit",
        "Passing",
        "Max attempts",
    ]);

    for test in catalog.iter() {
        table.add_row(vec![
            Cell::new(&test.id),
            Cell::new(&test.title),
            Cell::new(test.questions.len()),
            Cell::new(format!("{} min", test.time_limit_minutes)),
            Cell::new(format!("{}%", test.passing_score_percent)),
            Cell::new(test.max_attempts),
        ]);
    }

    println!("{table}");
    println!("{} test(s)", catalog.len());
    Ok(())
}
