//! The `proctor validate` command.

use std::path::PathBuf;

use anyhow::Result;

use proctor_core::parser;

pub fn execute(catalog_path: PathBuf) -> Result<()> {
    let tests = if catalog_path.is_dir() {
        parser::load_catalog_directory(&catalog_path)?
    } else {
        parser::parse_catalog(&catalog_path)?
    };

    println!("Catalog: {} ({} tests)", catalog_path.display(), tests.len());
    for test in &tests {
        println!(
            "  {} ({} questions, {} points)",
            test.title,
            test.questions.len(),
            test.total_points()
        );
    }

    let warnings = parser::validate_tests(&tests);
    for w in &warnings {
        let location = match &w.question_id {
            Some(question_id) => format!("{}/{}", w.test_id, question_id),
            None => w.test_id.clone(),
        };
        println!("  [{location}] WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All tests valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
