//! The `proctor run` command.

use std::cell::Cell;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell as TableCell, Table};
use serde::Serialize;

use proctor_core::driver::{drive, DriveObserver, DriveReport};
use proctor_core::error::SessionError;
use proctor_core::history::{AttemptContext, AttemptHistory};
use proctor_core::model::{retake_available, TestDefinition, TestResult};
use proctor_core::parser;
use proctor_core::session::{ProctoredSession, SessionEvent, SessionPhase, Transition};
use proctor_core::timer::{format_clock, TimeUrgency};
use proctor_core::traits::CollectingHandler;
use proctor_env::{create_environment, load_config_from, parse_script};

/// Arguments for `proctor run`.
pub struct RunArgs {
    pub test: String,
    pub component: String,
    pub roadmap: String,
    pub script: PathBuf,
    pub catalog: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub tick_ms: Option<u64>,
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown format '{other}' (expected text or json)"),
        }
    }
}

/// Console progress observer.
struct ConsoleObserver {
    urgency: Cell<TimeUrgency>,
}

impl DriveObserver for ConsoleObserver {
    fn on_rejected(&self, event: &SessionEvent, error: &SessionError) {
        eprintln!("  Rejected {event:?}: {error}");
    }

    fn on_event(&self, event: &SessionEvent, transition: Transition) {
        if let (SessionEvent::Signal(signal), Transition::Warned { warning_count }) = (event, transition) {
            eprintln!("  Violation recorded ({signal:?}), warnings so far: {warning_count}");
        }
    }

    fn on_tick(&self, remaining_secs: u32, urgency: TimeUrgency) {
        if urgency != self.urgency.replace(urgency) {
            eprintln!("  {} remaining", format_clock(remaining_secs));
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    status: SessionPhase,
    result: Option<&'a TestResult>,
    retake_available: bool,
    rejected: Vec<String>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    if let Some(tick_ms) = args.tick_ms {
        anyhow::ensure!(tick_ms >= 1, "tick-ms must be at least 1");
    }

    let config = load_config_from(args.config.as_deref())?;
    let catalog_path = args.catalog.unwrap_or_else(|| config.catalog.clone());
    let history_path = args.history.unwrap_or_else(|| config.history.clone());
    let tick = args.tick_ms.map(Duration::from_millis).unwrap_or_else(|| config.tick());
    let options = config.session_options()?;

    let catalog = parser::load_catalog(&catalog_path)?;
    let mut history = AttemptHistory::load_json(&history_path)?;
    let script = parse_script(&args.script)?;

    let context = AttemptContext::from_history(&history, &args.test, &args.component, &args.roadmap);
    let prior_attempts = context.prior_attempts;

    let mut session = match ProctoredSession::open(
        &catalog,
        &args.test,
        context,
        create_environment(config.environment),
        CollectingHandler::new(),
        options,
    ) {
        Ok(session) => session,
        Err(e) if e.is_configuration_error() => {
            print_not_found(&args.test, format)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let max_attempts = session.test().max_attempts;
    anyhow::ensure!(
        prior_attempts < max_attempts,
        "no attempts left for '{}': {} of {} used",
        args.test,
        prior_attempts,
        max_attempts
    );

    if format == OutputFormat::Text {
        eprintln!(
            "proctor v{}: {} ({} questions, {} minutes, attempt {} of {})",
            env!("CARGO_PKG_VERSION"),
            session.test().title,
            session.test().questions.len(),
            session.test().time_limit_minutes,
            prior_attempts + 1,
            max_attempts
        );
    }

    let observer = ConsoleObserver {
        urgency: Cell::new(TimeUrgency::Normal),
    };
    let report = drive(&mut session, script.into_stream(tick), tick, &observer).await;

    if let Some(result) = &report.result {
        history.record(result.clone());
        history.save_json(&history_path)?;
        tracing::debug!("history saved to {}", history_path.display());
    }

    match format {
        OutputFormat::Json => print_json(session.test(), &report)?,
        OutputFormat::Text => print_text(
            session.test(),
            &report,
            session.state().time_left_seconds,
            session.state().warning_count,
        ),
    }

    Ok(())
}

fn print_not_found(test_id: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = JsonOutput {
                status: SessionPhase::Cancelled,
                result: None,
                retake_available: false,
                rejected: vec![format!("test not found: {test_id}")],
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Test Not Found");
            println!("The test '{test_id}' could not be found. Please contact support.");
        }
    }
    Ok(())
}

fn print_json(test: &TestDefinition, report: &DriveReport) -> Result<()> {
    let output = JsonOutput {
        status: report.phase,
        result: report.result.as_ref(),
        retake_available: report
            .result
            .as_ref()
            .is_some_and(|r| retake_available(test, r)),
        rejected: report
            .rejected
            .iter()
            .map(|r| r.error.clone())
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text(test: &TestDefinition, report: &DriveReport, time_left: u32, warnings: u32) {
    let Some(result) = &report.result else {
        match report.phase {
            SessionPhase::Cancelled => println!("Test cancelled."),
            phase => println!("Session ended while {phase}; no result recorded."),
        }
        return;
    };

    let headline = match (report.phase, result.passed) {
        (SessionPhase::Terminated, _) => "Test Terminated",
        (_, true) => "Test Passed",
        (_, false) => "Test Not Passed",
    };
    println!("{headline}: {}", test.title);

    let mut summary = Table::new();
    summary.set_header(vec!["Score", "Rating", "Stars", "Correct", "Attempt", "Time left", "Warnings"]);
    summary.add_row(vec![
        TableCell::new(format!("{}%", result.score)),
        TableCell::new(result.rating),
        TableCell::new(format!("{} / 2", result.stars)),
        TableCell::new(format!("{} / {}", result.correct_count(), result.answers.len())),
        TableCell::new(format!("{} of {}", result.attempt_count, test.max_attempts)),
        TableCell::new(format_clock(time_left)),
        TableCell::new(warnings),
    ]);
    println!("{summary}");

    if let Some(reason) = &result.termination_reason {
        println!("Reason: {reason}");
    }

    let mut answers = Table::new();
    answers.set_header(vec!["Question", "Answer", "Correct"]);
    for graded in &result.answers {
        answers.add_row(vec![
            TableCell::new(&graded.question_id),
            TableCell::new(if graded.answer.is_empty() {
                "-"
            } else {
                graded.answer.as_str()
            }),
            TableCell::new(if graded.correct { "yes" } else { "no" }),
        ]);
    }
    println!("{answers}");

    println!("Passing score: {}%", test.passing_score_percent);
    if retake_available(test, result) {
        println!(
            "You can retake this test ({} of {} attempts used).",
            result.attempt_count, test.max_attempts
        );
    }
    if !report.rejected.is_empty() {
        println!("{} scripted action(s) were rejected.", report.rejected.len());
    }
}
