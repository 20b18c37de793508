//! Session scripts: TOML files describing what a candidate does.
//!
//! ```toml
//! name = "tab switch then submit"
//!
//! [[steps]]
//! action = "acknowledge"
//!
//! [[steps]]
//! action = "start"
//!
//! [[steps]]
//! action = "answer"
//! question = "html-1"
//! value = "<main>"
//!
//! [[steps]]
//! action = "signal"
//! signal = "tab-switch"
//!
//! [[steps]]
//! action = "wait"
//! seconds = 30
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use proctor_core::model::AnswerValue;
use proctor_core::session::SessionEvent;
use proctor_core::signal::{EnvironmentSignal, KeyChord};

use crate::error::ScriptError;

#[derive(Debug, Deserialize)]
struct TomlScript {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    steps: Vec<TomlStep>,
}

#[derive(Debug, Deserialize)]
struct TomlStep {
    action: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    value: Option<AnswerValue>,
    #[serde(default)]
    signal: Option<String>,
    #[serde(default)]
    chord: Option<String>,
    #[serde(default)]
    seconds: Option<u32>,
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Event(SessionEvent),
    /// Let this many engine seconds pass.
    Wait(u32),
}

/// A parsed script.
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    pub name: Option<String>,
    pub steps: Vec<ScriptStep>,
}

impl SessionScript {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { name: None, steps }
    }

    /// The events in order, without the waits.
    pub fn events(&self) -> impl Iterator<Item = &SessionEvent> {
        self.steps.iter().filter_map(|step| match step {
            ScriptStep::Event(event) => Some(event),
            ScriptStep::Wait(_) => None,
        })
    }

    /// Total scripted waiting, in engine seconds.
    pub fn wait_secs(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                ScriptStep::Wait(secs) => u64::from(*secs),
                ScriptStep::Event(_) => 0,
            })
            .sum()
    }

    /// Turn the script into an event stream. Each `wait` step sleeps for
    /// `seconds * tick` before the next event is yielded.
    pub fn into_stream(self, tick: Duration) -> BoxStream<'static, SessionEvent> {
        stream::iter(self.steps)
            .filter_map(move |step| async move {
                match step {
                    ScriptStep::Event(event) => Some(event),
                    ScriptStep::Wait(secs) => {
                        tokio::time::sleep(tick.saturating_mul(secs)).await;
                        None
                    }
                }
            })
            .boxed()
    }
}

/// Parse a script file.
pub fn parse_script(path: &Path) -> Result<SessionScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {}", path.display()))?;
    parse_script_str(&content, path)
}

/// Parse script TOML. `source_path` is only used in error messages.
pub fn parse_script_str(content: &str, source_path: &Path) -> Result<SessionScript> {
    let raw: TomlScript = toml::from_str(content)
        .with_context(|| format!("failed to parse script: {}", source_path.display()))?;

    let steps = raw
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| convert_step(i + 1, step))
        .collect::<Result<Vec<_>, ScriptError>>()
        .with_context(|| format!("invalid script: {}", source_path.display()))?;

    Ok(SessionScript {
        name: raw.name,
        steps,
    })
}

fn convert_step(step: usize, raw: TomlStep) -> Result<ScriptStep, ScriptError> {
    let action = raw.action.trim().to_lowercase();
    let missing = |field: &'static str| ScriptError::MissingField {
        step,
        action: action.clone(),
        field,
    };

    let event = match action.as_str() {
        "acknowledge" | "acknowledge-rules" => SessionEvent::AcknowledgeRules,
        "start" => SessionEvent::Start,
        "cancel" => SessionEvent::Cancel,
        "next" => SessionEvent::NextQuestion,
        "previous" | "prev" => SessionEvent::PreviousQuestion,
        "submit" => SessionEvent::Submit,
        "force-end" | "end" => SessionEvent::ForceEnd,
        "answer" => {
            let question_id = raw.question.ok_or_else(|| missing("question"))?;
            let value = raw.value.ok_or_else(|| missing("value"))?;
            SessionEvent::SelectAnswer { question_id, value }
        }
        "signal" => {
            let name = raw.signal.ok_or_else(|| missing("signal"))?;
            let signal = name
                .parse::<EnvironmentSignal>()
                .map_err(|message| ScriptError::InvalidValue { step, message })?;
            SessionEvent::Signal(signal)
        }
        "key" => {
            let chord = raw
                .chord
                .ok_or_else(|| missing("chord"))?
                .parse::<KeyChord>()
                .map_err(|message| ScriptError::InvalidValue { step, message })?;
            SessionEvent::Signal(EnvironmentSignal::KeyPressed { chord })
        }
        "wait" => {
            let seconds = raw.seconds.ok_or_else(|| missing("seconds"))?;
            return Ok(ScriptStep::Wait(seconds));
        }
        _ => {
            return Err(ScriptError::UnknownAction {
                step,
                action: raw.action,
            })
        }
    };
    Ok(ScriptStep::Event(event))
}
