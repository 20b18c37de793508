//! Script error types.

use thiserror::Error;

/// Errors raised while turning a session script into events.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The step names an action the engine does not know.
    #[error("step {step}: unknown action '{action}'")]
    UnknownAction { step: usize, action: String },

    /// The action needs a field the step does not provide.
    #[error("step {step}: '{action}' requires a '{field}' field")]
    MissingField {
        step: usize,
        action: String,
        field: &'static str,
    },

    /// A field is present but cannot be interpreted.
    #[error("step {step}: {message}")]
    InvalidValue { step: usize, message: String },
}

impl ScriptError {
    /// One-based index of the offending step.
    pub fn step(&self) -> usize {
        match self {
            ScriptError::UnknownAction { step, .. }
            | ScriptError::MissingField { step, .. }
            | ScriptError::InvalidValue { step, .. } => *step,
        }
    }
}
