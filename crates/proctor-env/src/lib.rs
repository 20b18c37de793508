//! proctor-env: Proctoring environments, session scripts and configuration.
//!
//! Implements the `ProctoringEnvironment` trait for terminal and headless
//! sessions, parses candidate scripts into event streams, and loads
//! `proctor.toml`.

pub mod config;
pub mod console;
pub mod error;
pub mod recording;
pub mod script;

pub use config::{
    create_environment, load_config, load_config_from, EnvironmentKind, PolicyConfig,
    ProctorConfig,
};
pub use console::ConsoleEnvironment;
pub use error::ScriptError;
pub use recording::RecordingEnvironment;
pub use script::{parse_script, parse_script_str, ScriptStep, SessionScript};
