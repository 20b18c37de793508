//! proctor-core: Session state machine, proctoring policy, timer and scoring.
//!
//! This crate defines the data model, the environment and handler traits,
//! and the session controller that the rest of proctor builds on.

pub mod driver;
pub mod emitter;
pub mod error;
pub mod history;
pub mod model;
pub mod monitor;
pub mod parser;
pub mod scorer;
pub mod session;
pub mod signal;
pub mod timer;
pub mod traits;
