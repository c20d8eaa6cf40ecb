//! The Automation Hook (component I): a scripted driver of the Mode
//! Arbiter and Command Router, used for headless regression tests and the
//! binary's `--script` mode (§4.8).

mod error;
mod harness;
mod step;

pub use error::AutomationError;
pub use harness::{Harness, Report, StepFailure};
pub use step::{Step, parse_script};
