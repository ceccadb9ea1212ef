//! Job lifecycle: a single in-flight calculation driven by commands.

pub use command::{Command, Response};
pub use orchestrator::Orchestrator;
pub use progress::Progress;
pub use state::{JobKind, JobState};

mod command;
mod orchestrator;
mod pipeline;
mod progress;
mod state;
