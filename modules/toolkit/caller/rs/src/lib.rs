pub use config::{Config, ConstructionStrategy, QValueMethod};
pub use error::{Error, ExitCode};
pub use job::{Command, JobKind, JobState, Orchestrator, Response};
pub use replicate::{Counters, Dataset, Replicate, ReplicateSpec};
pub use result::CallResult;

pub mod config;
pub mod construction;
mod error;
pub mod export;
pub mod job;
pub mod peaks;
mod replicate;
mod result;
pub mod snapshot;
mod sources;
pub mod stats;
pub mod window;
