use std::path::PathBuf;

use super::{JobState, Orchestrator};
use crate::config::{Config, QValueMethod};
use crate::error::{Error, ExitCode};

/// Transport-agnostic job control vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetDataMapper(Box<Config>),
    StartCalc,
    Recalc {
        weights: Option<Vec<f64>>,
        active: Option<Vec<bool>>,
        method: Option<QValueMethod>,
    },
    KillJob,
    PullDataMapper,
    SaveState(PathBuf),
    GetProgress,
}

impl Command {
    /// Commands served while a job is running.
    pub fn allowed_while_busy(&self) -> bool {
        matches!(self, Command::KillJob | Command::GetProgress)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Accepted,
    Progress(f64),
    DataMapper(Box<Config>),
    Saved(PathBuf),
    Rejected(Error),
}

impl Response {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Response::Rejected(err) => err.exit_code(),
            _ => ExitCode::Success,
        }
    }
}

impl From<Result<(), Error>> for Response {
    fn from(value: Result<(), Error>) -> Self {
        match value {
            Ok(()) => Response::Accepted,
            Err(err) => Response::Rejected(err),
        }
    }
}

impl Orchestrator {
    /// Execute a single command. Commands arriving while a job is running are rejected with
    /// [`Error::Busy`] instead of being queued, except for `KillJob` and `GetProgress`.
    pub fn dispatch(&self, command: Command) -> Response {
        if !command.allowed_while_busy() && self.state() != JobState::Idle {
            return Response::Rejected(Error::Busy);
        }

        match command {
            Command::SetDataMapper(config) => self.set_config(*config).into(),
            Command::StartCalc => self.start().into(),
            Command::Recalc {
                weights,
                active,
                method,
            } => self.recalculate(weights, active, method).into(),
            Command::KillJob => self.kill().into(),
            Command::PullDataMapper => match self.config() {
                Ok(config) => Response::DataMapper(Box::new(config)),
                Err(err) => Response::Rejected(err),
            },
            Command::SaveState(path) => match self.save_state(&path) {
                Ok(()) => Response::Saved(path),
                Err(err) => Response::Rejected(err),
            },
            Command::GetProgress => Response::Progress(self.progress()),
        }
    }
}
