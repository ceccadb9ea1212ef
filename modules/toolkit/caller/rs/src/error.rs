use std::io;

use diffpeak_core_rs::parallelism;
use eyre::Report;
use thiserror::Error;

/// Failures visible to the caller of the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("a job is already running")]
    Busy,
    #[error("no job is running")]
    NotBusy,
    #[error("no completed calculation is available")]
    NotReady,
    #[error("the job was killed")]
    Cancelled,
    #[error("internal failure: {0}")]
    Internal(String),
}

impl Error {
    /// Map an arbitrary failure of the pipeline to the caller-visible taxonomy.
    pub fn classify(report: Report) -> Self {
        if parallelism::is_cancelled(&report) {
            return Error::Cancelled;
        }
        let report = match report.downcast::<Error>() {
            Ok(err) => return err,
            Err(report) => report,
        };

        let message = format!("{report:#}");
        if report
            .chain()
            .any(|x| x.downcast_ref::<io::Error>().is_some())
        {
            Error::Io(message)
        } else {
            Error::Internal(message)
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Configuration(_) | Error::NotReady | Error::NotBusy => ExitCode::Configuration,
            Error::Io(_) => ExitCode::Io,
            Error::Busy => ExitCode::Busy,
            Error::Cancelled => ExitCode::Killed,
            Error::Internal(_) => ExitCode::Internal,
        }
    }
}

/// Continuation code reported to the transport layer once a command or a job is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitCode {
    Success,
    Busy,
    Io,
    Killed,
    Configuration,
    Internal,
}
