use std::sync::atomic::{AtomicU8, Ordering};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Start,
    Recalc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    #[default]
    Idle,
    Busy(JobKind),
}

const IDLE: u8 = 0;
const START: u8 = 1;
const RECALC: u8 = 2;

/// Job state with compare-and-swap transitions. At most one job can hold the Busy state.
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn get(&self) -> JobState {
        match self.0.load(Ordering::Acquire) {
            START => JobState::Busy(JobKind::Start),
            RECALC => JobState::Busy(JobKind::Recalc),
            _ => JobState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.get() == JobState::Idle
    }

    /// Idle -> Busy(kind), rejected with [`Error::Busy`] if a job is already running.
    pub fn begin(&self, kind: JobKind) -> Result<(), Error> {
        let code = match kind {
            JobKind::Start => START,
            JobKind::Recalc => RECALC,
        };
        self.0
            .compare_exchange(IDLE, code, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| Error::Busy)
    }

    pub fn finish(&self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let state = StateCell::default();
        assert_eq!(state.get(), JobState::Idle);

        assert_eq!(state.begin(JobKind::Start), Ok(()));
        assert_eq!(state.get(), JobState::Busy(JobKind::Start));
        assert_eq!(state.begin(JobKind::Recalc), Err(Error::Busy));
        assert_eq!(state.begin(JobKind::Start), Err(Error::Busy));

        state.finish();
        assert!(state.is_idle());
        assert_eq!(state.begin(JobKind::Recalc), Ok(()));
        assert_eq!(state.get(), JobState::Busy(JobKind::Recalc));
    }
}
