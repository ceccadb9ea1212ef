use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use diffpeak_core_rs::parallelism::{self, CancelHandle, ExecutionContext, LiveWorkers};
use diffpeak_core_rs::source::Opener;
use eyre::Result;
use log::{error, info, warn};

use super::pipeline::{self, Cache};
use super::state::StateCell;
use super::{JobKind, JobState, Progress};
use crate::config::{Config, QValueMethod};
use crate::error::{Error, ExitCode};
use crate::result::CallResult;
use crate::snapshot::Snapshot;
use crate::window::WindowList;

type Outcome = Result<Arc<CallResult>, Error>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    state: StateCell,
    progress: Progress,
    cancel: Mutex<CancelHandle>,
    live: LiveWorkers,
    config: Mutex<Config>,
    cache: Mutex<Option<Cache>>,
    outcome: Mutex<Option<Outcome>>,
    // Signalled under the `outcome` lock whenever the state returns to Idle
    done: Condvar,
}

impl Shared {
    /// Busy -> Idle, waking up everyone blocked in [`Orchestrator::wait`].
    fn release(&self) {
        let _outcome = lock(&self.outcome);
        self.state.finish();
        self.done.notify_all();
    }
}

/// Releases the Busy state when the job thread exits, including by a panic.
struct Finish(Arc<Shared>);

impl Drop for Finish {
    fn drop(&mut self) {
        let mut outcome = lock(&self.0.outcome);
        if outcome.is_none() {
            error!("Job thread panicked");
            *outcome = Some(Err(Error::Internal("job thread panicked".to_string())));
        }
        self.0.state.finish();
        self.0.done.notify_all();
    }
}

/// Owner of the single in-flight calculation.
///
/// `start` and `recalculate` return immediately and run the job on a dedicated thread; the
/// outcome is observed through [`Orchestrator::progress`], [`Orchestrator::result`] or
/// [`Orchestrator::wait`]. Every operation except `kill` and `progress` is rejected with
/// [`Error::Busy`] while a job is running.
pub struct Orchestrator {
    opener: Arc<dyn Opener>,
    shared: Arc<Shared>,
    // Every Idle -> Busy transition, kill and idle-only mutation runs under this lock, so a Busy
    // state always belongs to the job stored here.
    control: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(opener: Arc<dyn Opener>) -> Self {
        Self {
            opener,
            shared: Arc::new(Shared {
                state: StateCell::default(),
                progress: Progress::new(),
                cancel: Mutex::new(CancelHandle::new()),
                live: LiveWorkers::new(),
                config: Mutex::new(Config::new()),
                cache: Mutex::new(None),
                outcome: Mutex::new(None),
                done: Condvar::new(),
            }),
            control: Mutex::new(None),
        }
    }

    pub fn state(&self) -> JobState {
        self.shared.state.get()
    }

    pub fn progress(&self) -> f64 {
        self.shared.progress.get()
    }

    /// Worker threads of the current job that are still alive.
    pub fn live_workers(&self) -> usize {
        self.shared.live.get()
    }

    fn ensure_idle(&self) -> Result<(), Error> {
        match self.shared.state.is_idle() {
            true => Ok(()),
            false => Err(Error::Busy),
        }
    }

    pub fn set_config(&self, config: Config) -> Result<(), Error> {
        let _control = lock(&self.control);
        self.ensure_idle()?;
        *lock(&self.shared.config) = config;
        Ok(())
    }

    pub fn config(&self) -> Result<Config, Error> {
        let _control = lock(&self.control);
        self.ensure_idle()?;
        Ok(lock(&self.shared.config).clone())
    }

    /// Run construction, statistics and peak assembly from scratch.
    pub fn start(&self) -> Result<(), Error> {
        let mut control = lock(&self.control);
        self.shared.state.begin(JobKind::Start)?;
        let config = lock(&self.shared.config).clone();
        if let Err(err) = config.validate() {
            self.shared.release();
            return Err(err);
        }

        // A new start never reuses previous results
        *lock(&self.shared.cache) = None;
        self.spawn(&mut control, config.clone(), move |ctx, opener, progress| {
            pipeline::start(ctx, opener, &config, progress)
        })
    }

    /// Re-run corrections, combination and peak assembly over the cached windows. `None` keeps
    /// the current value of the parameter.
    pub fn recalculate(
        &self,
        weights: Option<Vec<f64>>,
        active: Option<Vec<bool>>,
        method: Option<QValueMethod>,
    ) -> Result<(), Error> {
        let mut control = lock(&self.control);
        self.shared.state.begin(JobKind::Recalc)?;
        let prepared = self.prepare_recalc(weights, active, method);
        let mut cache = match prepared {
            Ok(cache) => cache,
            Err(err) => {
                self.shared.release();
                return Err(err);
            }
        };
        *lock(&self.shared.config) = cache.config.clone();

        let (config, shared) = (cache.config.clone(), self.shared.clone());
        self.spawn(&mut control, config, move |ctx, opener, progress| {
            match pipeline::recalculate(ctx, opener, &mut cache, progress) {
                Ok(result) => Ok((cache, result)),
                Err(err) => {
                    // Raw p-values are untouched by a failed recalculation, keep them for a retry
                    if !parallelism::is_cancelled(&err) {
                        *lock(&shared.cache) = Some(cache);
                    }
                    Err(err)
                }
            }
        })
    }

    fn prepare_recalc(
        &self,
        weights: Option<Vec<f64>>,
        active: Option<Vec<bool>>,
        method: Option<QValueMethod>,
    ) -> Result<Cache, Error> {
        let mut slot = lock(&self.shared.cache);
        let mut cache = slot.take().ok_or(Error::NotReady)?;

        let updated = Self::apply(&mut cache.config, weights, active, method);
        match updated {
            Ok(()) => Ok(cache),
            Err(err) => {
                *slot = Some(cache);
                Err(err)
            }
        }
    }

    fn apply(
        config: &mut Config,
        weights: Option<Vec<f64>>,
        active: Option<Vec<bool>>,
        method: Option<QValueMethod>,
    ) -> Result<(), Error> {
        let total = config.replicates().len();
        let mut updated = config.clone();
        let invalid = |what: &str, len: usize| {
            Error::Configuration(format!("expected {total} {what}, got {len}"))
        };

        if let Some(weights) = weights {
            if weights.len() != total {
                return Err(invalid("weights", weights.len()));
            }
            for (ind, weight) in weights.into_iter().enumerate() {
                updated
                    .replicate_mut(ind)
                    .and_then(|x| x.set_weight(Some(weight)).map(|_| ()))
                    .map_err(|err| Error::Configuration(format!("{err:#}")))?;
            }
        }
        if let Some(active) = active {
            if active.len() != total {
                return Err(invalid("activity flags", active.len()));
            }
            for (ind, flag) in active.into_iter().enumerate() {
                updated
                    .replicate_mut(ind)
                    .map_err(|err| Error::Configuration(format!("{err:#}")))?
                    .set_active(flag);
            }
        }
        if let Some(method) = method {
            updated.set_qvalue_method(method);
        }

        *config = updated;
        Ok(())
    }

    /// Must be called with the control lock held and the Busy state taken.
    fn spawn<F>(
        &self,
        control: &mut Option<JoinHandle<()>>,
        config: Config,
        job: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&ExecutionContext, &dyn Opener, &Progress) -> Result<(Cache, CallResult)>
            + Send
            + 'static,
    {
        if let Some(previous) = control.take() {
            // The previous job already released the Busy state, joining is immediate
            let _ = previous.join();
        }

        let cancel = CancelHandle::new();
        *lock(&self.shared.cancel) = cancel.clone();
        *lock(&self.shared.outcome) = None;
        self.shared.progress.reset();

        let (shared, opener) = (self.shared.clone(), self.opener.clone());
        let spawned = thread::Builder::new()
            .name("diffpeak-job".to_string())
            .spawn(move || {
                let _finish = Finish(shared.clone());
                let killed = cancel.clone();
                let run = || -> Result<(Cache, CallResult)> {
                    let ctx =
                        ExecutionContext::with_handles(*config.threads(), cancel, shared.live.clone())?;
                    let result = job(&ctx, opener.as_ref(), &shared.progress);
                    ctx.shutdown();
                    result
                };

                let outcome = match run() {
                    // Results that made it past a kill are discarded
                    Ok(_) if killed.is_cancelled() => {
                        info!("Job was cancelled");
                        Err(Error::Cancelled)
                    }
                    Ok((cache, result)) => {
                        *lock(&shared.cache) = Some(cache);
                        Ok(Arc::new(result))
                    }
                    Err(report) => {
                        let err = Error::classify(report);
                        match err {
                            Error::Cancelled => info!("Job was cancelled"),
                            _ => error!("Job failed: {err}"),
                        }
                        Err(err)
                    }
                };
                *lock(&shared.outcome) = Some(outcome);
            });

        match spawned {
            Ok(job) => {
                *control = Some(job);
                Ok(())
            }
            Err(err) => {
                self.shared.release();
                Err(Error::Internal(format!("failed to spawn the job thread: {err}")))
            }
        }
    }

    /// Cancel the running job, wait for its workers to stop and discard all of its results.
    pub fn kill(&self) -> Result<(), Error> {
        let mut control = lock(&self.control);
        if self.shared.state.is_idle() {
            return Err(Error::NotBusy);
        }
        // The cancel handle was installed together with the Busy state
        lock(&self.shared.cancel).cancel();
        if let Some(job) = control.take() {
            if job.join().is_err() {
                warn!("Job thread panicked while being killed");
            }
        }

        *lock(&self.shared.cache) = None;
        {
            let mut outcome = lock(&self.shared.outcome);
            *outcome = Some(Err(Error::Cancelled));
            self.shared.state.finish();
            self.shared.done.notify_all();
        }
        info!("Job was killed");
        Ok(())
    }

    /// Block until the current job (if any) is over and return its outcome.
    pub fn wait(&self) -> Option<Outcome> {
        let mut outcome = lock(&self.shared.outcome);
        while !self.shared.state.is_idle() {
            outcome = self
                .shared
                .done
                .wait(outcome)
                .unwrap_or_else(PoisonError::into_inner);
        }
        outcome.clone()
    }

    /// Outcome of the last finished job, `None` while running or if nothing was run yet.
    pub fn result(&self) -> Option<Outcome> {
        if !self.shared.state.is_idle() {
            return None;
        }
        lock(&self.shared.outcome).clone()
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.result() {
            Some(Err(err)) => err.exit_code(),
            _ => ExitCode::Success,
        }
    }

    /// Read access to the cached window list of the last completed job.
    pub fn with_windows<R>(&self, func: impl FnOnce(&WindowList) -> R) -> Result<R, Error> {
        self.ensure_idle()?;
        let cache = lock(&self.shared.cache);
        let cache = cache.as_ref().ok_or(Error::NotReady)?;
        Ok(func(&cache.windows))
    }

    /// Persist the cached state so that `recalculate` can resume in another process.
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let _control = lock(&self.control);
        self.ensure_idle()?;
        let cache = lock(&self.shared.cache);
        let cache = cache.as_ref().ok_or(Error::NotReady)?;

        Snapshot::new(
            cache.config.clone(),
            cache.replicates.clone(),
            cache.windows.clone(),
        )
        .and_then(|snapshot| snapshot.write(path.as_ref()))
        .map_err(Error::classify)?;
        info!("State saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_state(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let _control = lock(&self.control);
        self.ensure_idle()?;
        let (config, replicates, windows) = Snapshot::read(path.as_ref())
            .map_err(Error::classify)?
            .dissolve();

        *lock(&self.shared.config) = config.clone();
        *lock(&self.shared.cache) = Some(Cache {
            config,
            windows,
            replicates,
        });
        *lock(&self.shared.outcome) = None;
        info!("State loaded from {}", path.as_ref().display());
        Ok(())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.shared.state.is_idle() {
            lock(&self.shared.cancel).cancel();
        }
        if let Some(job) = lock(&self.control).take() {
            let _ = job.join();
        }
    }
}
