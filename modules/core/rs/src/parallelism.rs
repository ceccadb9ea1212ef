use std::cmp::Ordering;
use std::ops::Range;
use std::sync::atomic::{self, AtomicBool, AtomicUsize};
use std::sync::{Arc, Mutex};
use std::thread::available_parallelism;

use eyre::{ensure, eyre, Report, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

fn _normalize(requested: isize, max: isize) -> usize {
    match requested.cmp(&0) {
        Ordering::Less => (max + requested + 1).max(1) as usize,
        Ordering::Equal => 1,
        Ordering::Greater => requested.min(max) as usize,
    }
}

/// Number of threads to use given the requested value: positive values are capped by the number
/// of available cores, negative values are subtracted from it (-1 == all cores).
pub fn available(requested: isize) -> Result<usize> {
    let max = available_parallelism()?.get() as isize;
    Ok(_normalize(requested, max))
}

/// Marker error returned by every execution that observed a cancellation request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("execution was cancelled")]
pub struct Cancelled;

/// Returns true if the report was caused by a cancellation request.
pub fn is_cancelled(report: &Report) -> bool {
    report.downcast_ref::<Cancelled>().is_some()
}

#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, atomic::Ordering::SeqCst);
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(atomic::Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn check(&self) -> Result<()> {
        match self.is_cancelled() {
            true => Err(Cancelled.into()),
            false => Ok(()),
        }
    }
}

/// Number of pool threads that are currently alive. Shared between all contexts built with it.
#[derive(Clone, Debug, Default)]
pub struct LiveWorkers {
    count: Arc<AtomicUsize>,
}

impl LiveWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.count.load(atomic::Ordering::SeqCst)
    }
}

/// Fixed-size pool of long-lived workers owned by a single job.
///
/// Every `execute*` call splits the work into one contiguous index range per worker and blocks
/// until all ranges are processed. Degenerate calls (no work, a single item, a single worker) run
/// synchronously on the calling thread. Cancellation is cooperative: the flag is checked before
/// each range and between items, and a cancelled call returns [`Cancelled`].
#[derive(Debug)]
pub struct ExecutionContext {
    pool: Option<ThreadPool>,
    workers: usize,
    cancel: CancelHandle,
    live: LiveWorkers,
}

impl ExecutionContext {
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_handles(workers, CancelHandle::new(), LiveWorkers::new())
    }

    pub fn with_handles(workers: usize, cancel: CancelHandle, live: LiveWorkers) -> Result<Self> {
        ensure!(workers > 0, "Execution context requires at least one worker");

        let pool = match workers {
            1 => None,
            _ => {
                let (started, exited) = (live.clone(), live.clone());
                let pool = ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|ind| format!("diffpeak-worker-{ind}"))
                    .start_handler(move |_| {
                        started.count.fetch_add(1, atomic::Ordering::SeqCst);
                    })
                    .exit_handler(move |_| {
                        exited.count.fetch_sub(1, atomic::Ordering::SeqCst);
                    })
                    .build()?;
                Some(pool)
            }
        };
        log::debug!("Execution context is ready: {workers} worker(s)");

        Ok(Self {
            pool,
            workers,
            cancel,
            live,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn live_workers(&self) -> usize {
        self.live.get()
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[inline(always)]
    pub fn check(&self) -> Result<()> {
        self.cancel.check()
    }

    /// Split [0, total) into at most `parts` contiguous ranges of near-equal size.
    pub fn partition(total: usize, parts: usize) -> Vec<Range<usize>> {
        if total == 0 || parts == 0 {
            return Vec::new();
        }
        let parts = parts.min(total);
        let (step, extra) = (total / parts, total % parts);

        let mut ranges = Vec::with_capacity(parts);
        let mut start = 0;
        for ind in 0..parts {
            let end = start + step + usize::from(ind < extra);
            ranges.push(start..end);
            start = end;
        }
        debug_assert_eq!(start, total);
        ranges
    }

    fn synchronous(&self, total: usize) -> Option<&ThreadPool> {
        match &self.pool {
            Some(pool) if total > 1 => Some(pool),
            _ => None,
        }
    }

    /// Run `func` over [0, total) split into one range per worker.
    pub fn execute<F>(&self, total: usize, func: F) -> Result<()>
    where
        F: Fn(Range<usize>) -> Result<()> + Sync,
    {
        self.check()?;
        if total == 0 {
            return Ok(());
        }
        let pool = match self.synchronous(total) {
            Some(pool) => pool,
            None => {
                func(0..total)?;
                return self.check();
            }
        };

        let failure = Failure::default();
        pool.scope(|s| {
            for range in Self::partition(total, self.workers) {
                let (func, failure, cancel) = (&func, &failure, &self.cancel);
                s.spawn(move |_| {
                    if failure.occurred() || cancel.is_cancelled() {
                        return;
                    }
                    if let Err(err) = func(range) {
                        failure.record(err);
                    }
                });
            }
        });
        failure.into_result()?;
        self.check()
    }

    /// Run `func` once per index in [0, total). Cancellation is checked between items.
    pub fn execute_indexed<F>(&self, total: usize, func: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Sync,
    {
        self.execute(total, |range| {
            for ind in range {
                self.check()?;
                func(ind)?;
            }
            Ok(())
        })
    }

    /// Hand every worker exclusive ownership of a disjoint sub-slice of `items`.
    /// `func` receives the offset of its sub-slice in the original slice.
    pub fn execute_mut<T, F>(&self, items: &mut [T], func: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> Result<()> + Sync,
    {
        self.check()?;
        if items.is_empty() {
            return Ok(());
        }
        let pool = match self.synchronous(items.len()) {
            Some(pool) => pool,
            None => {
                func(0, items)?;
                return self.check();
            }
        };

        let total = items.len();
        let failure = Failure::default();
        pool.scope(|s| {
            let mut rest = items;
            for range in Self::partition(total, self.workers) {
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;

                let (func, failure, cancel) = (&func, &failure, &self.cancel);
                s.spawn(move |_| {
                    if failure.occurred() || cancel.is_cancelled() {
                        return;
                    }
                    if let Err(err) = func(range.start, chunk) {
                        failure.record(err);
                    }
                });
            }
        });
        failure.into_result()?;
        self.check()
    }

    /// Evaluate `func` for each index in [0, total) and collect results in the index order.
    pub fn map<R, F>(&self, total: usize, func: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> Result<R> + Sync,
    {
        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        self.execute_mut(&mut slots, |offset, chunk| {
            for (ind, slot) in chunk.iter_mut().enumerate() {
                self.check()?;
                *slot = Some(func(offset + ind)?);
            }
            Ok(())
        })?;

        slots
            .into_iter()
            .enumerate()
            .map(|(ind, x)| x.ok_or_else(|| eyre!("Parallel map skipped item {ind}")))
            .collect()
    }

    /// Stop accepting work and release the worker threads.
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(pool) = self.pool.take() {
            drop(pool);
            log::debug!("Execution context was shut down");
        }
    }
}

/// First error reported by any worker, later errors are only logged.
#[derive(Default)]
struct Failure {
    flag: AtomicBool,
    error: Mutex<Option<Report>>,
}

impl Failure {
    fn occurred(&self) -> bool {
        self.flag.load(atomic::Ordering::Relaxed)
    }

    fn record(&self, err: Report) {
        self.flag.store(true, atomic::Ordering::Relaxed);
        let mut slot = self.error.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            None => *slot = Some(err),
            Some(_) if is_cancelled(&err) => {}
            Some(_) => log::error!("Parallel execution failed: {err:?}"),
        }
    }

    fn into_result(self) -> Result<()> {
        match self.error.into_inner().unwrap_or_else(|e| e.into_inner()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
