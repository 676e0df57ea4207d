// Copyright 2026 Kitsquid Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded concurrency executor.
//!
//! Runs a batch of independent, strongly typed jobs with at most `limit`
//! in flight. Each job runs at most once. Successful outputs are merged
//! into a shared accumulator under a mutex that is held only for the merge
//! step, never across the job's own fetch and parse work. Failures are
//! logged and left out of the aggregate; they never abort siblings. A job
//! that cannot obtain a slot (the executor was cancelled) is skipped, not
//! retried. The caller sees the accumulator only after every spawned job
//! has been joined.

use crate::error::ScrapeError;
use crate::progress::{Phase, ProgressEventKind, ProgressReporter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A unit of work with a typed output.
#[async_trait]
pub trait Job: Send + Sized + 'static {
    type Output: Send + 'static;

    /// Short description used in logs and progress events.
    fn label(&self) -> String;

    async fn run(self) -> Result<Self::Output, ScrapeError>;
}

/// Aggregate of one batch plus its bookkeeping counters.
#[derive(Debug)]
pub struct BatchOutcome<A> {
    pub value: A,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct BoundedExecutor {
    permits: Arc<Semaphore>,
    limit: usize,
    progress: ProgressReporter,
}

impl BoundedExecutor {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Stop handing out slots. Jobs not yet started are skipped; jobs in
    /// flight run to completion.
    pub fn cancel(&self) {
        self.permits.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.permits.is_closed()
    }

    /// Run every job and fold successful outputs into `init` with `merge`.
    pub async fn run_all<J, A, M>(
        &self,
        phase: Phase,
        jobs: Vec<J>,
        init: A,
        merge: M,
    ) -> BatchOutcome<A>
    where
        J: Job,
        A: Default + Send + 'static,
        M: Fn(&mut A, J::Output) + Send + Sync + 'static,
    {
        let start = Instant::now();
        let total = jobs.len();
        info!("{phase}: {total} jobs, at most {} concurrent", self.limit);
        self.progress
            .emit(ProgressEventKind::PhaseStarted { phase, jobs: total });

        let acc = Arc::new(Mutex::new(init));
        let merge = Arc::new(merge);
        let mut set = JoinSet::new();
        let mut skipped = 0usize;

        for job in jobs {
            let label = job.label();
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    warn!("{phase}: skipping {label}, no concurrency slot available");
                    self.progress
                        .emit(ProgressEventKind::JobSkipped { phase, label });
                    skipped += 1;
                    continue;
                }
            };

            let acc = Arc::clone(&acc);
            let merge = Arc::clone(&merge);
            let progress = self.progress.clone();
            set.spawn(async move {
                let _permit = permit;
                match job.run().await {
                    Ok(output) => {
                        {
                            let mut guard = acc.lock().await;
                            merge(&mut guard, output);
                        }
                        debug!("{phase}: {label} done");
                        progress.emit(ProgressEventKind::JobFinished {
                            phase,
                            label,
                            ok: true,
                        });
                        true
                    }
                    Err(e) => {
                        warn!("{phase}: {label} failed ({} error): {e}", e.kind());
                        progress.emit(ProgressEventKind::JobFinished {
                            phase,
                            label,
                            ok: false,
                        });
                        false
                    }
                }
            });
        }

        let (mut succeeded, mut failed) = (0usize, 0usize);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    error!("{phase}: job task aborted: {e}");
                    failed += 1;
                }
            }
        }

        let value = match Arc::try_unwrap(acc) {
            Ok(m) => m.into_inner(),
            Err(shared) => std::mem::take(&mut *shared.lock().await),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "{phase}: {succeeded} ok, {failed} failed, {skipped} skipped in {:.1}s",
            elapsed_ms as f64 / 1000.0
        );
        self.progress.emit(ProgressEventKind::PhaseCompleted {
            phase,
            succeeded,
            failed,
            skipped,
            elapsed_ms,
        });

        BatchOutcome {
            value,
            succeeded,
            failed,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Probe {
        id: usize,
        fail: bool,
        panic: bool,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Job for Probe {
        type Output = usize;

        fn label(&self) -> String {
            format!("probe #{}", self.id)
        }

        async fn run(self) -> Result<usize, ScrapeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.panic {
                panic!("probe exploded");
            }
            if self.fail {
                return Err(ScrapeError::Parse(format!("probe {} broke", self.id)));
            }
            Ok(self.id)
        }
    }

    struct Counters {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        runs: Arc<AtomicUsize>,
    }

    fn probes(n: usize, failing: &[usize], panicking: &[usize]) -> (Vec<Probe>, Counters) {
        let c = Counters {
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            runs: Arc::new(AtomicUsize::new(0)),
        };
        let jobs = (0..n)
            .map(|id| Probe {
                id,
                fail: failing.contains(&id),
                panic: panicking.contains(&id),
                active: Arc::clone(&c.active),
                peak: Arc::clone(&c.peak),
                runs: Arc::clone(&c.runs),
            })
            .collect();
        (jobs, c)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_limit() {
        for (batch, limit) in [(3usize, 3usize), (20, 3), (50, 6), (7, 1)] {
            let (jobs, counters) = probes(batch, &[], &[]);
            let exec = BoundedExecutor::new(limit);
            let out = exec
                .run_all(Phase::Listings, jobs, Vec::new(), |acc: &mut Vec<usize>, id| {
                    acc.push(id)
                })
                .await;
            assert!(counters.peak.load(Ordering::SeqCst) <= limit);
            assert_eq!(counters.runs.load(Ordering::SeqCst), batch);
            assert_eq!(out.value.len(), batch);
            assert_eq!(out.succeeded, batch);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_does_not_stop_siblings() {
        let (jobs, _) = probes(10, &[4], &[]);
        let out = BoundedExecutor::new(3)
            .run_all(Phase::Details, jobs, Vec::new(), |acc: &mut Vec<usize>, id| {
                acc.push(id)
            })
            .await;
        let mut ids = out.value;
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3, 5, 6, 7, 8, 9]);
        assert_eq!((out.succeeded, out.failed, out.skipped), (9, 1, 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_job_is_counted_as_failure() {
        let (jobs, _) = probes(4, &[], &[2]);
        let out = BoundedExecutor::new(2)
            .run_all(Phase::Details, jobs, 0usize, |acc: &mut usize, _| *acc += 1)
            .await;
        assert_eq!(out.value, 3);
        assert_eq!(out.failed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_executor_skips_jobs() {
        let (jobs, counters) = probes(5, &[], &[]);
        let exec = BoundedExecutor::new(2);
        exec.cancel();
        assert!(exec.is_cancelled());
        let out = exec
            .run_all(Phase::Listings, jobs, Vec::new(), |acc: &mut Vec<usize>, id| {
                acc.push(id)
            })
            .await;
        assert!(out.value.is_empty());
        assert_eq!(out.skipped, 5);
        assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        assert_eq!(BoundedExecutor::new(0).limit(), 1);
    }
}
