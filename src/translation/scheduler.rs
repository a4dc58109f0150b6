//! Bounded-concurrency execution of translation jobs.

use futures_util::{StreamExt, stream};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::catalog::ModelCatalog;
use super::job::{JobResult, TranslationJob};

/// Runs jobs with at most `limit` of them active at any instant.
///
/// Jobs are admitted in submission order as slots free up. Results come
/// back in submission order regardless of completion order.
#[derive(Debug)]
pub struct Scheduler {
    limit: NonZeroUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Scheduler {
    pub const fn new(limit: NonZeroUsize) -> Self {
        Self {
            limit,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub const fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Jobs currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of jobs that were ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Runs every job to completion and returns their results in input order.
    pub async fn run(&self, jobs: Vec<TranslationJob>, catalog: &ModelCatalog) -> Vec<JobResult> {
        tracing::debug!(jobs = jobs.len(), limit = self.limit.get(), "scheduling");
        self.run_bounded(jobs, |job| job.run(catalog)).await
    }

    /// Applies `work` to every item with bounded concurrency, keeping input
    /// order in the output.
    pub async fn run_bounded<T, F, Fut, R>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let total = items.len();
        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

        let mut running = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let fut = work(item);
                async move {
                    self.enter();
                    let output = fut.await;
                    self.leave();
                    (index, output)
                }
            })
            .buffer_unordered(self.limit.get());

        while let Some((index, output)) = running.next().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(output);
            }
        }

        slots.into_iter().flatten().collect()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
