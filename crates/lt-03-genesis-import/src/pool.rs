//! # Bounded-Concurrency Task Pool
//!
//! Drives the post-pass reconciliation over an explicit queue with a
//! fixed number of tasks in flight. Tasks are independent, idempotent,
//! best-effort corrections: a failure is caught, logged and counted, and
//! the pool keeps going. Draining means awaiting natural completion of
//! everything outstanding - there is no mid-task cancellation.

use std::collections::VecDeque;
use std::future::Future;

use tokio::task::JoinSet;
use tracing::warn;

use crate::errors::ImportError;

pub struct TaskPool {
    concurrency: usize,
}

/// What happened to the queued tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub completed: u64,
    pub failed: u64,
}

impl TaskPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Run every queued item through `handler`, at most `concurrency` at
    /// a time, and drain to natural completion.
    pub async fn run_all<T, F, Fut>(&self, queue: Vec<T>, handler: F) -> PoolReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), ImportError>> + Send + 'static,
    {
        let mut queue: VecDeque<T> = queue.into();
        let mut in_flight: JoinSet<Result<(), ImportError>> = JoinSet::new();
        let mut report = PoolReport::default();

        while let Some(item) = queue.pop_front() {
            if in_flight.len() >= self.concurrency {
                if let Some(result) = in_flight.join_next().await {
                    tally(&mut report, result);
                }
            }
            in_flight.spawn(handler(item));
        }

        while let Some(result) = in_flight.join_next().await {
            tally(&mut report, result);
        }

        report
    }
}

fn tally(report: &mut PoolReport, result: Result<Result<(), ImportError>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => report.completed += 1,
        Ok(Err(err)) => {
            warn!(%err, "reconciliation task failed");
            report.failed += 1;
        }
        Err(err) => {
            warn!(%err, "reconciliation task panicked");
            report.failed += 1;
        }
    }
}
