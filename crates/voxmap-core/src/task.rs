//! Resumable, time-sliced work.
//!
//! Long operations (bulk loads, index rebuilds) are structs with a `step`
//! method that does a bounded amount of work and returns [`TaskStatus`].
//! The frame loop calls `step` once per frame until it reports `Done`.

use std::time::Duration;

use crate::clock::Clock;

/// Number of items processed between clock reads.
pub const CHECK_INTERVAL: usize = 1024;

/// Outcome of one resumable step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TaskStatus {
    /// More work remains. `progress` is in `[0, 1]`.
    Pending { progress: f32 },
    /// All work is complete.
    Done,
}

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    pub fn progress(&self) -> f32 {
        match self {
            TaskStatus::Pending { progress } => *progress,
            TaskStatus::Done => 1.0,
        }
    }
}

/// What a single bounded batch accomplished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Items processed in this batch.
    pub processed: usize,
    /// Clock time measured for the batch.
    pub elapsed: Duration,
    /// True if the work source ran dry.
    pub exhausted: bool,
}

/// Limits for one batch: an item cap and a wall-clock budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchBudget {
    pub max_items: usize,
    pub time: Duration,
}

impl BatchBudget {
    pub fn new(max_items: usize, time: Duration) -> Self {
        Self {
            max_items: max_items.max(1),
            time,
        }
    }

    /// Calls `next` until it reports no more work, the item cap is reached,
    /// or the next sub-batch of [`CHECK_INTERVAL`] items is predicted to
    /// overrun the time budget.
    ///
    /// The prediction uses the slowest sub-batch seen so far, so a batch of
    /// uniform cost never measures longer than `self.time`.
    pub fn run(&self, clock: &dyn Clock, mut next: impl FnMut() -> bool) -> StepReport {
        let start = clock.now();
        let mut last = start;
        let mut slowest = Duration::ZERO;
        let mut processed = 0;
        let mut exhausted = false;

        while processed < self.max_items {
            let sub_end = processed.saturating_add(CHECK_INTERVAL).min(self.max_items);
            while processed < sub_end {
                if !next() {
                    exhausted = true;
                    break;
                }
                processed += 1;
            }

            let now = clock.now();
            slowest = slowest.max(now.saturating_sub(last));
            last = now;

            if exhausted || now.saturating_sub(start) + slowest > self.time {
                break;
            }
        }

        StepReport {
            processed,
            elapsed: last.saturating_sub(start),
            exhausted,
        }
    }
}
