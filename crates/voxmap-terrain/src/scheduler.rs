//! Deduplicating build queue drained in time-boxed slices.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Display;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::warn;
use voxmap_core::{ChunkKey, Clock};

/// Priority used for chunks touched by a direct edit.
pub const EDIT_PRIORITY: f64 = 0.0;

/// A chunk waiting to be (re)built. Lower `priority` runs sooner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildTask {
    pub key: ChunkKey,
    pub priority: f64,
    /// Clock time of the first enqueue.
    pub enqueued_at: Duration,
}

#[derive(Clone, Copy, Debug)]
struct HeapEntry {
    key: ChunkKey,
    priority: f64,
    seq: u64,
    generation: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // `BinaryHeap` is a max-heap: the smallest priority, then the oldest
    // sequence number, must compare greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Clone, Copy, Debug)]
struct LiveTask {
    priority: f64,
    generation: u64,
    seq: u64,
    enqueued_at: Duration,
}

/// Priority queue with at most one live task per chunk.
///
/// Re-enqueueing a queued chunk can only make it sooner. Superseded heap
/// entries stay in the heap and are skipped on pop by generation.
#[derive(Debug, Default)]
pub struct BuildScheduler {
    heap: BinaryHeap<HeapEntry>,
    live: FxHashMap<ChunkKey, LiveTask>,
    next_seq: u64,
    next_generation: u64,
}

/// Outcome of one [`BuildScheduler::process_slice`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceReport {
    /// Tasks handed to the callback, including failed ones.
    pub processed: usize,
    pub failed: usize,
    pub failed_keys: Vec<ChunkKey>,
    pub elapsed: Duration,
    /// Tasks still queued after the slice.
    pub remaining: usize,
}

impl BuildScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `key` at `priority`. Returns `true` if the key was not queued
    /// yet or its priority moved sooner.
    pub fn enqueue(&mut self, key: ChunkKey, priority: f64, now: Duration) -> bool {
        let generation = self.next_generation;
        let (seq, enqueued_at) = match self.live.get(&key) {
            Some(live) if live.priority <= priority => return false,
            Some(live) => (live.seq, live.enqueued_at),
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                (seq, now)
            }
        };
        self.next_generation += 1;
        self.live.insert(
            key,
            LiveTask {
                priority,
                generation,
                seq,
                enqueued_at,
            },
        );
        self.heap.push(HeapEntry {
            key,
            priority,
            seq,
            generation,
        });
        true
    }

    /// Removes and returns the soonest task.
    pub fn pop(&mut self) -> Option<BuildTask> {
        while let Some(entry) = self.heap.pop() {
            if let Some(live) = self.live.get(&entry.key)
                && live.generation == entry.generation
            {
                let task = BuildTask {
                    key: entry.key,
                    priority: live.priority,
                    enqueued_at: live.enqueued_at,
                };
                self.live.remove(&entry.key);
                return Some(task);
            }
        }
        None
    }

    /// Pops and runs tasks until `budget` has elapsed or `max_tasks` have
    /// run. A failing task is logged and counted; the slice continues.
    pub fn process_slice<E, F>(
        &mut self,
        clock: &dyn Clock,
        budget: Duration,
        max_tasks: usize,
        mut f: F,
    ) -> SliceReport
    where
        E: Display,
        F: FnMut(BuildTask) -> Result<(), E>,
    {
        let start = clock.now();
        let mut report = SliceReport::default();

        while report.processed < max_tasks {
            if clock.now().saturating_sub(start) >= budget {
                break;
            }
            let Some(task) = self.pop() else {
                break;
            };
            report.processed += 1;
            if let Err(e) = f(task) {
                warn!(chunk = %task.key, error = %e, "chunk build failed");
                report.failed += 1;
                report.failed_keys.push(task.key);
            }
        }

        report.elapsed = clock.now().saturating_sub(start);
        report.remaining = self.pending();
        report
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.live.contains_key(&key)
    }

    /// Current priority of a queued key.
    #[must_use]
    pub fn priority_of(&self, key: ChunkKey) -> Option<f64> {
        self.live.get(&key).map(|live| live.priority)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use voxmap_core::ManualClock;

    use super::*;

    fn key(x: i32) -> ChunkKey {
        ChunkKey::new(x, 0, 0)
    }

    #[test]
    fn test_pops_lowest_priority_first() {
        let mut q = BuildScheduler::new();
        q.enqueue(key(1), 50.0, Duration::ZERO);
        q.enqueue(key(2), 5.0, Duration::ZERO);
        q.enqueue(key(3), 20.0, Duration::ZERO);
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|t| t.key).collect();
        assert_eq!(order, vec![key(2), key(3), key(1)]);
    }

    #[test]
    fn test_ties_are_fifo() {
        let mut q = BuildScheduler::new();
        for x in 0..5 {
            q.enqueue(key(x), 1.0, Duration::ZERO);
        }
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|t| t.key.x).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dedupes_and_only_moves_sooner() {
        let mut q = BuildScheduler::new();
        assert!(q.enqueue(key(1), 10.0, Duration::from_millis(1)));
        assert!(!q.enqueue(key(1), 30.0, Duration::from_millis(2)));
        assert_eq!(q.priority_of(key(1)), Some(10.0));
        assert!(q.enqueue(key(1), 2.0, Duration::from_millis(3)));
        assert_eq!(q.pending(), 1);

        let task = q.pop().unwrap();
        assert_eq!(task.priority, 2.0);
        assert_eq!(task.enqueued_at, Duration::from_millis(1));
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_bumped_task_keeps_fifo_position_among_equals() {
        let mut q = BuildScheduler::new();
        q.enqueue(key(1), 9.0, Duration::ZERO);
        q.enqueue(key(2), 0.0, Duration::ZERO);
        q.enqueue(key(1), 0.0, Duration::ZERO);
        assert_eq!(q.pop().unwrap().key, key(1));
        assert_eq!(q.pop().unwrap().key, key(2));
    }

    #[test]
    fn test_slice_respects_max_tasks() {
        let clock = ManualClock::new();
        let mut q = BuildScheduler::new();
        for x in 0..20 {
            q.enqueue(key(x), x as f64, Duration::ZERO);
        }
        let report = q.process_slice(&clock, Duration::from_millis(20), 8, |_| Ok::<_, String>(()));
        assert_eq!(report.processed, 8);
        assert_eq!(report.remaining, 12);
    }

    #[test]
    fn test_slice_respects_budget() {
        let clock = ManualClock::new();
        let mut q = BuildScheduler::new();
        for x in 0..20 {
            q.enqueue(key(x), 0.0, Duration::ZERO);
        }
        let report = q.process_slice(&clock, Duration::from_millis(20), 100, |_| {
            clock.advance(Duration::from_millis(7));
            Ok::<_, String>(())
        });
        assert_eq!(report.processed, 3);
        assert_eq!(report.elapsed, Duration::from_millis(21));
    }

    #[test]
    fn test_failures_do_not_stop_slice() {
        let clock = ManualClock::new();
        let mut q = BuildScheduler::new();
        for x in 0..4 {
            q.enqueue(key(x), x as f64, Duration::ZERO);
        }
        let report = q.process_slice(&clock, Duration::from_millis(20), 8, |task| {
            if task.key.x % 2 == 1 {
                Err("boom")
            } else {
                Ok(())
            }
        });
        assert_eq!(report.processed, 4);
        assert_eq!(report.failed, 2);
        assert_eq!(report.failed_keys, vec![key(1), key(3)]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut q = BuildScheduler::new();
        q.enqueue(key(1), 1.0, Duration::ZERO);
        q.clear();
        assert!(!q.contains(key(1)));
        assert!(q.pop().is_none());
    }
}
