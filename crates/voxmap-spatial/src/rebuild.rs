//! Wholesale index rebuilds: synchronous for small maps, batched for large
//! ones, and throttled so bursts of requests collapse into one rerun.

use std::time::Duration;

use rustc_hash::FxHashSet;
use tracing::{debug, info};
use voxmap_core::{BatchBudget, BlockPos, ChunkKey, Clock, StepReport, TaskStatus};
use voxmap_voxel::{BlockTypeId, VoxelField};

use crate::index::ChunkIndex;

/// Limits for [`ChunkIndex::rebuild_from`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildSettings {
    /// Maps with more blocks than this rebuild in batches.
    pub large_map_threshold: usize,
    /// Maximum entries per batch.
    pub batch_size: usize,
    /// Wall-clock budget per batch.
    pub time_budget: Duration,
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self {
            large_map_threshold: 100_000,
            batch_size: 50_000,
            time_budget: Duration::from_millis(20),
        }
    }
}

/// Result of starting a rebuild.
#[derive(Debug)]
pub enum RebuildOutcome {
    /// The index already mirrors the field.
    Completed,
    /// The index was cleared and must be filled by stepping the task.
    Batched(IndexRebuild),
}

/// In-flight batched rebuild.
///
/// Holds a copy of the field's entries taken when the rebuild started. Edits
/// that land in the meantime are applied to the index directly and recorded
/// with [`IndexRebuild::supersede`] so later batches do not overwrite them
/// with stale values.
#[derive(Debug)]
pub struct IndexRebuild {
    entries: Vec<(BlockPos, BlockTypeId)>,
    cursor: usize,
    superseded: FxHashSet<BlockPos>,
    budget: BatchBudget,
}

impl ChunkIndex {
    /// Rebuilds the index from `field`.
    ///
    /// Blocks in `priority` chunks are indexed first so queries near the
    /// camera recover before the rest of a large map.
    pub fn rebuild_from(
        &mut self,
        field: &VoxelField,
        settings: &RebuildSettings,
        priority: &[ChunkKey],
    ) -> RebuildOutcome {
        self.clear();

        if field.len() <= settings.large_map_threshold {
            for (pos, id) in field.iter() {
                self.set_block(pos, id);
            }
            debug!(blocks = self.len(), "index rebuilt synchronously");
            return RebuildOutcome::Completed;
        }

        let mut entries = Vec::with_capacity(field.len());
        let first: FxHashSet<ChunkKey> = priority.iter().copied().collect();
        for &key in priority {
            if let Some(chunk) = field.chunk(key) {
                entries.extend(chunk.iter());
            }
        }
        for key in field.chunk_keys() {
            if first.contains(&key) {
                continue;
            }
            if let Some(chunk) = field.chunk(key) {
                entries.extend(chunk.iter());
            }
        }

        debug!(
            blocks = entries.len(),
            batch_size = settings.batch_size,
            "index rebuild batched"
        );
        RebuildOutcome::Batched(IndexRebuild {
            entries,
            cursor: 0,
            superseded: FxHashSet::default(),
            budget: BatchBudget::new(settings.batch_size, settings.time_budget),
        })
    }
}

impl IndexRebuild {
    /// Indexes the next batch of entries.
    pub fn step(&mut self, index: &mut ChunkIndex, clock: &dyn Clock) -> (TaskStatus, StepReport) {
        let entries = &self.entries;
        let cursor = &mut self.cursor;
        let superseded = &self.superseded;
        let report = self.budget.run(clock, || {
            let Some(&(pos, id)) = entries.get(*cursor) else {
                return false;
            };
            if !superseded.contains(&pos) {
                index.set_block(pos, id);
            }
            *cursor += 1;
            true
        });

        if self.cursor >= self.entries.len() {
            info!(blocks = index.len(), "index rebuild complete");
            (TaskStatus::Done, report)
        } else {
            let progress = self.cursor as f32 / self.entries.len() as f32;
            (TaskStatus::Pending { progress }, report)
        }
    }

    /// Marks `pos` as already authoritative in the index.
    pub fn supersede(&mut self, pos: BlockPos) {
        self.superseded.insert(pos);
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

/// Answer to a rebuild request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Start a rebuild now.
    RunNow,
    /// Too soon after the last rebuild; one rerun is now scheduled.
    Deferred,
    /// A rerun was already scheduled; this request folds into it.
    Coalesced,
}

/// Enforces a minimum interval between rebuild starts.
#[derive(Clone, Debug)]
pub struct RebuildThrottle {
    min_interval: Duration,
    last_start: Option<Duration>,
    deferred: bool,
}

impl RebuildThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: None,
            deferred: false,
        }
    }

    pub fn request(&mut self, now: Duration) -> ThrottleDecision {
        let ready = self
            .last_start
            .is_none_or(|last| now.saturating_sub(last) >= self.min_interval);
        if ready {
            self.last_start = Some(now);
            self.deferred = false;
            ThrottleDecision::RunNow
        } else if self.deferred {
            ThrottleDecision::Coalesced
        } else {
            self.deferred = true;
            ThrottleDecision::Deferred
        }
    }

    /// Returns `true` exactly once when a deferred rebuild becomes due.
    pub fn poll(&mut self, now: Duration) -> bool {
        if !self.deferred {
            return false;
        }
        let due = self
            .last_start
            .is_none_or(|last| now.saturating_sub(last) >= self.min_interval);
        if due {
            self.deferred = false;
            self.last_start = Some(now);
        }
        due
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred
    }

    /// Forgets all history, e.g. after a map clear.
    pub fn reset(&mut self) {
        self.last_start = None;
        self.deferred = false;
    }
}

#[cfg(test)]
mod tests {
    use voxmap_core::ManualClock;

    use super::*;

    fn filled_field(n: i32) -> VoxelField {
        let mut field = VoxelField::new(16);
        for i in 0..n {
            field.set_block(BlockPos::new(i % 64, i / 4096, (i / 64) % 64), BlockTypeId(1));
        }
        field
    }

    #[test]
    fn test_small_map_rebuilds_synchronously() {
        let field = filled_field(500);
        let mut index = ChunkIndex::new(16);
        index.set_block(BlockPos::new(-50, 0, 0), BlockTypeId(3));
        let outcome = index.rebuild_from(&field, &RebuildSettings::default(), &[]);
        assert!(matches!(outcome, RebuildOutcome::Completed));
        assert_eq!(index.len(), 500);
        assert!(!index.has_block(BlockPos::new(-50, 0, 0)));
    }

    #[test]
    fn test_large_map_rebuilds_in_batches() {
        let field = filled_field(5_000);
        let settings = RebuildSettings {
            large_map_threshold: 1_000,
            batch_size: 2_000,
            time_budget: Duration::from_secs(1),
        };
        let clock = ManualClock::new();
        let mut index = ChunkIndex::new(16);
        let RebuildOutcome::Batched(mut task) = index.rebuild_from(&field, &settings, &[]) else {
            panic!("expected batched rebuild");
        };
        assert!(index.is_empty());

        let mut steps = 0;
        loop {
            let (status, report) = task.step(&mut index, &clock);
            assert!(report.processed <= 2_000);
            steps += 1;
            if status.is_done() {
                break;
            }
        }
        assert_eq!(steps, 3);
        assert_eq!(index.len(), field.len());
    }

    #[test]
    fn test_priority_chunks_indexed_first() {
        let mut field = filled_field(3_000);
        let far = BlockPos::new(1_000, 0, 0);
        field.set_block(far, BlockTypeId(2));
        let settings = RebuildSettings {
            large_map_threshold: 10,
            batch_size: 1,
            time_budget: Duration::from_secs(1),
        };
        let clock = ManualClock::new();
        let mut index = ChunkIndex::new(16);
        let RebuildOutcome::Batched(mut task) =
            index.rebuild_from(&field, &settings, &[far.chunk(16)])
        else {
            panic!("expected batched rebuild");
        };
        task.step(&mut index, &clock);
        assert_eq!(index.len(), 1);
        assert!(index.has_block(far));
    }

    #[test]
    fn test_superseded_positions_are_not_overwritten() {
        let field = filled_field(2_000);
        let settings = RebuildSettings {
            large_map_threshold: 10,
            batch_size: 100_000,
            time_budget: Duration::from_secs(1),
        };
        let clock = ManualClock::new();
        let mut index = ChunkIndex::new(16);
        let RebuildOutcome::Batched(mut task) = index.rebuild_from(&field, &settings, &[]) else {
            panic!("expected batched rebuild");
        };

        // An edit removed this block after the rebuild started.
        let edited = BlockPos::new(0, 0, 0);
        task.supersede(edited);
        let (status, _) = task.step(&mut index, &clock);
        assert!(status.is_done());
        assert!(!index.has_block(edited));
        assert_eq!(index.len(), 1_999);
    }

    #[test]
    fn test_throttle_runs_first_request() {
        let mut throttle = RebuildThrottle::new(Duration::from_secs(1));
        assert_eq!(throttle.request(Duration::ZERO), ThrottleDecision::RunNow);
    }

    #[test]
    fn test_throttle_defers_once_and_coalesces() {
        let mut throttle = RebuildThrottle::new(Duration::from_secs(1));
        throttle.request(Duration::ZERO);
        assert_eq!(throttle.request(Duration::from_millis(200)), ThrottleDecision::Deferred);
        assert_eq!(throttle.request(Duration::from_millis(300)), ThrottleDecision::Coalesced);
        assert!(!throttle.poll(Duration::from_millis(900)));
        assert!(throttle.poll(Duration::from_millis(1_000)));
        assert!(!throttle.poll(Duration::from_millis(1_100)));
        assert!(!throttle.has_deferred());
    }

    #[test]
    fn test_throttle_allows_after_interval() {
        let mut throttle = RebuildThrottle::new(Duration::from_secs(1));
        throttle.request(Duration::ZERO);
        assert_eq!(throttle.request(Duration::from_millis(1_500)), ThrottleDecision::RunNow);
    }
}
