//! Batched replacement of the whole field.

use std::time::Duration;

use tracing::{debug, info};
use voxmap_core::{BatchBudget, BlockPos, Clock, StepReport, TaskStatus};

use crate::catalog::BlockTypeId;
use crate::field::VoxelField;

/// Default number of entries applied per step.
pub const DEFAULT_BULK_BATCH: usize = 50_000;

/// A resumable bulk load. Created by [`VoxelField::bulk_load`], which clears
/// the field; each [`BulkLoad::step`] applies the next batch of entries.
#[derive(Debug)]
pub struct BulkLoad {
    entries: Vec<(BlockPos, BlockTypeId)>,
    cursor: usize,
    budget: BatchBudget,
}

impl VoxelField {
    /// Replaces the field's content with `entries`, applied over several
    /// calls to [`BulkLoad::step`]. Duplicate positions resolve to the last
    /// entry; air entries are skipped.
    pub fn bulk_load(
        &mut self,
        entries: Vec<(BlockPos, BlockTypeId)>,
        batch_size: usize,
        time_budget: Duration,
    ) -> BulkLoad {
        self.clear();
        debug!(entries = entries.len(), batch_size, "bulk load started");
        BulkLoad {
            entries,
            cursor: 0,
            budget: BatchBudget::new(batch_size, time_budget),
        }
    }
}

impl BulkLoad {
    /// Applies up to one batch of entries to `field`.
    pub fn step(&mut self, field: &mut VoxelField, clock: &dyn Clock) -> (TaskStatus, StepReport) {
        let entries = &self.entries;
        let cursor = &mut self.cursor;
        let report = self.budget.run(clock, || {
            let Some(&(pos, id)) = entries.get(*cursor) else {
                return false;
            };
            field.insert_raw(pos, id);
            *cursor += 1;
            true
        });

        let status = if self.is_finished() {
            info!(blocks = field.len(), chunks = field.chunk_count(), "bulk load complete");
            TaskStatus::Done
        } else {
            TaskStatus::Pending {
                progress: self.progress(),
            }
        };
        (status, report)
    }

    /// Runs every remaining step back to back.
    pub fn finish(mut self, field: &mut VoxelField, clock: &dyn Clock) {
        while !self.step(field, clock).0.is_done() {}
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// Fraction of entries applied, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.entries.is_empty() {
            1.0
        } else {
            self.cursor as f32 / self.entries.len() as f32
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Consumes the load and returns the entries not yet applied, in order.
    pub fn into_remaining(mut self) -> Vec<(BlockPos, BlockTypeId)> {
        self.entries.split_off(self.cursor.min(self.entries.len()))
    }
}
