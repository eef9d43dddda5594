//! Property tests for edit ordering on the voxel field.

use std::collections::HashMap;

use proptest::prelude::*;
use voxmap_core::BlockPos;
use voxmap_voxel::{BlockTypeId, VoxelField};

#[derive(Clone, Debug)]
enum Edit {
    Set(BlockPos, u16),
    Remove(BlockPos),
}

impl Edit {
    fn pos(&self) -> BlockPos {
        match self {
            Edit::Set(p, _) | Edit::Remove(p) => *p,
        }
    }

    fn apply(&self, field: &mut VoxelField) {
        match *self {
            Edit::Set(p, id) => {
                field.set_block(p, BlockTypeId(id));
            }
            Edit::Remove(p) => {
                field.remove_block(p);
            }
        }
    }
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let pos = (-20i32..20, -4i32..4, -20i32..20).prop_map(|(x, y, z)| BlockPos::new(x, y, z));
    prop_oneof![
        (pos.clone(), 1u16..6).prop_map(|(p, id)| Edit::Set(p, id)),
        pos.prop_map(Edit::Remove),
    ]
}

fn contents(field: &VoxelField) -> HashMap<BlockPos, BlockTypeId> {
    field.iter().collect()
}

proptest! {
    /// Property: the final field depends only on the last edit per key.
    ///
    /// Regrouping the edit list by key (keeping each key's own order) and
    /// replaying it must give the same content as the original interleaving.
    #[test]
    fn last_write_per_key_determines_state(edits in prop::collection::vec(edit_strategy(), 0..200)) {
        let mut interleaved = VoxelField::new(8);
        for e in &edits {
            e.apply(&mut interleaved);
        }

        let mut grouped = edits.clone();
        grouped.sort_by_key(|e| std::cmp::Reverse(e.pos()));
        let mut regrouped = VoxelField::new(8);
        for e in &grouped {
            e.apply(&mut regrouped);
        }

        prop_assert_eq!(contents(&interleaved), contents(&regrouped));
        prop_assert_eq!(interleaved.len(), regrouped.len());
    }

    /// Property: the block count always equals the number of distinct keys
    /// whose last edit was a set.
    #[test]
    fn len_matches_surviving_keys(edits in prop::collection::vec(edit_strategy(), 0..200)) {
        let mut field = VoxelField::new(16);
        let mut model: HashMap<BlockPos, u16> = HashMap::new();
        for e in &edits {
            e.apply(&mut field);
            match *e {
                Edit::Set(p, id) => { model.insert(p, id); }
                Edit::Remove(p) => { model.remove(&p); }
            }
        }
        prop_assert_eq!(field.len(), model.len());
        for (p, id) in model {
            prop_assert_eq!(field.get(p), Some(BlockTypeId(id)));
        }
    }
}
