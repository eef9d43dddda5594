//! The terrain coordinator.
//!
//! [`TerrainSystem`] owns the block field, its spatial index, the per-chunk
//! meshes and the frame pipeline that keeps them in step with edits and the
//! camera. Everything runs on the caller's thread; long work (bulk loads,
//! index rebuilds, chunk builds) advances by one bounded step per
//! [`TerrainSystem::frame`].

use std::sync::Arc;

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace, warn};
use voxmap_core::{BlockPos, ChunkKey, Clock, NEIGHBOR_OFFSETS, StepReport};
use voxmap_mesh::{GridAtlas, MeshBuildError, MeshBuilder, MeshSet, MeshTier, TextureAtlas};
use voxmap_spatial::{
    ChunkIndex, IndexRebuild, Ray, RaycastContext, RaycastEngine, RaycastHit, RebuildOutcome,
    RebuildThrottle, ThrottleDecision,
};
use voxmap_voxel::{
    BlockTypeCatalog, BlockTypeId, BulkLoad, PlacementShape, TouchedChunks, VoxelField,
};

use crate::camera::{CameraMotion, CameraSnapshot};
use crate::persistence::{BlockMap, StoreError, TerrainStore};
use crate::scene::{HeadlessScene, SceneGraph};
use crate::scheduler::{BuildScheduler, EDIT_PRIORITY, SliceReport};
use crate::settings::TerrainSettings;
use crate::visibility::{
    ChunkSource, IndexOcclusion, OcclusionQuery, VisibilityContext, VisibilityTracker,
};

/// One block mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockEdit {
    Set(BlockPos, BlockTypeId),
    Remove(BlockPos),
}

impl BlockEdit {
    pub fn pos(self) -> BlockPos {
        match self {
            BlockEdit::Set(pos, _) | BlockEdit::Remove(pos) => pos,
        }
    }
}

/// What [`TerrainSystem::apply_edit`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditReport {
    /// Every chunk the edits touched, owning chunks first.
    pub touched: Vec<ChunkKey>,
    /// Chunks rebuilt before returning.
    pub rebuilt: usize,
    /// Chunks left to the build queue.
    pub queued: usize,
}

/// Result of rebuilding one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkBuild {
    Built(MeshTier),
    /// The mesh already reflects the chunk's current version.
    Unchanged,
    /// The chunk had no blocks left; its record and mesh are gone.
    Removed,
}

/// What one [`TerrainSystem::frame`] did.
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    pub bulk_step: Option<StepReport>,
    pub index_step: Option<StepReport>,
    pub shown: usize,
    pub hidden: usize,
    pub requested: usize,
    pub slice: SliceReport,
    pub saved: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainStats {
    pub blocks: usize,
    pub chunks: usize,
    pub indexed: usize,
    pub meshes: usize,
    pub attached: usize,
    pub queued: usize,
    pub atlas_waiting: usize,
    pub triangles: usize,
    pub loading: bool,
}

#[derive(Debug)]
struct ChunkRender {
    mesh: MeshSet,
    built_version: u64,
    /// Rebuild even if the chunk version is unchanged.
    stale: bool,
    attached: bool,
}

struct TerrainChunks<'a> {
    field: &'a VoxelField,
    renders: &'a FxHashMap<ChunkKey, ChunkRender>,
}

impl ChunkSource for TerrainChunks<'_> {
    fn chunk_keys(&self) -> Vec<ChunkKey> {
        self.field.chunk_keys().collect()
    }

    fn has_mesh(&self, key: ChunkKey) -> bool {
        self.renders.contains_key(&key)
    }
}

pub struct TerrainSystem<A = GridAtlas, G = HeadlessScene> {
    settings: TerrainSettings,
    clock: Arc<dyn Clock>,
    catalog: BlockTypeCatalog,
    atlas: A,
    scene: G,
    store: Option<Box<dyn TerrainStore>>,

    field: VoxelField,
    index: ChunkIndex,
    index_rebuild: Option<IndexRebuild>,
    throttle: RebuildThrottle,
    bulk: Option<BulkLoad>,

    builder: MeshBuilder,
    renders: FxHashMap<ChunkKey, ChunkRender>,
    scheduler: BuildScheduler,
    visibility: VisibilityTracker,
    motion: CameraMotion,
    raycast: RaycastEngine,
    atlas_waiting: FxHashSet<ChunkKey>,

    gesture_active: bool,
    gesture_exclude: FxHashSet<BlockPos>,
    last_camera: Option<CameraSnapshot>,
    save_pending: bool,
    save_after_load: bool,
}

impl<A: TextureAtlas, G: SceneGraph> TerrainSystem<A, G> {
    pub fn new(
        mut settings: TerrainSettings,
        catalog: BlockTypeCatalog,
        atlas: A,
        scene: G,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let size = settings.chunk_size;
        settings.visibility.chunk_size = size;
        Self {
            field: VoxelField::new(size),
            index: ChunkIndex::new(size),
            index_rebuild: None,
            throttle: RebuildThrottle::new(settings.rebuild_interval),
            bulk: None,
            builder: MeshBuilder::new(),
            renders: FxHashMap::default(),
            scheduler: BuildScheduler::new(),
            visibility: VisibilityTracker::new(settings.visibility.clone()),
            motion: CameraMotion::default(),
            raycast: RaycastEngine::new(settings.raycast),
            atlas_waiting: FxHashSet::default(),
            gesture_active: false,
            gesture_exclude: FxHashSet::default(),
            last_camera: None,
            save_pending: false,
            save_after_load: false,
            settings,
            clock,
            catalog,
            atlas,
            scene,
            store: None,
        }
    }

    /// Persists the map to `store` after every frame that mutated it.
    pub fn with_store(mut self, store: Box<dyn TerrainStore>) -> Self {
        self.store = Some(store);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn field(&self) -> &VoxelField {
        &self.field
    }

    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    pub fn catalog(&self) -> &BlockTypeCatalog {
        &self.catalog
    }

    pub fn atlas(&self) -> &A {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut A {
        &mut self.atlas
    }

    pub fn scene(&self) -> &G {
        &self.scene
    }

    pub fn store(&self) -> Option<&dyn TerrainStore> {
        self.store.as_deref()
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    pub fn mesh(&self, key: ChunkKey) -> Option<&MeshSet> {
        self.renders.get(&key).map(|r| &r.mesh)
    }

    pub fn built_version(&self, key: ChunkKey) -> Option<u64> {
        self.renders.get(&key).map(|r| r.built_version)
    }

    pub fn is_attached(&self, key: ChunkKey) -> bool {
        self.renders.get(&key).is_some_and(|r| r.attached)
    }

    pub fn is_queued(&self, key: ChunkKey) -> bool {
        self.scheduler.contains(key)
    }

    pub fn is_waiting_for_atlas(&self, key: ChunkKey) -> bool {
        self.atlas_waiting.contains(&key)
    }

    /// True while a bulk load or a batched index rebuild is in flight.
    pub fn is_loading(&self) -> bool {
        self.bulk.is_some() || self.index_rebuild.is_some()
    }

    pub fn stats(&self) -> TerrainStats {
        TerrainStats {
            blocks: self.field.len(),
            chunks: self.field.chunk_count(),
            indexed: self.index.len(),
            meshes: self.renders.len(),
            attached: self.renders.values().filter(|r| r.attached).count(),
            queued: self.scheduler.pending(),
            atlas_waiting: self.atlas_waiting.len(),
            triangles: self.renders.values().map(|r| r.mesh.triangle_count()).sum(),
            loading: self.is_loading(),
        }
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Places a block and queues the touched chunks at edit priority.
    pub fn set_block(&mut self, pos: BlockPos, id: BlockTypeId) -> TouchedChunks {
        let touched = self.mutate(BlockEdit::Set(pos, id));
        self.queue_edits(&touched);
        touched
    }

    /// Removes a block and queues the touched chunks at edit priority.
    pub fn remove_block(&mut self, pos: BlockPos) -> TouchedChunks {
        let touched = self.mutate(BlockEdit::Remove(pos));
        self.queue_edits(&touched);
        touched
    }

    /// Applies a user edit. Up to `immediate_rebuild_limit` touched chunks
    /// are rebuilt before returning; the rest are queued at edit priority.
    pub fn apply_edit(&mut self, edits: &[BlockEdit]) -> EditReport {
        let mut seen = FxHashSet::default();
        let mut touched = Vec::new();
        for &edit in edits {
            for key in self.mutate(edit) {
                if seen.insert(key) {
                    touched.push(key);
                }
            }
        }

        let now = self.clock.now();
        let limit = self.settings.immediate_rebuild_limit;
        let mut report = EditReport::default();
        for (i, &key) in touched.iter().enumerate() {
            if i < limit {
                match self.rebuild_chunk(key) {
                    Ok(_) => {
                        report.rebuilt += 1;
                        continue;
                    }
                    Err(e) => warn!(chunk = %key, error = %e, "immediate rebuild failed"),
                }
            }
            self.scheduler.enqueue(key, EDIT_PRIORITY, now);
            report.queued += 1;
        }

        if !touched.is_empty() {
            self.visibility.invalidate();
        }
        report.touched = touched;
        report
    }

    /// Starts an edit gesture. Blocks placed until [`Self::end_gesture`] are
    /// ignored by [`Self::pick`], so dragging does not stack blocks toward
    /// the camera.
    pub fn begin_gesture(&mut self) {
        self.gesture_active = true;
        self.gesture_exclude.clear();
    }

    pub fn end_gesture(&mut self) {
        self.gesture_active = false;
        self.gesture_exclude.clear();
    }

    /// Stamps `shape` around `center`. A placement that came from a ground
    /// hit is refused when it lands too close to existing blocks.
    pub fn place_shape(
        &mut self,
        center: BlockPos,
        shape: PlacementShape,
        id: BlockTypeId,
        from_ground: bool,
    ) -> EditReport {
        if from_ground && !self.settings.ground_placement.allows(&self.field, center) {
            debug!(pos = %center, "ground placement refused near existing blocks");
            return EditReport::default();
        }
        let edits: Vec<BlockEdit> = shape
            .positions(center)
            .into_iter()
            .filter(|&pos| self.field.get(pos) != Some(id))
            .map(|pos| BlockEdit::Set(pos, id))
            .collect();
        if self.gesture_active {
            self.gesture_exclude.extend(edits.iter().map(|e| e.pos()));
        }
        self.apply_edit(&edits)
    }

    pub fn erase_shape(&mut self, center: BlockPos, shape: PlacementShape) -> EditReport {
        let edits: Vec<BlockEdit> = shape
            .positions(center)
            .into_iter()
            .filter(|&pos| self.field.contains(pos))
            .map(BlockEdit::Remove)
            .collect();
        self.apply_edit(&edits)
    }

    /// Casts `ray` against the terrain and ground plane, skipping blocks
    /// placed in the current gesture.
    pub fn pick(&self, ray: &Ray) -> Option<RaycastHit> {
        let index = (!self.is_loading()).then_some(&self.index);
        let ctx = RaycastContext {
            field: &self.field,
            index,
            exclude: &self.gesture_exclude,
        };
        self.raycast.cast(ray, &ctx)
    }

    fn mutate(&mut self, edit: BlockEdit) -> TouchedChunks {
        let touched = match edit {
            BlockEdit::Set(pos, id) => self.field.set_block(pos, id),
            BlockEdit::Remove(pos) => self.field.remove_block(pos),
        };
        if !touched.is_empty() {
            let pos = edit.pos();
            self.index.sync_from(&self.field, pos);
            if let Some(rebuild) = &mut self.index_rebuild {
                rebuild.supersede(pos);
            }
            self.save_pending = true;
        }
        touched
    }

    fn queue_edits(&mut self, touched: &[ChunkKey]) {
        let now = self.clock.now();
        for &key in touched {
            self.scheduler.enqueue(key, EDIT_PRIORITY, now);
        }
        if !touched.is_empty() {
            self.visibility.invalidate();
        }
    }

    // -----------------------------------------------------------------------
    // Whole-map operations
    // -----------------------------------------------------------------------

    /// Replaces the map with `entries`, loaded over the following frames.
    /// The new map is saved once the load completes.
    pub fn begin_bulk_load(&mut self, entries: Vec<(BlockPos, BlockTypeId)>) {
        self.start_bulk_load(entries, true);
    }

    fn start_bulk_load(&mut self, entries: Vec<(BlockPos, BlockTypeId)>, save_after: bool) {
        self.save_after_load = save_after;
        self.reset_render_state();
        self.index.clear();
        self.index_rebuild = None;
        self.throttle.reset();
        self.bulk = Some(self.field.bulk_load(
            entries,
            self.settings.bulk_batch_size,
            self.settings.frame_budget,
        ));
    }

    /// Loads the configured slot from the store, if there is one.
    pub fn load_from_store(&mut self) -> Result<bool, StoreError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Some(map) = store.load(&self.settings.slot)? else {
            return Ok(false);
        };
        info!(slot = %self.settings.slot, blocks = map.len(), "loading map");
        self.start_bulk_load(map.blocks, false);
        Ok(true)
    }

    /// Removes every block, mesh and queued build.
    pub fn clear(&mut self) {
        self.bulk = None;
        self.save_after_load = false;
        self.index_rebuild = None;
        self.reset_render_state();
        self.field.clear();
        self.index.clear();
        self.save_pending = true;
        info!("terrain cleared");
    }

    /// Rebuilds the spatial index from the field, subject to the throttle.
    pub fn rebuild_index(&mut self) -> ThrottleDecision {
        let decision = self.throttle.request(self.clock.now());
        match decision {
            ThrottleDecision::RunNow => self.start_index_rebuild(),
            _ => debug!(?decision, "index rebuild throttled"),
        }
        decision
    }

    /// Swaps in new settings. A chunk size change reloads the map; a mesh
    /// toggle change rebuilds every mesh.
    pub fn update_settings(&mut self, mut settings: TerrainSettings) {
        settings.visibility.chunk_size = settings.chunk_size;
        let resized = settings.chunk_size != self.settings.chunk_size;
        let toggles_changed = settings.toggles != self.settings.toggles;

        self.raycast.set_options(settings.raycast);
        self.throttle = RebuildThrottle::new(settings.rebuild_interval);
        for (&key, render) in &mut self.renders {
            if render.attached {
                self.scene.detach(key);
                render.attached = false;
            }
        }
        self.visibility = VisibilityTracker::new(settings.visibility.clone());
        self.settings = settings;

        if resized {
            let mut blocks: Vec<_> = self.field.iter().collect();
            let save_after = match self.bulk.take() {
                Some(load) => {
                    blocks.extend(load.into_remaining());
                    self.save_after_load
                }
                None => false,
            };
            debug!(size = self.settings.chunk_size, blocks = blocks.len(), "repartitioning field");
            self.field = VoxelField::new(self.settings.chunk_size);
            self.index = ChunkIndex::new(self.settings.chunk_size);
            self.start_bulk_load(blocks, save_after);
        } else if toggles_changed {
            let now = self.clock.now();
            for (&key, render) in &mut self.renders {
                render.stale = true;
                self.scheduler.enqueue(key, EDIT_PRIORITY, now);
            }
        }
    }

    fn start_index_rebuild(&mut self) {
        let priority = self.camera_chunks();
        self.index_rebuild =
            match self
                .index
                .rebuild_from(&self.field, &self.settings.index, &priority)
            {
                RebuildOutcome::Completed => None,
                RebuildOutcome::Batched(task) => Some(task),
            };
    }

    fn finish_bulk_load(&mut self, camera: &CameraSnapshot) {
        if std::mem::take(&mut self.save_after_load) {
            self.save_pending = true;
        }
        self.throttle.request(self.clock.now());
        self.start_index_rebuild();

        let now = self.clock.now();
        let keys: Vec<ChunkKey> = self.field.chunk_keys().collect();
        for key in keys {
            let priority = self.distance_priority(key, camera.position);
            self.scheduler.enqueue(key, priority, now);
        }
        self.visibility.invalidate();
    }

    fn reset_render_state(&mut self) {
        for (key, render) in self.renders.drain() {
            if render.attached {
                self.scene.detach(key);
            }
            render.mesh.dispose();
        }
        self.scheduler.clear();
        self.visibility.clear();
        self.atlas_waiting.clear();
        self.gesture_exclude.clear();
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Advances every pipeline stage by one bounded step.
    pub fn frame(&mut self, camera: &CameraSnapshot) -> FrameReport {
        let clock_handle = Arc::clone(&self.clock);
        let clock: &dyn Clock = clock_handle.as_ref();
        let now = clock.now();
        let mut report = FrameReport::default();
        self.last_camera = Some(*camera);

        if let Some(load) = &mut self.bulk {
            let (status, step) = load.step(&mut self.field, clock);
            report.bulk_step = Some(step);
            if !status.is_done() {
                return report;
            }
            self.bulk = None;
            self.finish_bulk_load(camera);
        } else if let Some(rebuild) = &mut self.index_rebuild {
            let (status, step) = rebuild.step(&mut self.index, clock);
            report.index_step = Some(step);
            if status.is_done() {
                self.index_rebuild = None;
            }
        }
        if self.throttle.poll(now) {
            self.start_index_rebuild();
        }

        if self.atlas.is_ready() && !self.atlas_waiting.is_empty() {
            let waiting: Vec<ChunkKey> = self.atlas_waiting.drain().collect();
            debug!(chunks = waiting.len(), "atlas ready; requeueing chunks");
            for key in waiting {
                let priority = self.distance_priority(key, camera.position);
                self.scheduler.enqueue(key, priority, now);
            }
        }

        self.run_visibility(clock, camera, &mut report);

        let budget = self.settings.frame_budget;
        let max_tasks = self.settings.max_tasks_per_frame;
        let mut scheduler = std::mem::take(&mut self.scheduler);
        let slice = scheduler.process_slice(clock, budget, max_tasks, |task| {
            self.rebuild_chunk(task.key).map(|_| ())
        });
        self.scheduler = scheduler;
        for &key in &slice.failed_keys {
            let priority = self.distance_priority(key, camera.position);
            self.scheduler.enqueue(key, priority, now);
        }
        report.slice = slice;

        if self.save_pending {
            report.saved = self.flush_save();
        }
        report
    }

    fn run_visibility(
        &mut self,
        clock: &dyn Clock,
        camera: &CameraSnapshot,
        report: &mut FrameReport,
    ) {
        let now = clock.now();
        let moving = self.motion.observe(now, camera);
        let chunks = TerrainChunks {
            field: &self.field,
            renders: &self.renders,
        };
        let occlusion = IndexOcclusion {
            index: &self.index,
            catalog: &self.catalog,
            threshold: self.settings.occlusion_threshold,
        };
        let index_ready = self.bulk.is_none() && self.index_rebuild.is_none();
        let ctx = VisibilityContext {
            camera,
            camera_moving: moving,
            chunks: &chunks,
            occlusion: index_ready.then_some(&occlusion as &dyn OcclusionQuery),
        };
        let Some(update) = self.visibility.update(clock, &ctx) else {
            return;
        };

        for &key in &update.hide {
            if let Some(render) = self.renders.get_mut(&key)
                && render.attached
            {
                self.scene.detach(key);
                render.attached = false;
            }
        }
        for &key in &update.show {
            if let Some(render) = self.renders.get_mut(&key)
                && !render.attached
            {
                self.scene.attach(key, &render.mesh);
                render.attached = true;
            }
        }
        for request in &update.build {
            self.scheduler.enqueue(request.key, request.priority, now);
        }
        report.shown = update.show.len();
        report.hidden = update.hide.len();
        report.requested = update.build.len();
    }

    /// Rebuilds one chunk's mesh if its blocks changed since the last build.
    ///
    /// An empty chunk is removed together with its mesh. On error the chunk
    /// stays dirty and keeps its previous mesh.
    pub fn rebuild_chunk(&mut self, key: ChunkKey) -> Result<ChunkBuild, MeshBuildError> {
        let Some(record) = self.field.chunk(key) else {
            self.drop_render(key);
            return Ok(ChunkBuild::Removed);
        };
        if record.is_empty() {
            self.field.remove_chunk_if_empty(key);
            self.drop_render(key);
            debug!(chunk = %key, "empty chunk removed");
            return Ok(ChunkBuild::Removed);
        }
        let version = record.version();
        if !record.is_dirty()
            && self
                .renders
                .get(&key)
                .is_some_and(|r| r.built_version == version && !r.stale)
        {
            return Ok(ChunkBuild::Unchanged);
        }
        let Some(snapshot) = self.field.snapshot_chunk(key) else {
            return Ok(ChunkBuild::Removed);
        };

        let output = self.builder.build(
            &snapshot,
            &self.catalog,
            &self.atlas,
            self.settings.toggles,
        )?;
        if let Some(chunk) = self.field.chunk_mut(key) {
            chunk.clear_dirty(snapshot.version());
        }
        if output.pending_atlas {
            self.atlas_waiting.insert(key);
        } else {
            self.atlas_waiting.remove(&key);
        }

        let tier = output.mesh_set.tier();
        let attach = self.visibility.is_shown(key);
        if let Some(old) = self.renders.remove(&key) {
            if old.attached && !attach {
                self.scene.detach(key);
            }
            old.mesh.dispose();
        }
        if attach {
            self.scene.attach(key, &output.mesh_set);
        }
        self.renders.insert(
            key,
            ChunkRender {
                mesh: output.mesh_set,
                built_version: snapshot.version(),
                stale: output.pending_atlas,
                attached: attach,
            },
        );
        Ok(ChunkBuild::Built(tier))
    }

    fn drop_render(&mut self, key: ChunkKey) {
        self.atlas_waiting.remove(&key);
        if let Some(old) = self.renders.remove(&key) {
            if old.attached {
                self.scene.detach(key);
            }
            let disposed = old.mesh.dispose();
            trace!(chunk = %key, buffers = disposed.buffers_freed, "chunk mesh disposed");
        }
    }

    fn flush_save(&mut self) -> bool {
        self.save_pending = false;
        let Some(store) = self.store.as_mut() else {
            return false;
        };
        let map = BlockMap::from_field(&self.field);
        match store.save(&self.settings.slot, &map) {
            Ok(()) => {
                debug!(slot = %self.settings.slot, blocks = map.len(), "map saved");
                true
            }
            Err(e) => {
                warn!(slot = %self.settings.slot, error = %e, "saving map failed");
                false
            }
        }
    }

    fn distance_priority(&self, key: ChunkKey, viewer: Vec3) -> f64 {
        let d = f64::from((key.center(self.settings.chunk_size) - viewer).length());
        d * d
    }

    /// The camera's chunk and its 26 neighbours.
    fn camera_chunks(&self) -> Vec<ChunkKey> {
        let Some(camera) = &self.last_camera else {
            return Vec::new();
        };
        let center = BlockPos::containing(camera.position).chunk(self.settings.chunk_size);
        std::iter::once(center)
            .chain(NEIGHBOR_OFFSETS.iter().map(|o| center.offset(o.x, o.y, o.z)))
            .collect()
    }
}
