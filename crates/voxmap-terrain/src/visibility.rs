//! Per-frame chunk visibility: frustum and occlusion tests smoothed by a
//! short visibility history, neighbour expansion, speculative prefetch and
//! delayed hiding.

use std::collections::VecDeque;
use std::time::Duration;

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;
use voxmap_core::{Aabb, BlockPos, ChunkKey, Clock, NEIGHBOR_OFFSETS};
use voxmap_spatial::ChunkIndex;
use voxmap_voxel::BlockTypeCatalog;

use crate::camera::CameraSnapshot;

/// Tunables for [`VisibilityTracker`].
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilitySettings {
    pub chunk_size: i32,
    pub view_distance: f32,
    /// Length of the per-frame visibility history.
    pub history_frames: usize,
    /// How long a chunk must stay unrequested before it is hidden.
    pub hide_delay: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Updates slower than this back the interval off.
    pub slow_update: Duration,
    pub backoff_factor: f32,
    pub recover_factor: f32,
    pub adjacency_memo_cap: usize,
    /// Minimum `forward · to_chunk` for a prefetch.
    pub prefetch_dot: f32,
    pub adjacent_penalty: f32,
    pub prefetch_penalty: f32,
    pub max_builds_per_update: usize,
    pub occlusion_enabled: bool,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            view_distance: 256.0,
            history_frames: 15,
            hide_delay: Duration::from_millis(500),
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(500),
            slow_update: Duration::from_millis(16),
            backoff_factor: 1.1,
            recover_factor: 0.95,
            adjacency_memo_cap: 10_000,
            prefetch_dot: 0.3,
            adjacent_penalty: 5.0,
            prefetch_penalty: 10.0,
            max_builds_per_update: 5,
            occlusion_enabled: true,
        }
    }
}

/// The set of chunks the tracker may consider.
pub trait ChunkSource {
    fn chunk_keys(&self) -> Vec<ChunkKey>;
    fn has_mesh(&self, key: ChunkKey) -> bool;
}

/// Whole-chunk occlusion test.
pub trait OcclusionQuery {
    fn is_occluded(&self, key: ChunkKey, viewer: Vec3) -> bool;
}

/// [`OcclusionQuery`] backed by the spatial index's sample-ray heuristic.
pub struct IndexOcclusion<'a> {
    pub index: &'a ChunkIndex,
    pub catalog: &'a BlockTypeCatalog,
    pub threshold: f32,
}

impl OcclusionQuery for IndexOcclusion<'_> {
    fn is_occluded(&self, key: ChunkKey, viewer: Vec3) -> bool {
        self.index
            .is_chunk_occluded(key, viewer, self.threshold, self.catalog)
    }
}

/// Inputs for one [`VisibilityTracker::update`].
pub struct VisibilityContext<'a> {
    pub camera: &'a CameraSnapshot,
    pub camera_moving: bool,
    pub chunks: &'a dyn ChunkSource,
    pub occlusion: Option<&'a dyn OcclusionQuery>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildRequest {
    pub key: ChunkKey,
    pub priority: f64,
}

/// Changes decided by one update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibilityUpdate {
    /// Chunks that became shown.
    pub show: Vec<ChunkKey>,
    /// Chunks that became hidden.
    pub hide: Vec<ChunkKey>,
    /// Meshes to build, nearest first.
    pub build: Vec<BuildRequest>,
}

/// Decides which chunks are shown each frame.
///
/// A chunk is *verified* when its bounds intersect the frustum and it is not
/// occluded. Verified chunks are recorded in a ring of the last
/// `history_frames` updates; a chunk that fails the test but was verified in
/// more than half of that history stays shown. Candidates next to a verified
/// chunk are shown as well. Everything else in range is hidden only after it
/// has gone unrequested for `hide_delay`; chunks out of range are hidden at
/// once.
#[derive(Debug)]
pub struct VisibilityTracker {
    settings: VisibilitySettings,
    history: VecDeque<FxHashSet<ChunkKey>>,
    hidden_since: FxHashMap<ChunkKey, Duration>,
    shown: FxHashSet<ChunkKey>,
    adjacency: FxHashMap<ChunkKey, [ChunkKey; 26]>,
    interval: Duration,
    last_update: Option<Duration>,
}

struct Candidate {
    key: ChunkKey,
    distance: f32,
    to_chunk: Vec3,
}

impl VisibilityTracker {
    pub fn new(settings: VisibilitySettings) -> Self {
        let interval = settings.min_interval;
        Self {
            history: VecDeque::with_capacity(settings.history_frames.max(1)),
            settings,
            hidden_since: FxHashMap::default(),
            shown: FxHashSet::default(),
            adjacency: FxHashMap::default(),
            interval,
            last_update: None,
        }
    }

    pub fn settings(&self) -> &VisibilitySettings {
        &self.settings
    }

    /// Current throttle interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_shown(&self, key: ChunkKey) -> bool {
        self.shown.contains(&key)
    }

    pub fn shown(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.shown.iter().copied()
    }

    /// Fraction of the history in which `key` was verified, in `[0, 1]`.
    pub fn stability(&self, key: ChunkKey) -> f32 {
        let n = self.settings.history_frames.max(1);
        self.history_count(key) as f32 / n as f32
    }

    pub fn adjacency_memo_len(&self) -> usize {
        self.adjacency.len()
    }

    /// Lets the next [`VisibilityTracker::update`] run regardless of the
    /// throttle.
    pub fn invalidate(&mut self) {
        self.last_update = None;
    }

    /// Forgets all history, timers and shown state.
    pub fn clear(&mut self) {
        self.history.clear();
        self.hidden_since.clear();
        self.shown.clear();
        self.adjacency.clear();
        self.interval = self.settings.min_interval;
        self.last_update = None;
    }

    /// Runs one visibility pass, or returns `None` if called again within the
    /// current interval.
    pub fn update(
        &mut self,
        clock: &dyn Clock,
        ctx: &VisibilityContext<'_>,
    ) -> Option<VisibilityUpdate> {
        let start = clock.now();
        if let Some(last) = self.last_update
            && start.saturating_sub(last) < self.interval
        {
            return None;
        }
        self.last_update = Some(start);

        if self.adjacency.len() > self.settings.adjacency_memo_cap {
            self.adjacency.clear();
        }

        let result = self.run_passes(start, ctx);

        let elapsed = clock.now().saturating_sub(start);
        self.adapt_interval(elapsed);
        trace!(
            shown = self.shown.len(),
            show = result.show.len(),
            hide = result.hide.len(),
            build = result.build.len(),
            ?elapsed,
            "visibility updated"
        );
        Some(result)
    }

    fn run_passes(&mut self, now: Duration, ctx: &VisibilityContext<'_>) -> VisibilityUpdate {
        let s = &self.settings;
        let size = s.chunk_size;
        let camera = ctx.camera;
        let frustum = camera.frustum();
        let candidates = self.candidates(camera.position, ctx.chunks);
        let candidate_keys: FxHashSet<ChunkKey> = candidates.iter().map(|c| c.key).collect();

        let mut verified: FxHashSet<ChunkKey> = FxHashSet::default();
        let mut shown_now: FxHashSet<ChunkKey> = FxHashSet::default();
        let mut requests: Vec<(ChunkKey, f32)> = Vec::new();
        let mut failing: Vec<&Candidate> = Vec::new();

        // Pass A: frustum and occlusion.
        for candidate in &candidates {
            let in_frustum = frustum.is_visible(&chunk_bounds(candidate.key, size));
            let occluded = in_frustum
                && s.occlusion_enabled
                && candidate.distance <= s.view_distance
                && ctx
                    .occlusion
                    .is_some_and(|occ| occ.is_occluded(candidate.key, camera.position));
            if in_frustum && !occluded {
                verified.insert(candidate.key);
                shown_now.insert(candidate.key);
                self.hidden_since.remove(&candidate.key);
                requests.push((candidate.key, candidate.distance));
            } else {
                failing.push(candidate);
            }
        }

        // Hysteresis against the history before this frame is recorded.
        let n = s.history_frames.max(1);
        let mut remaining: Vec<&Candidate> = Vec::new();
        for candidate in failing {
            if self.history_count(candidate.key) * 2 > n {
                shown_now.insert(candidate.key);
                requests.push((candidate.key, candidate.distance));
            } else {
                remaining.push(candidate);
            }
        }

        // Pass B: neighbours of verified chunks, then prefetch, then hiding.
        let mut hide = Vec::new();
        for candidate in remaining {
            let neighbors = neighbors_of(&mut self.adjacency, candidate.key);
            if neighbors.iter().any(|k| verified.contains(k)) {
                shown_now.insert(candidate.key);
                self.hidden_since.remove(&candidate.key);
                requests.push((candidate.key, candidate.distance + s.adjacent_penalty));
                continue;
            }

            let ahead = candidate
                .to_chunk
                .try_normalize()
                .is_some_and(|dir| camera.forward.dot(dir) > s.prefetch_dot);
            if candidate.distance <= s.view_distance && ctx.camera_moving && ahead {
                if self.shown.contains(&candidate.key) {
                    shown_now.insert(candidate.key);
                }
                requests.push((candidate.key, candidate.distance + s.prefetch_penalty));
                continue;
            }

            if self.shown.contains(&candidate.key) {
                let since = *self.hidden_since.entry(candidate.key).or_insert(now);
                if now.saturating_sub(since) > s.hide_delay {
                    self.hidden_since.remove(&candidate.key);
                    hide.push(candidate.key);
                } else {
                    shown_now.insert(candidate.key);
                }
            }
        }

        // Out of range: hide immediately.
        for &key in &self.shown {
            if !candidate_keys.contains(&key) {
                hide.push(key);
            }
        }
        self.hidden_since.retain(|key, _| candidate_keys.contains(key));

        let mut show: Vec<ChunkKey> = shown_now
            .iter()
            .filter(|k| !self.shown.contains(k))
            .copied()
            .collect();
        show.sort_unstable();
        hide.sort_unstable();

        let mut build: Vec<BuildRequest> = requests
            .into_iter()
            .filter(|&(key, _)| !ctx.chunks.has_mesh(key))
            .map(|(key, d)| BuildRequest {
                key,
                priority: f64::from(d) * f64::from(d),
            })
            .collect();
        build.sort_by(|a, b| a.priority.total_cmp(&b.priority));
        build.truncate(s.max_builds_per_update);

        self.record_frame(verified);
        self.shown = shown_now;

        VisibilityUpdate { show, hide, build }
    }

    /// Chunks within `ceil(view_distance / S) + 1` chunks of the camera.
    fn candidates(&self, position: Vec3, chunks: &dyn ChunkSource) -> Vec<Candidate> {
        let size = self.settings.chunk_size;
        let radius = (self.settings.view_distance / size as f32).ceil() as i32 + 1;
        let reach = (radius * size) as f32;
        let camera_chunk = BlockPos::containing(position).chunk(size);

        let mut out: Vec<Candidate> = chunks
            .chunk_keys()
            .into_iter()
            .filter(|k| {
                (k.x - camera_chunk.x).abs() <= radius
                    && (k.y - camera_chunk.y).abs() <= radius
                    && (k.z - camera_chunk.z).abs() <= radius
            })
            .filter_map(|key| {
                let to_chunk = key.center(size) - position;
                (to_chunk.length_squared() <= reach * reach).then(|| Candidate {
                    key,
                    distance: to_chunk.length(),
                    to_chunk,
                })
            })
            .collect();
        out.sort_by_key(|c| c.key);
        out
    }

    fn history_count(&self, key: ChunkKey) -> usize {
        self.history.iter().filter(|frame| frame.contains(&key)).count()
    }

    fn record_frame(&mut self, verified: FxHashSet<ChunkKey>) {
        let n = self.settings.history_frames.max(1);
        while self.history.len() >= n {
            self.history.pop_front();
        }
        self.history.push_back(verified);
    }

    fn adapt_interval(&mut self, elapsed: Duration) {
        let s = &self.settings;
        self.interval = if elapsed > s.slow_update {
            self.interval.mul_f32(s.backoff_factor).min(s.max_interval)
        } else {
            self.interval.mul_f32(s.recover_factor).max(s.min_interval)
        };
    }
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new(VisibilitySettings::default())
    }
}

fn chunk_bounds(key: ChunkKey, size: i32) -> Aabb {
    let min = key.min_block(size).min_corner();
    Aabb::new(min, min + Vec3::splat(size as f32))
}

fn neighbors_of(memo: &mut FxHashMap<ChunkKey, [ChunkKey; 26]>, key: ChunkKey) -> [ChunkKey; 26] {
    *memo.entry(key).or_insert_with(|| {
        NEIGHBOR_OFFSETS.map(|o| key.offset(o.x, o.y, o.z))
    })
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_4;

    use voxmap_core::ManualClock;

    use super::*;

    struct FakeChunks {
        keys: Vec<ChunkKey>,
        meshed: FxHashSet<ChunkKey>,
    }

    impl FakeChunks {
        fn new(keys: &[ChunkKey]) -> Self {
            Self {
                keys: keys.to_vec(),
                meshed: FxHashSet::default(),
            }
        }
    }

    impl ChunkSource for FakeChunks {
        fn chunk_keys(&self) -> Vec<ChunkKey> {
            self.keys.clone()
        }

        fn has_mesh(&self, key: ChunkKey) -> bool {
            self.meshed.contains(&key)
        }
    }

    struct Occluded(FxHashSet<ChunkKey>);

    impl OcclusionQuery for Occluded {
        fn is_occluded(&self, key: ChunkKey, _viewer: Vec3) -> bool {
            self.0.contains(&key)
        }
    }

    fn settings() -> VisibilitySettings {
        VisibilitySettings {
            view_distance: 64.0,
            ..VisibilitySettings::default()
        }
    }

    /// Camera at (8, 8, 40) looking down -z at chunk (0, 0, 0).
    fn camera() -> CameraSnapshot {
        let position = Vec3::new(8.0, 8.0, 40.0);
        CameraSnapshot::look_at(position, position + Vec3::NEG_Z, FRAC_PI_4, 1.0, 0.1, 500.0)
    }

    const ORIGIN: ChunkKey = ChunkKey::new(0, 0, 0);

    fn run(
        tracker: &mut VisibilityTracker,
        clock: &ManualClock,
        camera: &CameraSnapshot,
        chunks: &FakeChunks,
        occlusion: Option<&dyn OcclusionQuery>,
        moving: bool,
    ) -> VisibilityUpdate {
        clock.advance(Duration::from_millis(100));
        let ctx = VisibilityContext {
            camera,
            camera_moving: moving,
            chunks,
            occlusion,
        };
        tracker.update(clock, &ctx).expect("update should not be throttled")
    }

    #[test]
    fn test_visible_chunk_is_shown_and_requested() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let chunks = FakeChunks::new(&[ORIGIN]);
        let update = run(&mut tracker, &clock, &camera(), &chunks, None, false);

        assert_eq!(update.show, vec![ORIGIN]);
        assert_eq!(update.build.len(), 1);
        assert_eq!(update.build[0].key, ORIGIN);
        assert!((update.build[0].priority - 32.0 * 32.0).abs() < 1e-3);
        assert!(tracker.is_shown(ORIGIN));
    }

    #[test]
    fn test_occlusion_is_skipped_beyond_view_distance() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        // Centre 80 units ahead: past the 64 view distance, inside the 80 reach.
        let far = ChunkKey::new(0, 0, -3);
        let chunks = FakeChunks::new(&[ORIGIN, far]);
        let occluded = Occluded([ORIGIN, far].into_iter().collect());
        let update = run(&mut tracker, &clock, &camera(), &chunks, Some(&occluded), false);

        assert!(tracker.is_shown(far));
        assert!(!tracker.is_shown(ORIGIN));
        assert_eq!(update.show, vec![far]);
        assert!(update.build.iter().any(|r| r.key == far));
    }

    #[test]
    fn test_meshed_chunks_are_not_requested() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let mut chunks = FakeChunks::new(&[ORIGIN]);
        chunks.meshed.insert(ORIGIN);
        let update = run(&mut tracker, &clock, &camera(), &chunks, None, false);
        assert!(update.build.is_empty());
        assert_eq!(update.show, vec![ORIGIN]);
    }

    #[test]
    fn test_updates_are_throttled() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let chunks = FakeChunks::new(&[ORIGIN]);
        let cam = camera();
        let ctx = VisibilityContext {
            camera: &cam,
            camera_moving: false,
            chunks: &chunks,
            occlusion: None,
        };
        assert!(tracker.update(&clock, &ctx).is_some());
        clock.advance(Duration::from_millis(50));
        assert!(tracker.update(&clock, &ctx).is_none());
        clock.advance(Duration::from_millis(50));
        assert!(tracker.update(&clock, &ctx).is_some());

        tracker.invalidate();
        assert!(tracker.update(&clock, &ctx).is_some());
    }

    #[test]
    fn test_slow_updates_back_off_and_recover() {
        let clock = ManualClock::auto_advancing(Duration::from_millis(20));
        let mut tracker = VisibilityTracker::new(settings());
        let chunks = FakeChunks::new(&[ORIGIN]);
        let cam = camera();
        let ctx = VisibilityContext {
            camera: &cam,
            camera_moving: false,
            chunks: &chunks,
            occlusion: None,
        };
        tracker.update(&clock, &ctx);
        assert_eq!(tracker.interval(), Duration::from_millis(100).mul_f32(1.1));

        let fast = ManualClock::new();
        fast.set(Duration::from_secs(10));
        tracker.update(&fast, &ctx);
        assert!(tracker.interval() < Duration::from_millis(110));
        assert!(tracker.interval() >= Duration::from_millis(100));
    }

    #[test]
    fn test_interval_is_capped() {
        let clock = ManualClock::auto_advancing(Duration::from_millis(40));
        let mut tracker = VisibilityTracker::new(settings());
        let chunks = FakeChunks::new(&[]);
        let cam = camera();
        let ctx = VisibilityContext {
            camera: &cam,
            camera_moving: false,
            chunks: &chunks,
            occlusion: None,
        };
        for _ in 0..40 {
            tracker.invalidate();
            tracker.update(&clock, &ctx);
        }
        assert_eq!(tracker.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_stable_chunk_survives_failed_test() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let mut chunks = FakeChunks::new(&[ORIGIN]);
        chunks.meshed.insert(ORIGIN);
        let cam = camera();
        let occluded = Occluded([ORIGIN].into_iter().collect());

        for _ in 0..8 {
            run(&mut tracker, &clock, &cam, &chunks, None, false);
        }
        for _ in 0..7 {
            let update = run(&mut tracker, &clock, &cam, &chunks, Some(&occluded), false);
            assert!(update.hide.is_empty());
        }
        // Verified in 8 of the last 15 frames.
        assert!((tracker.stability(ORIGIN) - 8.0 / 15.0).abs() < 1e-6);
        let update = run(&mut tracker, &clock, &cam, &chunks, Some(&occluded), false);
        assert!(update.hide.is_empty());
        assert!(tracker.is_shown(ORIGIN));
        assert!((tracker.stability(ORIGIN) - 7.0 / 15.0).abs() < 1e-6);

        // Below half now; the hide delay still holds it for this frame.
        let update = run(&mut tracker, &clock, &cam, &chunks, Some(&occluded), false);
        assert!(update.hide.is_empty());
    }

    #[test]
    fn test_hide_is_debounced() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(VisibilitySettings {
            history_frames: 1,
            ..settings()
        });
        let mut chunks = FakeChunks::new(&[ORIGIN]);
        chunks.meshed.insert(ORIGIN);
        let cam = camera();
        let occluded = Occluded([ORIGIN].into_iter().collect());

        run(&mut tracker, &clock, &cam, &chunks, None, false);
        // Kept by the one-frame history.
        run(&mut tracker, &clock, &cam, &chunks, Some(&occluded), false);
        // Debounce window opens here and lasts 500ms.
        for _ in 0..6 {
            let update = run(&mut tracker, &clock, &cam, &chunks, Some(&occluded), false);
            assert!(update.hide.is_empty());
            assert!(tracker.is_shown(ORIGIN));
        }
        let update = run(&mut tracker, &clock, &cam, &chunks, Some(&occluded), false);
        assert_eq!(update.hide, vec![ORIGIN]);
        assert!(!tracker.is_shown(ORIGIN));
    }

    #[test]
    fn test_out_of_range_chunks_hide_immediately() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let chunks = FakeChunks::new(&[ORIGIN]);
        run(&mut tracker, &clock, &camera(), &chunks, None, false);

        let far = CameraSnapshot::look_at(
            Vec3::new(1000.0, 8.0, 40.0),
            Vec3::new(1000.0, 8.0, 0.0),
            FRAC_PI_4,
            1.0,
            0.1,
            500.0,
        );
        let update = run(&mut tracker, &clock, &far, &chunks, None, false);
        assert_eq!(update.hide, vec![ORIGIN]);
    }

    #[test]
    fn test_neighbours_of_verified_chunks_are_shown_with_penalty() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let side = ChunkKey::new(1, 0, 0);
        let chunks = FakeChunks::new(&[ORIGIN, side]);
        let occluded = Occluded([side].into_iter().collect());
        let update = run(&mut tracker, &clock, &camera(), &chunks, Some(&occluded), false);

        assert_eq!(update.show, vec![ORIGIN, side]);
        let side_distance = (side.center(16) - camera().position).length() as f64;
        let request = update.build.iter().find(|r| r.key == side).unwrap();
        assert!((request.priority - (side_distance + 5.0).powi(2)).abs() < 1e-2);
        assert_eq!(tracker.stability(side), 0.0);
    }

    #[test]
    fn test_prefetch_only_while_moving() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        // Ahead of the camera but outside the 45 degree frustum.
        let off_axis = ChunkKey::new(3, 0, 0);
        let chunks = FakeChunks::new(&[off_axis]);

        let still = run(&mut tracker, &clock, &camera(), &chunks, None, false);
        assert!(still.build.is_empty());
        assert!(still.show.is_empty());

        let moving = run(&mut tracker, &clock, &camera(), &chunks, None, true);
        assert!(moving.show.is_empty());
        assert_eq!(moving.build.len(), 1);
        let d = (off_axis.center(16) - camera().position).length() as f64;
        assert!((moving.build[0].priority - (d + 10.0).powi(2)).abs() < 1e-2);
    }

    #[test]
    fn test_build_requests_are_capped_nearest_first() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let keys: Vec<ChunkKey> = (0..4)
            .flat_map(|z| (-1..=1).map(move |x| ChunkKey::new(x, 0, -z)))
            .collect();
        let chunks = FakeChunks::new(&keys);
        let update = run(&mut tracker, &clock, &camera(), &chunks, None, false);

        assert_eq!(update.build.len(), 5);
        assert_eq!(update.build[0].key, ORIGIN);
        assert!(update.build.windows(2).all(|w| w[0].priority <= w[1].priority));
    }

    #[test]
    fn test_adjacency_memo_is_bounded() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(VisibilitySettings {
            adjacency_memo_cap: 2,
            ..settings()
        });
        // Behind the camera: every key falls through to the adjacency check.
        let keys: Vec<ChunkKey> = (0..4).map(|x| ChunkKey::new(x - 1, 0, 4)).collect();
        let chunks = FakeChunks::new(&keys);
        run(&mut tracker, &clock, &camera(), &chunks, None, false);
        assert_eq!(tracker.adjacency_memo_len(), 4);

        let fewer = FakeChunks::new(&keys[..1]);
        run(&mut tracker, &clock, &camera(), &fewer, None, false);
        assert_eq!(tracker.adjacency_memo_len(), 1);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let clock = ManualClock::new();
        let mut tracker = VisibilityTracker::new(settings());
        let chunks = FakeChunks::new(&[ORIGIN]);
        run(&mut tracker, &clock, &camera(), &chunks, None, false);
        tracker.clear();
        assert!(!tracker.is_shown(ORIGIN));
        assert_eq!(tracker.stability(ORIGIN), 0.0);
    }
}
