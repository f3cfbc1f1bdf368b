// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frustum culling, LOD selection, sort-key generation and gather.
//!
//! Each frustum goes through three strictly ordered stages:
//!
//! 1. **cull**: plane test every mesh box, build sort keys for the
//!    survivors, publish the visible count;
//! 2. **sort**: descending sort-key order;
//! 3. **gather**: fill the render list's arrays, publish the data.
//!
//! Across frustums there is no ordering. When the pass is threaded the
//! frustum index range is partitioned over the workers: every range task runs
//! the cull stage of its frustums and chains each frustum's sort as a follow-up
//! task, which in turn chains the gather. Per-frustum state travels by value
//! from task to task and comes back to the dispatcher over a channel.

mod job;
mod lod;
mod shadow_views;

pub use lod::{projected_area, LodPolicy, FULL_SCREEN_AREA};
pub use shadow_views::ShadowViews;

use std::sync::Arc;
use std::time::Duration;

use vantage_core::task::{partition_work, CountingSignal, PoolHandle, TaskPriority};
use vantage_data::render::{BoundingVolumes, FrustumKind, FrustumRenderList, SceneView, ViewFrustum};

use crate::config::CullingConfig;
use job::{CullContext, FrustumJob};

/// How long [`PendingCull::finish`] blocks on the result channel before it
/// looks at the task queue again.
const HELP_INTERVAL: Duration = Duration::from_millis(1);

/// Figures of one cull pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Frustums processed.
    pub frustums: usize,
    /// Mesh boxes tested per frustum.
    pub mesh_boxes: usize,
    /// Visible draws summed over all frustums.
    pub visible: usize,
    /// Largest visible count of a single frustum.
    pub max_visible: usize,
    /// Whether worker threads took part.
    pub threaded: bool,
    /// Frustums whose work was lost (a task panicked or the pool shut down)
    /// and that were published empty.
    pub lost: usize,
}

#[derive(Debug)]
struct FrustumSignals {
    kind: FrustumKind,
    shadow_index: Option<u32>,
    count_ready: Arc<CountingSignal>,
    data_ready: Arc<CountingSignal>,
}

/// Culls the shared mesh-box array against every frustum of a frame.
#[derive(Debug, Clone)]
pub struct FrustumCullLane {
    threading_threshold: usize,
    min_frustums_per_range: usize,
    lod: LodPolicy,
    epsilon: f32,
}

impl FrustumCullLane {
    /// Creates the lane from `config`.
    pub fn new(config: &CullingConfig) -> Self {
        Self {
            threading_threshold: config.cull_threading_threshold,
            min_frustums_per_range: config.min_frustums_per_range,
            lod: LodPolicy::from_config(config),
            epsilon: config.cull_epsilon,
        }
    }

    /// Whether a pass over `frustums` frustums and `mesh_boxes` boxes uses the
    /// workers. Small passes run on the calling thread.
    pub fn should_thread(&self, frustums: usize, mesh_boxes: usize, workers: usize) -> bool {
        workers > 0 && frustums >= 2 && mesh_boxes >= self.threading_threshold
    }

    /// Starts a cull pass and returns without waiting for it.
    ///
    /// `lists` are reused for the frustums of the same index and new lists are
    /// created for the rest. Their signals are re-armed here, so the returned
    /// [`PendingCull`] already exposes the ones this pass will fire.
    pub fn dispatch(
        &self,
        frustums: &[ViewFrustum],
        lists: Vec<FrustumRenderList>,
        volumes: &BoundingVolumes,
        pool: &PoolHandle,
    ) -> PendingCull {
        let mut lists = lists.into_iter();
        let jobs: Vec<FrustumJob> = frustums
            .iter()
            .enumerate()
            .map(|(index, frustum)| {
                let list = lists
                    .next()
                    .unwrap_or_else(|| FrustumRenderList::new(frustum.kind, frustum.shadow_index));
                FrustumJob::new(index, *frustum, list)
            })
            .collect();

        let signals = jobs
            .iter()
            .map(|job| FrustumSignals {
                kind: job.frustum.kind,
                shadow_index: job.frustum.shadow_index,
                count_ready: Arc::clone(job.list.count_ready()),
                data_ready: Arc::clone(job.list.data_ready()),
            })
            .collect();

        let ctx = Arc::new(CullContext {
            mesh_boxes: Arc::clone(&volumes.mesh_boxes),
            transforms: Arc::clone(&volumes.object_transforms),
            lod: self.lod,
            epsilon: self.epsilon,
        });

        let (sender, receiver) = flume::unbounded();
        let workers = pool.thread_count();
        let threaded = self.should_thread(jobs.len(), volumes.mesh_box_count(), workers);

        let mut inline_jobs = Vec::new();
        let mut submitted = 0;
        if threaded {
            let ranges = partition_work(jobs.len(), workers, self.min_frustums_per_range);
            let mut jobs = jobs.into_iter();
            for (n, range) in ranges.into_iter().enumerate() {
                let chunk: Vec<FrustumJob> = jobs.by_ref().take(range.len()).collect();
                if n == 0 {
                    inline_jobs = chunk;
                } else {
                    submitted += chunk.len();
                    submit_range(chunk, &ctx, pool, &sender);
                }
            }
        } else {
            inline_jobs = jobs;
        }

        PendingCull {
            ctx,
            pool: pool.clone(),
            inline_jobs,
            results: receiver,
            signals,
            submitted,
            threaded,
        }
    }

    /// Culls every frustum of `view` and stores the filled lists back in it.
    pub fn run(&self, view: &mut SceneView, volumes: &BoundingVolumes, pool: &PoolHandle) -> CullStats {
        let lists = view.take_lists();
        let (lists, stats) = self.dispatch(&view.frustums, lists, volumes, pool).finish();
        view.restore_lists(lists);
        stats
    }
}

fn submit_range(
    jobs: Vec<FrustumJob>,
    ctx: &Arc<CullContext>,
    pool: &PoolHandle,
    results: &flume::Sender<FrustumJob>,
) {
    let ctx = Arc::clone(ctx);
    let results = results.clone();
    let stages = pool.clone();
    pool.submit(
        move || {
            for mut job in jobs {
                job.cull(&ctx);

                let ctx = Arc::clone(&ctx);
                let results = results.clone();
                let gather_pool = stages.clone();
                stages.submit(
                    move || {
                        job.sort();
                        gather_pool.submit(
                            move || {
                                job.gather(&ctx);
                                // The receiver only goes away with the PendingCull.
                                let _ = results.send(job);
                            },
                            TaskPriority::RealTime,
                        );
                    },
                    TaskPriority::Critical,
                );
            }
        },
        TaskPriority::High,
    );
}

/// A cull pass in flight.
///
/// The signals of every frustum are available immediately; the lists
/// themselves are handed back by [`finish`](Self::finish).
#[derive(Debug)]
pub struct PendingCull {
    ctx: Arc<CullContext>,
    pool: PoolHandle,
    inline_jobs: Vec<FrustumJob>,
    results: flume::Receiver<FrustumJob>,
    signals: Vec<FrustumSignals>,
    submitted: usize,
    threaded: bool,
}

impl PendingCull {
    /// Number of frustums in the pass.
    pub fn frustum_count(&self) -> usize {
        self.signals.len()
    }

    /// Whether worker threads take part in the pass.
    pub fn is_threaded(&self) -> bool {
        self.threaded
    }

    /// The *count known* signal of frustum `index`.
    pub fn count_ready(&self, index: usize) -> Option<&Arc<CountingSignal>> {
        self.signals.get(index).map(|s| &s.count_ready)
    }

    /// The *data ready* signal of frustum `index`.
    pub fn data_ready(&self, index: usize) -> Option<&Arc<CountingSignal>> {
        self.signals.get(index).map(|s| &s.data_ready)
    }

    /// Runs the calling thread's share of the pass, waits for the workers,
    /// and returns the lists in frustum order.
    ///
    /// While waiting, the calling thread runs queued tasks itself, so the
    /// pass completes even when every worker is busy elsewhere.
    pub fn finish(self) -> (Vec<FrustumRenderList>, CullStats) {
        let Self {
            ctx,
            pool,
            inline_jobs,
            results,
            signals,
            submitted,
            threaded,
        } = self;

        let mut slots: Vec<Option<FrustumRenderList>> = signals.iter().map(|_| None).collect();

        for mut job in inline_jobs {
            job.run_inline(&ctx);
            let index = job.index;
            slots[index] = Some(job.into_list());
        }

        // Every worker-side sender is dropped once its task chain ends, so a
        // lost chain disconnects the channel instead of blocking forever.
        let mut received = 0;
        while received < submitted {
            let job = match results.try_recv() {
                Ok(job) => job,
                Err(flume::TryRecvError::Disconnected) => break,
                Err(flume::TryRecvError::Empty) => {
                    if pool.run_next_on_calling_thread() {
                        continue;
                    }
                    match results.recv_timeout(HELP_INTERVAL) {
                        Ok(job) => job,
                        Err(flume::RecvTimeoutError::Timeout) => continue,
                        Err(flume::RecvTimeoutError::Disconnected) => break,
                    }
                }
            };
            received += 1;
            let index = job.index;
            slots[index] = Some(job.into_list());
        }

        let mut stats = CullStats {
            frustums: signals.len(),
            mesh_boxes: ctx.mesh_boxes.len(),
            threaded,
            ..CullStats::default()
        };

        let lists: Vec<FrustumRenderList> = slots
            .into_iter()
            .zip(&signals)
            .enumerate()
            .map(|(index, (slot, signals))| {
                slot.unwrap_or_else(|| {
                    log::error!("Render list of frustum {index} was lost; publishing it empty.");
                    stats.lost += 1;
                    signals.count_ready.notify_count(0);
                    signals.data_ready.notify_count(0);
                    let list = FrustumRenderList::new(signals.kind, signals.shadow_index);
                    list.publish_count(0);
                    list.publish_data();
                    list
                })
            })
            .collect();

        for list in &lists {
            stats.visible += list.draws.len();
            stats.max_visible = stats.max_visible.max(list.draws.len());
        }

        log::debug!(
            "Cull pass: {} frustums x {} mesh boxes, {} visible (max {}), {}.",
            stats.frustums,
            stats.mesh_boxes,
            stats.visible,
            stats.max_visible,
            if stats.threaded { "threaded" } else { "inline" }
        );
        (lists, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::math::{Aabb, Mat4, Vec3, FRAC_PI_2};
    use vantage_core::renderer::{MaterialId, MeshBuffers, MeshId};
    use vantage_core::task::WorkerPool;
    use vantage_data::render::MeshBox;
    use vantage_data::scene::ObjectHandle;
    use std::thread;

    fn camera() -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y).unwrap();
        Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 100.0) * view
    }

    /// A grid of unit boxes in front of and behind the camera.
    fn volumes(count: u32) -> BoundingVolumes {
        let mesh_boxes: Vec<MeshBox> = (0..count)
            .map(|i| {
                let x = (i % 20) as f32 - 10.0;
                let z = (i / 20) as f32 * 3.0 - 30.0;
                MeshBox {
                    aabb: Aabb::from_center_half_extents(Vec3::new(x, 0.0, z), Vec3::splat(0.5)),
                    object_index: i,
                    object: ObjectHandle(i),
                    mesh: MeshId(i),
                    material: MaterialId(i % 7),
                    tessellated: i % 5 == 0,
                    buffers: MeshBuffers::default(),
                    lod_index_counts: Arc::from([300, 100, 30].as_slice()),
                }
            })
            .collect();
        BoundingVolumes {
            object_handles: (0..count).map(ObjectHandle).collect(),
            object_boxes: mesh_boxes.iter().map(|b| b.aabb).collect(),
            object_transforms: (0..count).map(|_| Mat4::IDENTITY).collect(),
            object_mesh_counts: vec![1; count as usize],
            mesh_boxes: Arc::from(mesh_boxes),
        }
    }

    fn frustums(count: u32) -> Vec<ViewFrustum> {
        (0..count)
            .map(|i| {
                if i == 0 {
                    ViewFrustum::new(FrustumKind::MainView, None, camera())
                } else {
                    let turn = Mat4::from_rotation_y(i as f32 * 0.7);
                    ViewFrustum::new(FrustumKind::SpotShadow { light: i }, Some(i - 1), camera() * turn)
                }
            })
            .collect()
    }

    #[test]
    fn test_threading_decision() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        assert!(!lane.should_thread(4, 1000, 0));
        assert!(!lane.should_thread(1, 1000, 4));
        assert!(!lane.should_thread(4, 127, 4));
        assert!(lane.should_thread(2, 128, 1));
    }

    #[test]
    fn test_threaded_matches_inline() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        let volumes = volumes(400);
        let frustums = frustums(6);

        let no_workers = WorkerPool::new();
        let pending = lane.dispatch(&frustums, Vec::new(), &volumes, &no_workers.handle());
        assert!(!pending.is_threaded());
        let (inline, inline_stats) = pending.finish();

        let pool = WorkerPool::with_threads(3);
        let pending = lane.dispatch(&frustums, Vec::new(), &volumes, &pool.handle());
        assert!(pending.is_threaded());
        let (threaded, threaded_stats) = pending.finish();

        assert_eq!(inline_stats.visible, threaded_stats.visible);
        assert!(inline_stats.visible > 0);
        assert_eq!(threaded_stats.lost, 0);
        for (a, b) in inline.iter().zip(&threaded) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.draws.sort_keys, b.draws.sort_keys);
            assert_eq!(a.draws.meshes, b.draws.meshes);
            assert_eq!(a.draws.lods, b.draws.lods);
        }
    }

    #[test]
    fn test_signals_fire_with_count() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        let volumes = volumes(300);
        let pool = WorkerPool::with_threads(2);
        let pending = lane.dispatch(&frustums(4), Vec::new(), &volumes, &pool.handle());

        let signals: Vec<_> = (0..pending.frustum_count())
            .map(|i| {
                (
                    Arc::clone(pending.count_ready(i).unwrap()),
                    Arc::clone(pending.data_ready(i).unwrap()),
                )
            })
            .collect();
        assert!(pending.count_ready(4).is_none());

        let (lists, _) = pending.finish();
        for ((count_ready, data_ready), list) in signals.iter().zip(&lists) {
            assert_eq!(count_ready.wait(), list.draws.len());
            assert_eq!(data_ready.wait(), list.draws.len());
            assert!(list.is_ready());
        }
    }

    /// Occupies the single worker of `pool` until the returned sender is
    /// used or dropped, or ten seconds pass.
    fn hold_worker(pool: &PoolHandle) -> flume::Sender<()> {
        let (release, gate) = flume::bounded::<()>(1);
        let started = Arc::new(CountingSignal::new());
        let running = Arc::clone(&started);
        pool.submit(
            move || {
                running.notify();
                let _ = gate.recv_timeout(Duration::from_secs(10));
            },
            TaskPriority::RealTime,
        );
        started.wait();
        release
    }

    #[test]
    fn test_finish_completes_while_workers_are_busy() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        let volumes = volumes(400);
        let pool = WorkerPool::with_threads(1);
        let handle = pool.handle();
        let release = hold_worker(&handle);

        let pending = lane.dispatch(&frustums(4), Vec::new(), &volumes, &handle);
        assert!(pending.is_threaded());
        let (lists, stats) = pending.finish();

        // The gate is still closed: the caller ran the worker-side stages.
        assert!(!release.is_disconnected());
        assert_eq!(stats.lost, 0);
        assert_eq!(lists.len(), 4);
        assert!(lists.iter().all(|l| l.is_ready()));
        assert!(stats.visible > 0);
        let _ = release.send(());
    }

    #[test]
    fn test_count_known_before_data_ready() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        let volumes = volumes(400);
        let pool = WorkerPool::with_threads(1);
        let handle = pool.handle();
        let release = hold_worker(&handle);

        // One worker: frustums 0..2 stay with the caller, 2..4 form the
        // submitted range.
        let pending = lane.dispatch(&frustums(4), Vec::new(), &volumes, &handle);
        assert!(pending.is_threaded());
        assert_eq!(handle.pending(), 1);

        // Run only the range's cull task; its sort and gather stay queued.
        assert!(handle.run_next_on_calling_thread());
        assert_eq!(handle.pending(), 2);

        let count_ready = Arc::clone(pending.count_ready(2).unwrap());
        let data_ready = Arc::clone(pending.data_ready(2).unwrap());
        let waiter = {
            let count_ready = Arc::clone(&count_ready);
            thread::spawn(move || count_ready.wait())
        };
        let count = waiter.join().unwrap();
        assert!(count_ready.is_fired());
        assert!(!data_ready.is_fired());
        assert!(!pending.data_ready(3).unwrap().is_fired());

        let _ = release.send(());
        let (lists, stats) = pending.finish();
        assert_eq!(stats.lost, 0);
        assert_eq!(lists[2].draws.len(), count);
        assert_eq!(data_ready.wait(), count);
    }

    #[test]
    fn test_lists_are_sorted_descending() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        let pool = WorkerPool::with_threads(2);
        let (lists, _) = lane
            .dispatch(&frustums(3), Vec::new(), &volumes(500), &pool.handle())
            .finish();
        for list in &lists {
            assert!(list.draws.sort_keys.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn test_lists_are_reused() {
        let lane = FrustumCullLane::new(&CullingConfig::default());
        let pool = WorkerPool::new();
        let volumes = volumes(200);
        let (lists, _) = lane.dispatch(&frustums(2), Vec::new(), &volumes, &pool.handle()).finish();
        let first_len = lists[0].draws.len();

        let (again, _) = lane.dispatch(&frustums(3), lists, &volumes, &pool.handle()).finish();
        assert_eq!(again.len(), 3);
        assert_eq!(again[0].draws.len(), first_len);
        assert_eq!(again[2].shadow_index, Some(1));
    }
}
