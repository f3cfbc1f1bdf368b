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

//! Properties that must hold for any scene: determinism, conservative
//! culling, monotonic LOD selection and complete work partitioning.

use std::collections::HashSet;
use std::sync::Arc;

use vantage_core::math::{Aabb, Mat4, Quaternion, Vec3, FRAC_PI_2};
use vantage_core::task::{partition_work, WorkerPool};
use vantage_data::render::{CameraView, FrustumKind, SceneView, ViewFrustum};
use vantage_data::scene::{Light, MaterialInfo, Model, ModelMesh, SceneProvider, SceneStore, Transform};
use vantage_lanes::{BoundingVolumeLane, CullingConfig, FrustumCullLane, VisibilityPipeline};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small deterministic generator so the scenes are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32) / ((1u64 << 24) as f32)
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

/// A scattered scene of `objects` objects using a handful of multi-mesh models.
fn random_scene(objects: usize, seed: u64) -> Arc<SceneStore> {
    let mut rng = Lcg(seed);
    let mut store = SceneStore::new();
    let materials: Vec<_> = (0..5)
        .map(|i| {
            store
                .register_material(MaterialInfo {
                    tessellated: i == 3,
                    alpha_tested: i == 4,
                })
                .unwrap()
        })
        .collect();

    let models: Vec<_> = (0..6)
        .map(|m| {
            let meshes = (0..=m % 3)
                .map(|k| {
                    let mesh = store.register_mesh().unwrap();
                    let center = Vec3::new(k as f32, 0.0, 0.0);
                    ModelMesh::new(
                        mesh,
                        materials[(m + k) % materials.len()],
                        Aabb::from_center_half_extents(center, Vec3::splat(0.5)),
                        600,
                    )
                    .with_lods(&[600, 200, 60, 20])
                })
                .collect();
            store.add_model(Model::new(meshes))
        })
        .collect();

    for i in 0..objects {
        let translation = Vec3::new(rng.range(-60.0, 60.0), rng.range(-10.0, 10.0), rng.range(-90.0, 30.0));
        let rotation = Quaternion::from_axis_angle(Vec3::Y, rng.range(0.0, 6.28));
        let transform = Transform::new(translation, rotation, Vec3::splat(rng.range(0.5, 3.0)));
        // Every seventh object has no model.
        let model = (i % 7 != 0).then(|| models[i % models.len()]);
        store.spawn(transform, model);
    }
    store.add_light(Light::directional(Vec3::new(-0.4, -1.0, -0.3)));
    store.add_light(Light::point(Vec3::new(5.0, 4.0, -10.0), 25.0));
    store.add_light(Light::spot(Vec3::new(0.0, 15.0, -20.0), Vec3::new(0.0, -1.0, 0.2), 40.0, 0.6));
    Arc::new(store)
}

fn camera() -> CameraView {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 10.0), Vec3::new(0.0, 0.0, -20.0), Vec3::Y).unwrap();
    CameraView::new(view, Mat4::perspective_rh_zo(FRAC_PI_2 * 0.8, 16.0 / 9.0, 0.1, 120.0))
}

fn small_ranges() -> CullingConfig {
    CullingConfig {
        min_objects_per_range: 16,
        min_meshes_per_range: 16,
        ..CullingConfig::default()
    }
}

#[test]
fn test_bounds_build_is_idempotent() {
    init_logger();
    let scene = random_scene(2_000, 7);
    let objects = scene.object_handles();
    let pool = WorkerPool::with_threads(4);
    let lane = BoundingVolumeLane::new(&small_ranges());

    let first = lane.build(&objects, &scene, &pool.handle());
    let second = lane.build(&objects, &scene, &pool.handle());

    assert_eq!(first.object_handles, second.object_handles);
    assert_eq!(first.object_boxes, second.object_boxes);
    assert_eq!(first.object_mesh_counts, second.object_mesh_counts);
    assert_eq!(&*first.object_transforms, &*second.object_transforms);
    assert_eq!(&*first.mesh_boxes, &*second.mesh_boxes);
    assert_eq!(
        first.mesh_box_count(),
        first.object_mesh_counts.iter().map(|&c| c as usize).sum::<usize>()
    );
}

#[test]
fn test_cull_is_deterministic_across_thread_counts() {
    init_logger();
    let scene = random_scene(1_500, 11);
    let config = small_ranges();

    let run = |threads: usize| {
        let pool = WorkerPool::with_threads(threads);
        let volumes = BoundingVolumeLane::new(&config).build(&scene.object_handles(), &scene, &pool.handle());
        let mut view = SceneView::default();
        view.prepare(0, vantage_lanes::ShadowViews::frustums(&camera(), scene.lights()));
        let stats = FrustumCullLane::new(&config).run(&mut view, &volumes, &pool.handle());
        (view, stats)
    };

    let (inline, inline_stats) = run(0);
    let (threaded, threaded_stats) = run(3);

    assert!(!inline_stats.threaded);
    assert!(threaded_stats.threaded);
    assert_eq!(inline_stats.visible, threaded_stats.visible);
    assert_eq!(inline.lists().len(), 1 + 1 + 6 + 1);
    for (a, b) in inline.lists().iter().zip(threaded.lists()) {
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.shadow_index, b.shadow_index);
        assert_eq!(a.draws.sort_keys, b.draws.sort_keys);
        assert_eq!(a.draws.meshes, b.draws.meshes);
        assert_eq!(a.draws.index_counts, b.draws.index_counts);
        assert_eq!(a.draws.transforms, b.draws.transforms);
    }
}

#[test]
fn test_rejected_boxes_are_outside_one_plane() {
    init_logger();
    let scene = random_scene(800, 23);
    let pool = WorkerPool::with_threads(2);
    let config = CullingConfig::default();
    let volumes = BoundingVolumeLane::new(&config).build(&scene.object_handles(), &scene, &pool.handle());

    let frustum = ViewFrustum::main(&camera());
    let mut view = SceneView::default();
    view.prepare(0, vec![frustum]);
    FrustumCullLane::new(&config).run(&mut view, &volumes, &pool.handle());

    let list = view.main_list().unwrap();
    let visible: HashSet<_> = list.draws.meshes.iter().copied().collect();
    assert!(!visible.is_empty());

    for mesh_box in volumes.mesh_boxes.iter() {
        if visible.contains(&mesh_box.mesh) {
            continue;
        }
        // Mesh ids are shared between objects of one model, so only boxes of
        // meshes that are nowhere visible are checked.
        let separated = frustum.planes.planes.iter().any(|plane| {
            mesh_box
                .aabb
                .corners()
                .iter()
                .all(|c| plane.signed_distance(*c) < config.cull_epsilon + 1e-3)
        });
        assert!(separated, "box {:?} was rejected but overlaps the frustum", mesh_box.aabb);
    }
}

#[test]
fn test_lod_never_decreases_with_distance() {
    init_logger();
    let mut store = SceneStore::new();
    let mesh = store.register_mesh().unwrap();
    let material = store.register_material(MaterialInfo::OPAQUE).unwrap();
    let model = store.add_model(Model::new(vec![ModelMesh::new(
        mesh,
        material,
        Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5)),
        1000,
    )
    .with_lods(&[1000, 500, 250, 125, 60, 30])]));
    for step in 0..60 {
        let z = -1.0 - step as f32 * 1.5;
        store.spawn(Transform::from_translation(Vec3::new(0.0, 0.0, z)), Some(model));
    }
    let scene = Arc::new(store);

    let pool = WorkerPool::with_threads(2);
    let config = CullingConfig::default();
    let volumes = BoundingVolumeLane::new(&config).build(&scene.object_handles(), &scene, &pool.handle());

    let view_proj = {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y).unwrap();
        Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 200.0) * view
    };
    let mut view = SceneView::default();
    view.prepare(0, vec![ViewFrustum::new(FrustumKind::MainView, None, view_proj)]);
    FrustumCullLane::new(&config).run(&mut view, &volumes, &pool.handle());

    let draws = &view.main_list().unwrap().draws;
    assert_eq!(draws.len(), 60);

    let mut by_distance: Vec<(f32, u8, f32)> = (0..draws.len())
        .map(|i| (-draws.transforms[i].translation().z, draws.lods[i], draws.projected_areas[i]))
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

    for pair in by_distance.windows(2) {
        assert!(pair[0].2 >= pair[1].2, "area grew with distance: {pair:?}");
        assert!(pair[0].1 <= pair[1].1, "lod shrank with distance: {pair:?}");
    }
    assert_eq!(by_distance[0].1, 0);
    assert!(by_distance[59].1 > 0);
}

#[test]
fn test_partition_covers_every_item() {
    for items in [0usize, 1, 2, 127, 128, 255, 256, 257, 1_000, 65_537] {
        for threads in [0usize, 1, 2, 3, 7, 15, 63] {
            let ranges = partition_work(items, threads, 256);
            let mut seen = 0;
            for range in &ranges {
                assert_eq!(range.start, seen);
                seen = range.end;
            }
            assert_eq!(seen, items);
            assert!(ranges.len() <= threads + 1);
            assert_eq!(ranges.is_empty(), items == 0);
        }
    }
}

#[test]
fn test_pipeline_runs_frames_with_shadow_views() {
    init_logger();
    let scene = random_scene(600, 3);
    let mut pipeline = VisibilityPipeline::new(CullingConfig {
        worker_threads: Some(3),
        frames_in_flight: 3,
        ..small_ranges()
    })
    .unwrap();

    let first_keys = {
        let view = pipeline.run_frame(&scene, &camera());
        assert_eq!(view.lists().len(), 9);
        assert!(view.lists().iter().all(|l| l.is_ready()));
        assert_eq!(view.shadow_lists().count(), 8);
        view.main_list().unwrap().draws.sort_keys.clone()
    };

    for _ in 0..4 {
        pipeline.run_frame(&scene, &camera());
    }
    let latest = pipeline.view(pipeline.frame_index() - 1);
    assert_eq!(latest.frame_index, 4);
    assert_eq!(latest.main_list().unwrap().draws.sort_keys, first_keys);
}
