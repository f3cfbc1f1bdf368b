use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use vantage_core::math::{Aabb, Mat4, Vec3, FRAC_PI_2};
use vantage_core::task::WorkerPool;
use vantage_data::render::{CameraView, SceneView};
use vantage_data::scene::{Light, MaterialInfo, Model, ModelMesh, SceneProvider, SceneStore, Transform};
use vantage_lanes::{BoundingVolumeLane, CullingConfig, FrustumCullLane, ShadowViews};

fn grid_scene(side: u32) -> Arc<SceneStore> {
    let mut scene = SceneStore::new();
    let material = scene.register_material(MaterialInfo::OPAQUE).unwrap();
    let meshes = (0..3)
        .map(|i| {
            ModelMesh::new(
                scene.register_mesh().unwrap(),
                material,
                Aabb::from_center_half_extents(Vec3::new(0.0, i as f32, 0.0), Vec3::splat(0.5)),
                900,
            )
            .with_lods(&[900, 300, 100, 30])
        })
        .collect();
    let model = scene.add_model(Model::new(meshes));

    for x in 0..side {
        for z in 0..side {
            let position = Vec3::new(x as f32 * 2.0 - side as f32, 0.0, -(z as f32) * 2.0);
            scene.spawn(Transform::from_translation(position), Some(model));
        }
    }
    scene.add_light(Light::directional(Vec3::new(-0.3, -1.0, -0.4)));
    scene.add_light(Light::point(Vec3::new(0.0, 5.0, -20.0), 30.0));
    Arc::new(scene)
}

fn bench_visibility(c: &mut Criterion) {
    let scene = grid_scene(100);
    let config = CullingConfig::default();
    let camera = {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 10.0, 20.0), Vec3::new(0.0, 0.0, -50.0), Vec3::Y).unwrap();
        CameraView::new(view, Mat4::perspective_rh_zo(FRAC_PI_2 * 0.7, 16.0 / 9.0, 0.1, 300.0))
    };
    let frustums = ShadowViews::frustums(&camera, scene.lights());
    let objects = scene.object_handles();

    let inline_pool = WorkerPool::new();
    let pool = WorkerPool::with_threads(config.resolved_worker_threads().max(1));

    let bounds = BoundingVolumeLane::new(&config);
    let cull = FrustumCullLane::new(&config);
    let volumes = bounds.build(&objects, &scene, &pool.handle());

    let mut group = c.benchmark_group("Visibility");

    group.bench_function("Bounds build (10k objects, threaded)", |b| {
        b.iter(|| black_box(bounds.build(&objects, &scene, &pool.handle())));
    });

    group.bench_function("Cull 8 frustums (30k boxes, inline)", |b| {
        let mut view = SceneView::default();
        b.iter(|| {
            view.prepare(0, frustums.clone());
            black_box(cull.run(&mut view, &volumes, &inline_pool.handle()))
        });
    });

    group.bench_function("Cull 8 frustums (30k boxes, threaded)", |b| {
        let mut view = SceneView::default();
        b.iter(|| {
            view.prepare(0, frustums.clone());
            black_box(cull.run(&mut view, &volumes, &pool.handle()))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_visibility);
criterion_main!(benches);
