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

//! Builds the frame's bounding-volume arrays from the scene.
//!
//! The build runs in two fork-join passes over the worker pool:
//!
//! 1. **Objects**: each object's world matrix, world box and mesh count.
//! 2. **Meshes**: the per-object mesh counts are prefix-summed, the mesh-box
//!    index space is repartitioned, and every (object, mesh) pair gets its own
//!    world box.
//!
//! Both passes read the scene only; each range writes its own result slot.

use std::ops::Range;
use std::sync::Arc;

use vantage_core::math::{Aabb, Mat4};
use vantage_core::task::{fork_join, partition_work, CountingSignal, PoolHandle, TaskPriority};
use vantage_data::render::{BoundingVolumes, MeshBox};
use vantage_data::scene::{MaterialInfo, ObjectHandle, SceneProvider};

use crate::config::CullingConfig;

#[derive(Debug, Clone, Copy)]
struct ObjectRecord {
    transform: Mat4,
    aabb: Aabb,
    mesh_count: u32,
}

/// Computes per-object and per-mesh world bounds every frame.
#[derive(Debug)]
pub struct BoundingVolumeLane {
    min_objects_per_range: usize,
    min_meshes_per_range: usize,
    ready: Arc<CountingSignal>,
}

impl BoundingVolumeLane {
    /// Creates the lane with the range sizes from `config`.
    pub fn new(config: &CullingConfig) -> Self {
        Self {
            min_objects_per_range: config.min_objects_per_range,
            min_meshes_per_range: config.min_meshes_per_range,
            ready: Arc::new(CountingSignal::new()),
        }
    }

    /// Fired with the mesh-box count once a build has completed both passes.
    /// Re-armed at the start of every build.
    pub fn ready(&self) -> &Arc<CountingSignal> {
        &self.ready
    }

    /// Builds the bounding-volume arrays of `objects`.
    ///
    /// Objects without a model or without a transform are kept in the
    /// per-object arrays but contribute no mesh boxes.
    pub fn build<S>(&self, objects: &[ObjectHandle], scene: &Arc<S>, pool: &PoolHandle) -> BoundingVolumes
    where
        S: SceneProvider + 'static,
    {
        self.ready.reset();

        if objects.is_empty() {
            self.ready.notify_count(0);
            return BoundingVolumes::empty();
        }

        let objects: Arc<[ObjectHandle]> = Arc::from(objects);
        let threads = pool.thread_count();

        let object_ranges = partition_work(objects.len(), threads, self.min_objects_per_range);
        let object_chunks = {
            let objects = Arc::clone(&objects);
            let scene = Arc::clone(scene);
            fork_join(pool, object_ranges, TaskPriority::High, move |range| {
                build_objects(&objects[range], scene.as_ref())
            })
        };
        let records: Vec<ObjectRecord> = object_chunks.into_iter().flatten().collect();
        debug_assert_eq!(records.len(), objects.len());

        let mut offsets = Vec::with_capacity(records.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for record in &records {
            total += record.mesh_count as usize;
            offsets.push(total);
        }
        let offsets: Arc<[usize]> = Arc::from(offsets);

        let mesh_ranges = partition_work(total, threads, self.min_meshes_per_range);
        let mesh_chunks = {
            let objects = Arc::clone(&objects);
            let offsets = Arc::clone(&offsets);
            let transforms: Arc<[Mat4]> = records.iter().map(|r| r.transform).collect();
            let scene = Arc::clone(scene);
            fork_join(pool, mesh_ranges, TaskPriority::High, move |range| {
                build_meshes(range, &objects, &offsets, &transforms, scene.as_ref())
            })
        };
        let mesh_boxes: Vec<MeshBox> = mesh_chunks.into_iter().flatten().collect();

        let mut object_mesh_counts: Vec<u32> = records.iter().map(|r| r.mesh_count).collect();
        if mesh_boxes.len() != total {
            log::warn!(
                "Scene returned inconsistent models during the bounds build ({} of {} mesh boxes).",
                mesh_boxes.len(),
                total
            );
            object_mesh_counts.iter_mut().for_each(|c| *c = 0);
            for mesh_box in &mesh_boxes {
                object_mesh_counts[mesh_box.object_index as usize] += 1;
            }
        }

        let volumes = BoundingVolumes {
            object_handles: objects.to_vec(),
            object_boxes: records.iter().map(|r| r.aabb).collect(),
            object_transforms: records.iter().map(|r| r.transform).collect(),
            object_mesh_counts,
            mesh_boxes: Arc::from(mesh_boxes),
        };

        log::debug!(
            "Bounds build: {} objects, {} mesh boxes.",
            volumes.object_count(),
            volumes.mesh_box_count()
        );
        self.ready.notify_count(volumes.mesh_box_count());
        volumes
    }
}

fn build_objects<S: SceneProvider + ?Sized>(objects: &[ObjectHandle], scene: &S) -> Vec<ObjectRecord> {
    objects
        .iter()
        .map(|&handle| {
            let transform = scene.world_transform(handle);
            let model = scene.model(handle);
            match (transform, model) {
                (Some(transform), Some(model)) if model.mesh_count() > 0 => ObjectRecord {
                    transform,
                    aabb: model.local_bounds().transform_corners(&transform),
                    mesh_count: model.mesh_count() as u32,
                },
                (transform, _) => {
                    log::trace!("Object {handle:?} has no renderable model; skipped.");
                    ObjectRecord {
                        transform: transform.unwrap_or(Mat4::IDENTITY),
                        aabb: Aabb::INVALID,
                        mesh_count: 0,
                    }
                }
            }
        })
        .collect()
}

fn build_meshes<S: SceneProvider + ?Sized>(
    range: Range<usize>,
    objects: &[ObjectHandle],
    offsets: &[usize],
    transforms: &[Mat4],
    scene: &S,
) -> Vec<MeshBox> {
    let mut out = Vec::with_capacity(range.len());
    if range.is_empty() {
        return out;
    }

    // Owning object of the first mesh box: the last offset not past it.
    let mut object_index = offsets.partition_point(|&offset| offset <= range.start) - 1;

    let mut index = range.start;
    while index < range.end && object_index < objects.len() {
        let first = offsets[object_index];
        let end = offsets[object_index + 1].min(range.end);
        if index >= end {
            object_index += 1;
            continue;
        }

        let handle = objects[object_index];
        let transform = &transforms[object_index];
        let Some(model) = scene.model(handle) else {
            debug_assert!(false, "model of {handle:?} vanished between bounds passes");
            index = end;
            object_index += 1;
            continue;
        };

        for mesh in model.meshes.iter().take(end - first).skip(index - first) {
            let info = scene.material(mesh.material).unwrap_or_else(|| {
                debug_assert!(false, "material {:?} is not known to the scene", mesh.material);
                MaterialInfo::OPAQUE
            });
            out.push(MeshBox {
                aabb: mesh.local_bounds.transform_corners(transform),
                object_index: object_index as u32,
                object: handle,
                mesh: mesh.mesh,
                material: mesh.material,
                tessellated: info.needs_material_pipeline(),
                buffers: mesh.buffers,
                lod_index_counts: Arc::clone(&mesh.lod_index_counts),
            });
        }

        index = end;
        object_index += 1;
    }
    out
}
