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

//! The per-frustum unit of work moved through the cull, sort and gather stages.

use std::sync::Arc;

use vantage_core::math::Mat4;
use vantage_core::renderer::SortKey;
use vantage_data::render::{DrawEntry, FrustumRenderList, MeshBox, ViewFrustum};

use super::lod::{projected_area, LodPolicy};

/// Read-only inputs shared by every stage of every frustum in a pass.
#[derive(Debug)]
pub(crate) struct CullContext {
    pub mesh_boxes: Arc<[MeshBox]>,
    pub transforms: Arc<[Mat4]>,
    pub lod: LodPolicy,
    pub epsilon: f32,
}

#[derive(Debug, Clone, Copy)]
struct KeyedDraw {
    key: SortKey,
    mesh_box: u32,
    lod: u8,
    projected_area: f32,
}

/// One frustum's state between stages. Owned by exactly one task at a time.
#[derive(Debug)]
pub(crate) struct FrustumJob {
    pub index: usize,
    pub frustum: ViewFrustum,
    pub list: FrustumRenderList,
    visible: Vec<u32>,
    keyed: Vec<KeyedDraw>,
}

impl FrustumJob {
    pub fn new(index: usize, frustum: ViewFrustum, mut list: FrustumRenderList) -> Self {
        list.reset(frustum.kind, frustum.shadow_index);
        Self {
            index,
            frustum,
            list,
            visible: Vec::new(),
            keyed: Vec::new(),
        }
    }

    /// Runs every stage back to back and returns the number of visible draws.
    pub fn run_inline(&mut self, ctx: &CullContext) -> usize {
        self.cull(ctx);
        self.sort();
        self.gather(ctx);
        self.list.draws.len()
    }

    /// Plane-tests every mesh box, builds sort keys for the survivors and
    /// publishes the visible count.
    pub fn cull(&mut self, ctx: &CullContext) {
        let planes = &self.frustum.planes;
        self.visible.clear();
        self.visible.extend(
            ctx.mesh_boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.aabb.is_valid() && planes.intersects_aabb_eps(&b.aabb, ctx.epsilon))
                .map(|(i, _)| i as u32),
        );

        let class = self.frustum.kind.draw_class();
        let view_proj = &self.frustum.view_proj;
        let force_lod0 = self.frustum.force_lod0;

        self.keyed.clear();
        self.keyed.reserve(self.visible.len());
        for &index in &self.visible {
            let mesh_box = &ctx.mesh_boxes[index as usize];
            let area = projected_area(&mesh_box.aabb, view_proj);
            let lod = if force_lod0 {
                0
            } else {
                ctx.lod.select(area, mesh_box.lod_count())
            };
            self.keyed.push(KeyedDraw {
                key: SortKey::encode(class, mesh_box.material, mesh_box.mesh, lod, mesh_box.tessellated),
                mesh_box: index,
                lod,
                projected_area: area,
            });
        }

        self.list.publish_count(self.keyed.len());
    }

    /// Orders the keyed draws by descending key.
    pub fn sort(&mut self) {
        self.keyed.sort_unstable_by(|a, b| b.key.cmp(&a.key));
    }

    /// Writes the sorted draws into the render list and publishes it.
    pub fn gather(&mut self, ctx: &CullContext) {
        let draws = &mut self.list.draws;
        draws.clear();
        draws.reserve(self.keyed.len());
        for keyed in &self.keyed {
            let mesh_box = &ctx.mesh_boxes[keyed.mesh_box as usize];
            let transform = ctx
                .transforms
                .get(mesh_box.object_index as usize)
                .copied()
                .unwrap_or(Mat4::IDENTITY);
            draws.push(DrawEntry {
                sort_key: keyed.key,
                transform,
                material: mesh_box.material,
                mesh: mesh_box.mesh,
                buffers: mesh_box.buffers,
                index_count: mesh_box.index_count(keyed.lod),
                lod: keyed.lod,
                projected_area: keyed.projected_area,
            });
        }
        self.list.publish_data();
    }

    /// Hands the filled list back, dropping the scratch buffers.
    pub fn into_list(self) -> FrustumRenderList {
        self.list
    }
}
