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

//! Per-frustum render lists, in the layout the renderer consumes.

use std::sync::Arc;

use vantage_core::math::Mat4;
use vantage_core::renderer::{DrawClass, MaterialId, MeshBuffers, MeshId, SortKey};
use vantage_core::task::CountingSignal;

/// What a frustum renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumKind {
    /// The camera view. Always frustum 0.
    MainView,
    /// The directional light's shadow view.
    DirectionalShadow,
    /// One cube face of a point light's shadow map.
    PointShadow {
        /// Index of the light in the scene's light list.
        light: u32,
        /// Cube face, `0..6` in +X, -X, +Y, -Y, +Z, -Z order.
        face: u8,
    },
    /// A spot light's shadow view.
    SpotShadow {
        /// Index of the light in the scene's light list.
        light: u32,
    },
}

impl FrustumKind {
    /// The sort-key class draws of this frustum are encoded with.
    #[inline]
    pub fn draw_class(self) -> DrawClass {
        match self {
            FrustumKind::MainView => DrawClass::Lit,
            _ => DrawClass::Shadow,
        }
    }

    /// `true` for every shadow view.
    #[inline]
    pub fn is_shadow(self) -> bool {
        self.draw_class() == DrawClass::Shadow
    }
}

/// One visible draw, as read back from a [`DrawList`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry {
    /// Draw ordering key.
    pub sort_key: SortKey,
    /// World matrix.
    pub transform: Mat4,
    /// Material to bind.
    pub material: MaterialId,
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Vertex/index buffers to bind.
    pub buffers: MeshBuffers,
    /// Index count of the selected LOD.
    pub index_count: u32,
    /// Selected LOD.
    pub lod: u8,
    /// Screen coverage of the bounds, in NDC area units (full screen is 4.0).
    pub projected_area: f32,
}

/// Visible draws of one frustum as parallel arrays, in sort order.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    /// Sort keys, descending.
    pub sort_keys: Vec<SortKey>,
    /// World matrices.
    pub transforms: Vec<Mat4>,
    /// Materials.
    pub materials: Vec<MaterialId>,
    /// Meshes.
    pub meshes: Vec<MeshId>,
    /// Buffer pairs.
    pub buffers: Vec<MeshBuffers>,
    /// Index counts.
    pub index_counts: Vec<u32>,
    /// Selected LODs.
    pub lods: Vec<u8>,
    /// Projected areas.
    pub projected_areas: Vec<f32>,
}

impl DrawList {
    /// Number of draws.
    #[inline]
    pub fn len(&self) -> usize {
        self.sort_keys.len()
    }

    /// `true` if no draw survived culling.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sort_keys.is_empty()
    }

    /// Removes all draws, keeping the allocations.
    pub fn clear(&mut self) {
        self.sort_keys.clear();
        self.transforms.clear();
        self.materials.clear();
        self.meshes.clear();
        self.buffers.clear();
        self.index_counts.clear();
        self.lods.clear();
        self.projected_areas.clear();
    }

    /// Reserves room for `additional` draws in every array.
    pub fn reserve(&mut self, additional: usize) {
        self.sort_keys.reserve(additional);
        self.transforms.reserve(additional);
        self.materials.reserve(additional);
        self.meshes.reserve(additional);
        self.buffers.reserve(additional);
        self.index_counts.reserve(additional);
        self.lods.reserve(additional);
        self.projected_areas.reserve(additional);
    }

    /// Appends a draw.
    pub fn push(&mut self, entry: DrawEntry) {
        self.sort_keys.push(entry.sort_key);
        self.transforms.push(entry.transform);
        self.materials.push(entry.material);
        self.meshes.push(entry.mesh);
        self.buffers.push(entry.buffers);
        self.index_counts.push(entry.index_count);
        self.lods.push(entry.lod);
        self.projected_areas.push(entry.projected_area);
    }

    /// Reads draw `index` back as a single entry.
    pub fn get(&self, index: usize) -> Option<DrawEntry> {
        Some(DrawEntry {
            sort_key: *self.sort_keys.get(index)?,
            transform: self.transforms[index],
            material: self.materials[index],
            mesh: self.meshes[index],
            buffers: self.buffers[index],
            index_count: self.index_counts[index],
            lod: self.lods[index],
            projected_area: self.projected_areas[index],
        })
    }

    /// Iterates the draws in order.
    pub fn iter(&self) -> impl Iterator<Item = DrawEntry> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

/// The visible draws of one frustum plus the signals gating their consumption.
///
/// `count_ready` fires (carrying the draw count) once the number of visible
/// draws is fixed; `data_ready` fires (carrying the same count) once every
/// array of [`draws`](Self::draws) is written. Consumers may size buffers on
/// the first and read data after the second.
#[derive(Debug)]
pub struct FrustumRenderList {
    /// What the frustum renders for.
    pub kind: FrustumKind,
    /// Index into the shadow-view sub-array of the frustum's light type, or
    /// `None` for the main view.
    pub shadow_index: Option<u32>,
    /// The visible draws.
    pub draws: DrawList,
    count_ready: Arc<CountingSignal>,
    data_ready: Arc<CountingSignal>,
}

impl FrustumRenderList {
    /// Creates an empty, unsignaled list.
    pub fn new(kind: FrustumKind, shadow_index: Option<u32>) -> Self {
        Self {
            kind,
            shadow_index,
            draws: DrawList::default(),
            count_ready: Arc::new(CountingSignal::new()),
            data_ready: Arc::new(CountingSignal::new()),
        }
    }

    /// Re-targets the list for a new frame: clears the draws, keeping their
    /// allocations, and re-arms both signals.
    pub fn reset(&mut self, kind: FrustumKind, shadow_index: Option<u32>) {
        self.kind = kind;
        self.shadow_index = shadow_index;
        self.draws.clear();
        self.count_ready.reset();
        self.data_ready.reset();
    }

    /// The *count known* signal.
    pub fn count_ready(&self) -> &Arc<CountingSignal> {
        &self.count_ready
    }

    /// The *data ready* signal.
    pub fn data_ready(&self) -> &Arc<CountingSignal> {
        &self.data_ready
    }

    /// Fires *count known* with `count`.
    pub fn publish_count(&self, count: usize) {
        self.count_ready.notify_count(count);
    }

    /// Fires *data ready* with the current draw count.
    pub fn publish_data(&self) {
        debug_assert!(
            !self.count_ready.is_fired() || self.count_ready.count() == self.draws.len(),
            "published draw count differs from the gathered draws"
        );
        self.data_ready.notify_count(self.draws.len());
    }

    /// `true` once both signals have fired.
    pub fn is_ready(&self) -> bool {
        self.count_ready.is_fired() && self.data_ready.is_fired()
    }
}
