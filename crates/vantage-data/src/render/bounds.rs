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

use std::sync::Arc;

use vantage_core::math::{Aabb, Mat4};
use vantage_core::renderer::{MaterialId, MeshBuffers, MeshId, SortKey};

use crate::scene::ObjectHandle;

/// World-space bounds of one (object, mesh) pair, with everything the cull
/// pass needs to emit a draw for it.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBox {
    /// World-space bounds.
    pub aabb: Aabb,
    /// Index of the owning object in [`BoundingVolumes::object_transforms`].
    pub object_index: u32,
    /// The owning object.
    pub object: ObjectHandle,
    /// The mesh.
    pub mesh: MeshId,
    /// The material.
    pub material: MaterialId,
    /// Resolved from the material: the draw needs a material-specific pipeline
    /// (tessellated or alpha-tested).
    pub tessellated: bool,
    /// Vertex/index buffers.
    pub buffers: MeshBuffers,
    /// Index count per LOD, finest first.
    pub lod_index_counts: Arc<[u32]>,
}

impl MeshBox {
    /// Number of LODs of the mesh, clamped to `1..=SortKey::MAX_LOD_COUNT`.
    #[inline]
    pub fn lod_count(&self) -> u8 {
        self.lod_index_counts
            .len()
            .clamp(1, usize::from(SortKey::MAX_LOD_COUNT)) as u8
    }

    /// Index count of `lod`, clamped to the coarsest LOD.
    #[inline]
    pub fn index_count(&self, lod: u8) -> u32 {
        let last = self.lod_index_counts.len().saturating_sub(1);
        self.lod_index_counts
            .get(usize::from(lod).min(last))
            .copied()
            .unwrap_or(0)
    }
}

/// The flat bounding-volume arrays of one frame.
///
/// `object_handles`, `object_boxes`, `object_transforms` and
/// `object_mesh_counts` run in parallel, one entry per object. `mesh_boxes`
/// holds one entry per (object, mesh) pair, grouped by object in object order,
/// so its length is the sum of `object_mesh_counts`.
///
/// The transform and mesh arrays are reference counted: the cull pass shares
/// them with its worker tasks without copying.
#[derive(Debug, Clone)]
pub struct BoundingVolumes {
    /// The objects, in build order.
    pub object_handles: Vec<ObjectHandle>,
    /// World bounds of each object. Invalid for objects without meshes.
    pub object_boxes: Vec<Aabb>,
    /// World matrix of each object. Identity for objects without a transform.
    pub object_transforms: Arc<[Mat4]>,
    /// Number of mesh boxes each object contributed.
    pub object_mesh_counts: Vec<u32>,
    /// The flattened mesh boxes.
    pub mesh_boxes: Arc<[MeshBox]>,
}

impl BoundingVolumes {
    /// Empty arrays.
    pub fn empty() -> Self {
        Self {
            object_handles: Vec::new(),
            object_boxes: Vec::new(),
            object_transforms: Arc::from(Vec::new()),
            object_mesh_counts: Vec::new(),
            mesh_boxes: Arc::from(Vec::new()),
        }
    }

    /// Number of objects.
    pub fn object_count(&self) -> usize {
        self.object_handles.len()
    }

    /// Number of mesh boxes.
    pub fn mesh_box_count(&self) -> usize {
        self.mesh_boxes.len()
    }

    /// World matrix of the object owning `mesh_box`.
    pub fn transform_of(&self, mesh_box: &MeshBox) -> Option<&Mat4> {
        self.object_transforms.get(mesh_box.object_index as usize)
    }

    /// Union of all object bounds, or [`Aabb::INVALID`] for an empty scene.
    pub fn world_bounds(&self) -> Aabb {
        self.object_boxes
            .iter()
            .filter(|b| b.is_valid())
            .fold(Aabb::INVALID, |acc, b| acc.merge(b))
    }
}

impl Default for BoundingVolumes {
    fn default() -> Self {
        Self::empty()
    }
}
