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

//! Models, the meshes they are made of, and the material flags the sort key needs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vantage_core::math::Aabb;
use vantage_core::renderer::{MaterialId, MeshBuffers, MeshId, SortKey};

/// Identifies a [`Model`] registered with a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

/// Surface properties of a material that influence draw ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialInfo {
    /// The material uses a tessellation pipeline.
    pub tessellated: bool,
    /// The material discards fragments by alpha test.
    pub alpha_tested: bool,
}

impl MaterialInfo {
    /// An opaque, non-tessellated material.
    pub const OPAQUE: Self = Self {
        tessellated: false,
        alpha_tested: false,
    };

    /// Whether draws with this material need their own pipeline, in which case
    /// shadow keys must keep the material id.
    #[inline]
    pub fn needs_material_pipeline(&self) -> bool {
        self.tessellated || self.alpha_tested
    }
}

/// One (mesh, material) pair of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMesh {
    /// The mesh.
    pub mesh: MeshId,
    /// The material the mesh is drawn with.
    pub material: MaterialId,
    /// Mesh bounds in model space.
    pub local_bounds: Aabb,
    /// The vertex/index buffers of the mesh.
    pub buffers: MeshBuffers,
    /// Index count of each LOD, finest first. At least one entry, at most
    /// [`SortKey::MAX_LOD_COUNT`].
    pub lod_index_counts: Arc<[u32]>,
}

impl ModelMesh {
    /// Creates a mesh entry with a single LOD.
    pub fn new(mesh: MeshId, material: MaterialId, local_bounds: Aabb, index_count: u32) -> Self {
        Self {
            mesh,
            material,
            local_bounds,
            buffers: MeshBuffers::default(),
            lod_index_counts: Arc::from([index_count]),
        }
    }

    /// Replaces the LOD chain. Chains longer than the key can address are
    /// truncated.
    pub fn with_lods(mut self, index_counts: &[u32]) -> Self {
        let len = index_counts.len().min(usize::from(SortKey::MAX_LOD_COUNT));
        if len < index_counts.len() {
            log::warn!(
                "Mesh {:?} has {} LODs; only the first {} are addressable.",
                self.mesh,
                index_counts.len(),
                len
            );
        }
        if len > 0 {
            self.lod_index_counts = Arc::from(&index_counts[..len]);
        }
        self
    }

    /// Replaces the buffer pair.
    pub fn with_buffers(mut self, buffers: MeshBuffers) -> Self {
        self.buffers = buffers;
        self
    }

    /// Number of LODs, in `1..=16`.
    #[inline]
    pub fn lod_count(&self) -> u8 {
        self.lod_index_counts.len().clamp(1, usize::from(SortKey::MAX_LOD_COUNT)) as u8
    }
}

/// A renderable asset: an ordered list of (mesh, material) pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    /// The meshes, in draw-submission order.
    pub meshes: Vec<ModelMesh>,
}

impl Model {
    /// Creates a model from its meshes.
    pub fn new(meshes: Vec<ModelMesh>) -> Self {
        Self { meshes }
    }

    /// Number of meshes.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Union of the mesh bounds, or [`Aabb::INVALID`] for an empty model.
    pub fn local_bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::INVALID, |acc, m| acc.merge(&m.local_bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::math::Vec3;

    fn unit_mesh(id: u32, offset: f32) -> ModelMesh {
        ModelMesh::new(
            MeshId(id),
            MaterialId(0),
            Aabb::from_min_max(Vec3::splat(offset), Vec3::splat(offset + 1.0)),
            36,
        )
    }

    #[test]
    fn test_local_bounds_is_union() {
        let model = Model::new(vec![unit_mesh(0, 0.0), unit_mesh(1, 4.0)]);
        let bounds = model.local_bounds();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::splat(5.0));
    }

    #[test]
    fn test_empty_model_bounds_invalid() {
        assert!(!Model::default().local_bounds().is_valid());
    }

    #[test]
    fn test_lod_chain_is_truncated() {
        let counts: Vec<u32> = (0..20).map(|i| 1000 - i * 10).collect();
        let mesh = unit_mesh(0, 0.0).with_lods(&counts);
        assert_eq!(mesh.lod_count(), 16);
        assert_eq!(mesh.lod_index_counts[15], 850);
    }

    #[test]
    fn test_empty_lod_chain_keeps_base_lod() {
        let mesh = unit_mesh(0, 0.0).with_lods(&[]);
        assert_eq!(mesh.lod_count(), 1);
        assert_eq!(&*mesh.lod_index_counts, &[36]);
    }

    #[test]
    fn test_material_pipeline_flag() {
        assert!(!MaterialInfo::OPAQUE.needs_material_pipeline());
        assert!(MaterialInfo { tessellated: true, alpha_tested: false }.needs_material_pipeline());
        assert!(MaterialInfo { tessellated: false, alpha_tested: true }.needs_material_pipeline());
    }
}
