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

use vantage_core::renderer::{BufferId, MaterialId, MeshId, SortKey};

/// Hands out renderer ids that fit the sort-key layout.
///
/// Ids are dense and never reused. Allocation fails once the id space the
/// sort key can address is exhausted.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next_mesh: u32,
    next_material: u32,
    next_buffer: u64,
}

impl IdAllocator {
    /// Creates an allocator starting at id zero for every kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a mesh id, or `None` once `SortKey::MAX_MESH_ID` has been handed out.
    pub fn allocate_mesh(&mut self) -> Option<MeshId> {
        let id = self.next_mesh;
        if id > SortKey::MAX_MESH_ID {
            log::warn!("Mesh id space exhausted.");
            return None;
        }
        self.next_mesh += 1;
        Some(MeshId(id))
    }

    /// Allocates a material id, or `None` once `SortKey::MAX_MATERIAL_ID` has been handed out.
    pub fn allocate_material(&mut self) -> Option<MaterialId> {
        let id = self.next_material;
        if id > SortKey::MAX_MATERIAL_ID {
            log::warn!("Material id space exhausted.");
            return None;
        }
        self.next_material += 1;
        Some(MaterialId(id))
    }

    /// Allocates a buffer id.
    pub fn allocate_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        id
    }

    /// Number of mesh ids handed out so far.
    pub fn mesh_count(&self) -> u32 {
        self.next_mesh
    }

    /// Number of material ids handed out so far.
    pub fn material_count(&self) -> u32 {
        self.next_material
    }
}
