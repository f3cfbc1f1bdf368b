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

use serde::{Deserialize, Serialize};

/// Identifies a mesh (one LOD chain) known to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u32);

impl MeshId {
    /// Sentinel for "no mesh". Must never reach the sort-key codec.
    pub const INVALID: Self = Self(u32::MAX);

    /// Returns `true` unless this is [`MeshId::INVALID`].
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Identifies a material known to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    /// Sentinel for "no material". Must never reach the sort-key codec.
    pub const INVALID: Self = Self(u32::MAX);

    /// Returns `true` unless this is [`MaterialId::INVALID`].
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// An opaque handle to a GPU buffer owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BufferId(pub u64);

/// The vertex/index buffer pair a draw binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshBuffers {
    /// The vertex buffer.
    pub vertex_buffer: BufferId,
    /// The index buffer.
    pub index_buffer: BufferId,
}
