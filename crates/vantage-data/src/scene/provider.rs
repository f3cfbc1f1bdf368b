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

use vantage_core::math::Mat4;
use vantage_core::renderer::MaterialId;

use super::{Light, MaterialInfo, Model, ObjectHandle};

/// The read-only view of a scene the visibility lanes consume.
///
/// Implementations are shared with worker threads for the duration of a
/// frame, so lookups must be callable concurrently.
pub trait SceneProvider: Send + Sync {
    /// The objects to consider this frame, in a stable order.
    fn object_handles(&self) -> Vec<ObjectHandle>;

    /// World matrix of `handle`, or `None` if the handle is unknown.
    fn world_transform(&self, handle: ObjectHandle) -> Option<Mat4>;

    /// The model `handle` renders, or `None` if it has none.
    fn model(&self, handle: ObjectHandle) -> Option<&Model>;

    /// Surface flags of a material, or `None` if the id is unknown.
    fn material(&self, id: MaterialId) -> Option<MaterialInfo>;

    /// The lights of the scene.
    fn lights(&self) -> &[Light];
}
