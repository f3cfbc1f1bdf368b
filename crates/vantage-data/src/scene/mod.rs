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

//! Scene data consumed by the visibility lanes.

mod ids;
mod light;
mod model;
mod provider;
mod store;
mod transform;

pub use ids::IdAllocator;
pub use light::{DirectionalLight, Light, LightKind, PointLight, SpotLight};
pub use model::{MaterialInfo, Model, ModelId, ModelMesh};
pub use provider::SceneProvider;
pub use store::SceneStore;
pub use transform::Transform;

use serde::{Deserialize, Serialize};

/// Identifies a game object in the scene.
///
/// Handles are opaque to the pipeline: they are only ever passed back to the
/// [`SceneProvider`] that issued them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ObjectHandle(pub u32);
