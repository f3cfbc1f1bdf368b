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

use ahash::AHashMap;
use vantage_core::math::Mat4;
use vantage_core::renderer::{MaterialId, MeshId};

use super::{IdAllocator, Light, MaterialInfo, Model, ModelId, ObjectHandle, SceneProvider, Transform};

#[derive(Debug, Clone)]
struct SceneObject {
    transform: Transform,
    model: Option<ModelId>,
}

/// An in-memory scene: objects, the models they render, materials and lights.
///
/// Object iteration order is spawn order, with despawned objects removed.
#[derive(Debug, Default)]
pub struct SceneStore {
    ids: IdAllocator,
    objects: AHashMap<ObjectHandle, SceneObject>,
    order: Vec<ObjectHandle>,
    next_object: u32,
    models: AHashMap<ModelId, Model>,
    next_model: u32,
    materials: AHashMap<MaterialId, MaterialInfo>,
    lights: Vec<Light>,
}

impl SceneStore {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id allocator backing this scene.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Allocates a mesh id for a mesh that will be referenced by a model.
    pub fn register_mesh(&mut self) -> Option<MeshId> {
        self.ids.allocate_mesh()
    }

    /// Allocates a material id and records its surface flags.
    pub fn register_material(&mut self, info: MaterialInfo) -> Option<MaterialId> {
        let id = self.ids.allocate_material()?;
        self.materials.insert(id, info);
        Some(id)
    }

    /// Registers a model and returns its id.
    pub fn add_model(&mut self, model: Model) -> ModelId {
        let id = ModelId(self.next_model);
        self.next_model += 1;
        self.models.insert(id, model);
        id
    }

    /// Returns a registered model.
    pub fn get_model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(&id)
    }

    /// Spawns an object. `model` may be `None` or refer to an unregistered model;
    /// such objects are kept but contribute no meshes.
    pub fn spawn(&mut self, transform: Transform, model: Option<ModelId>) -> ObjectHandle {
        let handle = ObjectHandle(self.next_object);
        self.next_object += 1;
        self.objects.insert(handle, SceneObject { transform, model });
        self.order.push(handle);
        handle
    }

    /// Removes an object. Returns `false` if it did not exist.
    pub fn despawn(&mut self, handle: ObjectHandle) -> bool {
        if self.objects.remove(&handle).is_none() {
            return false;
        }
        self.order.retain(|h| *h != handle);
        true
    }

    /// Returns the transform of an object.
    pub fn transform(&self, handle: ObjectHandle) -> Option<Transform> {
        self.objects.get(&handle).map(|o| o.transform)
    }

    /// Replaces the transform of an object. Returns `false` if it does not exist.
    pub fn set_transform(&mut self, handle: ObjectHandle, transform: Transform) -> bool {
        match self.objects.get_mut(&handle) {
            Some(object) => {
                object.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    /// Adds a light and returns its index.
    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Mutable access to the lights, e.g. to toggle shadows.
    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }
}

impl SceneProvider for SceneStore {
    fn object_handles(&self) -> Vec<ObjectHandle> {
        self.order.clone()
    }

    fn world_transform(&self, handle: ObjectHandle) -> Option<Mat4> {
        self.objects.get(&handle).map(|o| o.transform.to_mat4())
    }

    fn model(&self, handle: ObjectHandle) -> Option<&Model> {
        let model = self.objects.get(&handle)?.model?;
        self.models.get(&model)
    }

    fn material(&self, id: MaterialId) -> Option<MaterialInfo> {
        self.materials.get(&id).copied()
    }

    fn lights(&self) -> &[Light] {
        &self.lights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ModelMesh;
    use vantage_core::math::{Aabb, Vec3};

    fn scene_with_cube() -> (SceneStore, ModelId) {
        let mut scene = SceneStore::new();
        let mesh = scene.register_mesh().unwrap();
        let material = scene.register_material(MaterialInfo::OPAQUE).unwrap();
        let model = scene.add_model(Model::new(vec![ModelMesh::new(
            mesh,
            material,
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE),
            36,
        )]));
        (scene, model)
    }

    #[test]
    fn test_spawn_order_is_preserved() {
        let (mut scene, model) = scene_with_cube();
        let a = scene.spawn(Transform::identity(), Some(model));
        let b = scene.spawn(Transform::identity(), None);
        let c = scene.spawn(Transform::identity(), Some(model));
        assert_eq!(scene.object_handles(), vec![a, b, c]);

        assert!(scene.despawn(b));
        assert!(!scene.despawn(b));
        assert_eq!(scene.object_handles(), vec![a, c]);
        assert_eq!(scene.object_count(), 2);
    }

    #[test]
    fn test_lookups() {
        let (mut scene, model) = scene_with_cube();
        let with_model = scene.spawn(Transform::from_translation(Vec3::X), Some(model));
        let without_model = scene.spawn(Transform::identity(), None);
        let dangling = scene.spawn(Transform::identity(), Some(ModelId(99)));

        assert_eq!(scene.model(with_model).map(Model::mesh_count), Some(1));
        assert!(scene.model(without_model).is_none());
        assert!(scene.model(dangling).is_none());
        assert!(scene.world_transform(ObjectHandle(1234)).is_none());

        let matrix = scene.world_transform(with_model).unwrap();
        assert_eq!(matrix.translation(), Vec3::X);

        assert_eq!(scene.material(MaterialId(0)), Some(MaterialInfo::OPAQUE));
        assert_eq!(scene.material(MaterialId(7)), None);
    }

    #[test]
    fn test_set_transform() {
        let (mut scene, model) = scene_with_cube();
        let handle = scene.spawn(Transform::identity(), Some(model));
        let moved = Transform::from_translation(Vec3::new(0.0, 3.0, 0.0));
        assert!(scene.set_transform(handle, moved));
        assert_eq!(scene.transform(handle), Some(moved));
        assert!(!scene.set_transform(ObjectHandle(77), moved));
    }
}
