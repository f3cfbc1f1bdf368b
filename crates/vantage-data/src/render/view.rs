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

//! Frustum descriptions and the frame-slotted views owning the render lists.

use std::mem;

use vantage_core::math::{Frustum, Mat4};

use super::{FrustumKind, FrustumRenderList};

/// The camera a frame is rendered from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// Projection times view.
    pub view_proj: Mat4,
    /// Forces LOD 0 for every draw of the main view.
    pub force_lod0: bool,
    /// Forces LOD 0 for every draw of the shadow views derived for this
    /// camera.
    pub shadow_force_lod0: bool,
}

impl CameraView {
    /// Creates a camera from separate view and projection matrices.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view_proj: projection * view,
            force_lod0: false,
            shadow_force_lod0: false,
        }
    }

    /// Returns this camera with the main-view force-LOD0 flag set to `force`.
    pub fn with_force_lod0(mut self, force: bool) -> Self {
        self.force_lod0 = force;
        self
    }

    /// Returns this camera with the shadow-view force-LOD0 flag set to `force`.
    pub fn with_shadow_force_lod0(mut self, force: bool) -> Self {
        self.shadow_force_lod0 = force;
        self
    }
}

/// One frustum to cull against this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrustum {
    /// What the frustum renders for.
    pub kind: FrustumKind,
    /// Index into the shadow-view sub-array of this frustum's light type,
    /// `None` for the main view. Directional views are 0, point faces are
    /// `point_ordinal * 6 + face` and spot views are the spot ordinal.
    pub shadow_index: Option<u32>,
    /// Projection times view.
    pub view_proj: Mat4,
    /// Planes extracted from `view_proj`.
    pub planes: Frustum,
    /// Emit LOD 0 for every draw regardless of projected area.
    pub force_lod0: bool,
}

impl ViewFrustum {
    /// Creates a frustum and extracts its planes.
    pub fn new(kind: FrustumKind, shadow_index: Option<u32>, view_proj: Mat4) -> Self {
        Self {
            kind,
            shadow_index,
            view_proj,
            planes: Frustum::from_view_projection(&view_proj),
            force_lod0: false,
        }
    }

    /// The main view of `camera`.
    pub fn main(camera: &CameraView) -> Self {
        Self::new(FrustumKind::MainView, None, camera.view_proj).with_force_lod0(camera.force_lod0)
    }

    /// Returns this frustum with the force-LOD0 flag set to `force`.
    pub fn with_force_lod0(mut self, force: bool) -> Self {
        self.force_lod0 = force;
        self
    }
}

/// Everything the pipeline produced for one frame: the frustum set and one
/// render list per frustum, index-aligned.
#[derive(Debug, Default)]
pub struct SceneView {
    /// Frame counter this view was last prepared for.
    pub frame_index: u64,
    /// The frustums, main view first.
    pub frustums: Vec<ViewFrustum>,
    lists: Vec<FrustumRenderList>,
}

impl SceneView {
    /// Installs this frame's frustums and re-arms one list per frustum,
    /// reusing the allocations of the previous use of this slot.
    pub fn prepare(&mut self, frame_index: u64, frustums: Vec<ViewFrustum>) {
        self.frame_index = frame_index;
        self.lists.truncate(frustums.len());
        for (i, frustum) in frustums.iter().enumerate() {
            match self.lists.get_mut(i) {
                Some(list) => list.reset(frustum.kind, frustum.shadow_index),
                None => self
                    .lists
                    .push(FrustumRenderList::new(frustum.kind, frustum.shadow_index)),
            }
        }
        self.frustums = frustums;
    }

    /// The render lists, index-aligned with [`frustums`](Self::frustums).
    pub fn lists(&self) -> &[FrustumRenderList] {
        &self.lists
    }

    /// The list of frustum `index`.
    pub fn list(&self, index: usize) -> Option<&FrustumRenderList> {
        self.lists.get(index)
    }

    /// The main view's list.
    pub fn main_list(&self) -> Option<&FrustumRenderList> {
        self.lists.first().filter(|l| l.kind == FrustumKind::MainView)
    }

    /// The shadow views' lists, in shadow index order.
    pub fn shadow_lists(&self) -> impl Iterator<Item = &FrustumRenderList> {
        self.lists.iter().filter(|l| l.kind.is_shadow())
    }

    /// Moves the lists out so they can be filled by worker tasks.
    pub fn take_lists(&mut self) -> Vec<FrustumRenderList> {
        mem::take(&mut self.lists)
    }

    /// Hands filled lists back. They must be index-aligned with the frustums.
    pub fn restore_lists(&mut self, lists: Vec<FrustumRenderList>) {
        debug_assert_eq!(lists.len(), self.frustums.len(), "render lists out of step with frustums");
        self.lists = lists;
    }
}

/// Per-frame scene views for every frame in flight.
///
/// Frame `n` uses slot `n % frames_in_flight`, so the renderer can still read
/// the previous frame's lists while the next frame is being culled.
#[derive(Debug)]
pub struct SceneViewData {
    slots: Vec<SceneView>,
}

impl SceneViewData {
    /// Creates `frames_in_flight` empty slots (at least one).
    pub fn new(frames_in_flight: usize) -> Self {
        let count = frames_in_flight.max(1);
        Self {
            slots: (0..count).map(|_| SceneView::default()).collect(),
        }
    }

    /// Number of slots.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Slot index used by `frame_index`.
    pub fn slot_of(&self, frame_index: u64) -> usize {
        (frame_index % self.slots.len() as u64) as usize
    }

    /// The view of `frame_index`'s slot.
    pub fn view(&self, frame_index: u64) -> &SceneView {
        &self.slots[self.slot_of(frame_index)]
    }

    /// Mutable view of `frame_index`'s slot.
    pub fn view_mut(&mut self, frame_index: u64) -> &mut SceneView {
        let slot = self.slot_of(frame_index);
        &mut self.slots[slot]
    }
}

impl Default for SceneViewData {
    fn default() -> Self {
        Self::new(2)
    }
}
