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

//! Screen-coverage based level-of-detail selection.

use vantage_core::math::{Aabb, Mat4, Vec2, EPSILON};
use vantage_core::renderer::SortKey;

use crate::config::CullingConfig;

/// Area of the whole NDC square `[-1, 1]²`.
pub const FULL_SCREEN_AREA: f32 = 4.0;

/// Area of the NDC rectangle covered by `aabb` seen through `view_proj`.
///
/// All eight corners are projected and their bounding rectangle is clamped to
/// the screen. A box with a corner on or behind the eye plane (`w <= ε`)
/// cannot be projected meaningfully and counts as covering the full screen.
pub fn projected_area(aabb: &Aabb, view_proj: &Mat4) -> f32 {
    let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
    let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);

    for corner in aabb.corners() {
        let clip = view_proj.project_point(corner);
        if clip.w <= EPSILON {
            return FULL_SCREEN_AREA;
        }
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        min = min.min(ndc);
        max = max.max(ndc);
    }

    let min = min.max(Vec2::new(-1.0, -1.0));
    let max = max.min(Vec2::new(1.0, 1.0));
    (max.x - min.x).max(0.0) * (max.y - min.y).max(0.0)
}

/// Maps projected area to a LOD index.
///
/// Starting at LOD 0 with `area_threshold`, the LOD is incremented and the
/// threshold multiplied by `area_falloff` for as long as the area stays below
/// the threshold and coarser LODs remain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodPolicy {
    /// Area under which LOD 1 is used.
    pub area_threshold: f32,
    /// Threshold factor per further LOD.
    pub area_falloff: f32,
}

impl LodPolicy {
    /// The policy configured in `config`.
    pub fn from_config(config: &CullingConfig) -> Self {
        Self {
            area_threshold: config.lod_area_threshold,
            area_falloff: config.lod_area_falloff,
        }
    }

    /// Selects the LOD for a mesh with `lod_count` levels covering `area`.
    pub fn select(&self, area: f32, lod_count: u8) -> u8 {
        let coarsest = lod_count.clamp(1, SortKey::MAX_LOD_COUNT) - 1;
        let mut lod = 0;
        let mut threshold = self.area_threshold;
        while area < threshold && lod < coarsest {
            lod += 1;
            threshold *= self.area_falloff;
        }
        lod
    }
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self::from_config(&CullingConfig::default())
    }
}
