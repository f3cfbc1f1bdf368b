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

//! Derives a frame's frustum set from the camera and the scene's lights.

use vantage_core::math::frustum::frustum_corners;
use vantage_core::math::{Mat4, Vec3, Vec4, FRAC_PI_2};
use vantage_data::render::{CameraView, FrustumKind, ViewFrustum};
use vantage_data::scene::{DirectionalLight, Light, LightKind, PointLight, SpotLight};

/// Near plane of perspective shadow views.
const SHADOW_NEAR: f32 = 0.1;

/// Depth added on both sides of a directional light's fitted box so casters
/// outside the camera frustum still land in the shadow map.
const DIRECTIONAL_Z_PADDING: f32 = 100.0;

/// Look direction and up vector of each point-light cube face, in
/// +X, -X, +Y, -Y, +Z, -Z order.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0)),
];

/// Builds the ordered frustum set of a frame.
///
/// The order is fixed: the main view, then at most one directional shadow
/// view, then six cube faces per shadowed point light, then one view per
/// shadowed spot light. Each shadow view's `shadow_index` addresses the
/// sub-array of its light type: 0 for the directional view,
/// `point_ordinal * 6 + face` for cube faces, the spot ordinal for spots.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShadowViews;

impl ShadowViews {
    /// Returns the main view followed by every shadow view.
    ///
    /// Shadow views inherit `camera.shadow_force_lod0`.
    pub fn frustums(camera: &CameraView, lights: &[Light]) -> Vec<ViewFrustum> {
        let mut frustums = vec![ViewFrustum::main(camera)];
        let shadow = |kind: FrustumKind, shadow_index: u32, view_proj: Mat4| {
            ViewFrustum::new(kind, Some(shadow_index), view_proj)
                .with_force_lod0(camera.shadow_force_lod0)
        };

        let shadowed = || lights.iter().enumerate().filter(|(_, l)| l.has_shadow_views());

        let mut directionals = shadowed().filter_map(|(_, l)| match l.kind {
            LightKind::Directional(d) => Some(d),
            _ => None,
        });
        if let Some(directional) = directionals.next() {
            frustums.push(shadow(
                FrustumKind::DirectionalShadow,
                0,
                Self::directional(&directional, &camera.view_proj),
            ));
            let ignored = directionals.count();
            if ignored > 0 {
                log::debug!("{ignored} extra directional shadow casters ignored.");
            }
        }

        let points = shadowed().filter_map(|(i, l)| match l.kind {
            LightKind::Point(p) => Some((i as u32, p)),
            _ => None,
        });
        for (ordinal, (light, point)) in points.enumerate() {
            for (face, view_proj) in Self::point_faces(&point).into_iter().enumerate() {
                let kind = FrustumKind::PointShadow {
                    light,
                    face: face as u8,
                };
                frustums.push(shadow(kind, (ordinal * 6 + face) as u32, view_proj));
            }
        }

        let spots = shadowed().filter_map(|(i, l)| match l.kind {
            LightKind::Spot(s) => Some((i as u32, s)),
            _ => None,
        });
        for (ordinal, (light, spot)) in spots.enumerate() {
            let kind = FrustumKind::SpotShadow { light };
            frustums.push(shadow(kind, ordinal as u32, Self::spot(&spot)));
        }

        frustums
    }

    /// Orthographic light projection fitted to the camera frustum.
    ///
    /// The light looks along its direction from the center of the camera
    /// frustum; the camera corners, expressed in light space, bound the
    /// projection, padded in depth.
    pub fn directional(light: &DirectionalLight, camera_view_proj: &Mat4) -> Mat4 {
        let Some(corners) = frustum_corners(camera_view_proj) else {
            log::warn!("Camera matrix is not invertible; directional shadow view left as identity.");
            return Mat4::IDENTITY;
        };

        let light_dir = light.direction.normalize();
        let center = corners.iter().fold(Vec3::ZERO, |acc, c| acc + *c) / 8.0;
        let light_view = Mat4::look_at_rh(center, center + light_dir, up_for(light_dir))
            .unwrap_or(Mat4::IDENTITY);

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for corner in corners {
            let p = (light_view * Vec4::from_vec3(corner, 1.0)).truncate();
            min = min.min(p);
            max = max.max(p);
        }

        // Light space looks down -Z: view depth is -z.
        let light_proj = Mat4::orthographic_rh_zo(
            min.x,
            max.x,
            min.y,
            max.y,
            -max.z - DIRECTIONAL_Z_PADDING,
            -min.z + DIRECTIONAL_Z_PADDING,
        );
        light_proj * light_view
    }

    /// The six 90° cube-face projections of a point light, in +X, -X, +Y,
    /// -Y, +Z, -Z order.
    pub fn point_faces(light: &PointLight) -> [Mat4; 6] {
        let far = light.range.max(SHADOW_NEAR * 2.0);
        let proj = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, SHADOW_NEAR, far);
        CUBE_FACES.map(|(dir, up)| {
            let view = Mat4::look_at_rh(light.position, light.position + dir, up)
                .unwrap_or(Mat4::IDENTITY);
            proj * view
        })
    }

    /// Perspective projection covering a spot light's cone.
    pub fn spot(light: &SpotLight) -> Mat4 {
        let light_dir = light.direction.normalize();
        let view = Mat4::look_at_rh(light.position, light.position + light_dir, up_for(light_dir))
            .unwrap_or(Mat4::IDENTITY);
        let fov = (light.outer_cone_angle * 2.0).clamp(0.01, 3.1);
        let far = light.range.max(SHADOW_NEAR * 2.0);
        Mat4::perspective_rh_zo(fov, 1.0, SHADOW_NEAR, far) * view
    }
}

fn up_for(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}
