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

//! Frustum plane sets and the AABB/point visibility tests.
//!
//! Planes are extracted from a view-projection matrix using the [0, 1] depth
//! convention of the `*_zo` projections in [`Mat4`]. The plane order is fixed
//! (right, left, top, bottom, far, near) and every test walks it in that order.

use super::{Aabb, Mat4, Vec3, Vec4, EPSILON};

/// Default margin for [`Frustum::intersects_aabb`].
///
/// Slightly negative so a box touching a plane within float noise is kept.
pub const CULL_EPSILON: f32 = -EPSILON;

/// A plane `a*x + b*y + c*z + d = 0`, with the normal pointing into the frustum.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Plane {
    /// The plane normal `(a, b, c)`. Unit length after extraction.
    pub normal: Vec3,
    /// The `d` term.
    pub d: f32,
}

impl Plane {
    /// Builds a plane from raw `(a, b, c, d)` coefficients and normalizes it.
    ///
    /// A zero-length normal is left as is; such a plane never rejects anything
    /// with a positive `d`.
    #[inline]
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len > EPSILON {
            Self {
                normal: normal / len,
                d: v.w / len,
            }
        } else {
            Self { normal, d: v.w }
        }
    }

    /// Signed distance from `point` to the plane; positive on the inner side.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// The six bounding planes of a view volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frustum {
    /// Right, left, top, bottom, far, near.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Index of the right plane.
    pub const RIGHT: usize = 0;
    /// Index of the left plane.
    pub const LEFT: usize = 1;
    /// Index of the top plane.
    pub const TOP: usize = 2;
    /// Index of the bottom plane.
    pub const BOTTOM: usize = 3;
    /// Index of the far plane.
    pub const FAR: usize = 4;
    /// Index of the near plane.
    pub const NEAR: usize = 5;

    /// Extracts the six planes from a view-projection matrix.
    ///
    /// A clip-space point is inside when `-w <= x <= w`, `-w <= y <= w` and
    /// `0 <= z <= w`; each inequality becomes one plane built from the matrix
    /// rows.
    pub fn from_view_projection(m: &Mat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);

        let mut planes = [Plane::default(); 6];
        planes[Self::RIGHT] = Plane::from_coefficients(r3 - r0);
        planes[Self::LEFT] = Plane::from_coefficients(r3 + r0);
        planes[Self::TOP] = Plane::from_coefficients(r3 - r1);
        planes[Self::BOTTOM] = Plane::from_coefficients(r3 + r1);
        planes[Self::FAR] = Plane::from_coefficients(r3 - r2);
        planes[Self::NEAR] = Plane::from_coefficients(r2);
        Self { planes }
    }

    /// Returns `true` if `point` is inside or on every plane.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }

    /// Tests an AABB against the frustum with the default [`CULL_EPSILON`].
    #[inline]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.intersects_aabb_eps(aabb, CULL_EPSILON)
    }

    /// Tests an AABB against the frustum.
    ///
    /// The box is rejected as soon as one plane has
    /// `dot(|n|, extent) + signed_distance(center) < epsilon`, i.e. the whole
    /// box lies on the outer side of that plane. This is conservative: boxes
    /// near frustum corners may be accepted although they are outside.
    #[inline]
    pub fn intersects_aabb_eps(&self, aabb: &Aabb, epsilon: f32) -> bool {
        let center = aabb.center();
        let extent = aabb.half_extents();
        self.planes.iter().all(|plane| {
            plane.normal.abs().dot(extent) + plane.signed_distance(center) >= epsilon
        })
    }
}

/// Returns the eight world-space corners of the volume covered by `view_proj`.
///
/// Corners follow [`Aabb::corners`] ordering over NDC `[-1, 1]² x [0, 1]`.
/// Returns `None` if the matrix cannot be inverted.
pub fn frustum_corners(view_proj: &Mat4) -> Option<[Vec3; 8]> {
    let inv = view_proj.inverse()?;
    let ndc = Aabb::from_min_max(Vec3::new(-1.0, -1.0, 0.0), Vec3::ONE);
    Some(ndc.corners().map(|c| {
        let p = inv.project_point(c);
        p.truncate() / p.w
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, FRAC_PI_2};

    fn camera() -> Mat4 {
        // Camera at the origin looking down -Z, 90 degree fov, near 1, far 100.
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y).unwrap();
        Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 1.0, 100.0) * view
    }

    /// Reference test: reject only when all eight corners are outside one plane.
    fn brute_force_intersects(frustum: &Frustum, aabb: &Aabb) -> bool {
        frustum.planes.iter().all(|plane| {
            aabb.corners()
                .iter()
                .any(|c| plane.signed_distance(*c) >= CULL_EPSILON)
        })
    }

    /// Small deterministic generator so the test does not need a RNG crate.
    struct Lcg(u64);

    impl Lcg {
        fn next_f32(&mut self, lo: f32, hi: f32) -> f32 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (self.0 >> 40) as f32 / (1u64 << 24) as f32;
            lo + unit * (hi - lo)
        }
    }

    #[test]
    fn test_plane_order_and_normals() {
        let frustum = Frustum::from_view_projection(&camera());
        for plane in &frustum.planes {
            assert!(approx_eq(plane.normal.length(), 1.0));
        }
        // Near plane faces -Z (into the view), at distance 1 from the eye.
        let near = frustum.planes[Frustum::NEAR];
        assert!(approx_eq(near.normal.z, -1.0));
        assert!(approx_eq(near.signed_distance(Vec3::new(0.0, 0.0, -1.0)), 0.0));
        // Far plane faces +Z at distance 100.
        let far = frustum.planes[Frustum::FAR];
        assert!(approx_eq(far.normal.z, 1.0));
        assert!(approx_eq(far.signed_distance(Vec3::new(0.0, 0.0, -100.0)), 0.0));
        // Right plane normal points left (-X), left plane normal points right.
        assert!(frustum.planes[Frustum::RIGHT].normal.x < 0.0);
        assert!(frustum.planes[Frustum::LEFT].normal.x > 0.0);
        assert!(frustum.planes[Frustum::TOP].normal.y < 0.0);
        assert!(frustum.planes[Frustum::BOTTOM].normal.y > 0.0);
    }

    #[test]
    fn test_contains_point() {
        let frustum = Frustum::from_view_projection(&camera());
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -0.5)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -150.0)));
        assert!(!frustum.contains_point(Vec3::new(20.0, 0.0, -10.0)));
    }

    #[test]
    fn test_aabb_inside_outside_straddling() {
        let frustum = Frustum::from_view_projection(&camera());
        let inside = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);
        let behind = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE);
        let straddling = Aabb::from_center_half_extents(Vec3::new(10.0, 0.0, -10.0), Vec3::ONE);
        assert!(frustum.intersects_aabb(&inside));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(frustum.intersects_aabb(&straddling));
    }

    #[test]
    fn test_rejection_agrees_with_brute_force() {
        let frustum = Frustum::from_view_projection(&camera());
        let mut rng = Lcg(0x5eed);
        for _ in 0..2000 {
            let center = Vec3::new(
                rng.next_f32(-120.0, 120.0),
                rng.next_f32(-120.0, 120.0),
                rng.next_f32(-150.0, 30.0),
            );
            let half = Vec3::new(
                rng.next_f32(0.0, 10.0),
                rng.next_f32(0.0, 10.0),
                rng.next_f32(0.0, 10.0),
            );
            let aabb = Aabb::from_center_half_extents(center, half);
            // The extent test and the corner test are the same per-plane
            // separation, so they must agree exactly up to float noise.
            if !frustum.intersects_aabb(&aabb) {
                assert!(!brute_force_intersects(&frustum, &aabb), "{aabb:?}");
                assert!(!aabb.corners().iter().any(|c| frustum.contains_point(*c)));
            }
        }
    }

    #[test]
    fn test_frustum_corners_round_trip() {
        let view_proj = camera();
        let corners = frustum_corners(&view_proj).unwrap();
        let frustum = Frustum::from_view_projection(&view_proj);
        for corner in corners {
            for plane in &frustum.planes {
                assert!(plane.signed_distance(corner) > -1e-2);
            }
        }
        // Far corners sit at z = -100.
        assert!((corners[7].z + 100.0).abs() < 1e-2);
        assert!((corners[0].z + 1.0).abs() < 1e-3);
    }
}
