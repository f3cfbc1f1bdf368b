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

//! Provides a Quaternion type for representing object rotations.

use serde::{Deserialize, Serialize};

use super::{Vec3, EPSILON};
use std::ops::Mul;

/// A rotation quaternion stored as `(x, y, z, w)`, where `[x, y, z]` is the
/// vector part and `w` the scalar part.
///
/// Rotations should be unit quaternions; [`Mat4::from_quat`](super::Mat4::from_quat)
/// assumes so.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Quaternion {
    /// The x component of the vector part.
    pub x: f32,
    /// The y component of the vector part.
    pub y: f32,
    /// The z component of the vector part.
    pub z: f32,
    /// The scalar (real) part.
    pub w: f32,
}

impl Quaternion {
    /// The identity quaternion, representing no rotation.
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a quaternion representing a rotation of `angle_radians` around `axis`.
    /// The axis is normalized first.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle_radians: f32) -> Self {
        let axis = axis.normalize();
        let (s, c) = (angle_radians * 0.5).sin_cos();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: c,
        }
    }

    /// Returns a unit-length copy, or the identity for a near-zero quaternion.
    #[inline]
    pub fn normalize(&self) -> Self {
        let mag_sq = self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w;
        if mag_sq > EPSILON * EPSILON {
            let inv = 1.0 / mag_sq.sqrt();
            Self {
                x: self.x * inv,
                y: self.y * inv,
                z: self.z * inv,
                w: self.w * inv,
            }
        } else {
            Self::IDENTITY
        }
    }

    /// Rotates a vector by this quaternion.
    #[inline]
    pub fn rotate_vec3(&self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }
}

impl Default for Quaternion {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;
    /// Composes two rotations; `a * b` applies `b` first.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat4, FRAC_PI_2};
    use approx::assert_relative_eq; // For float comparisons

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert_relative_eq!(a.x, b.x, epsilon = EPSILON * 10.0);
        assert_relative_eq!(a.y, b.y, epsilon = EPSILON * 10.0);
        assert_relative_eq!(a.z, b.z, epsilon = EPSILON * 10.0);
    }

    #[test]
    fn test_rotation_matches_matrix() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 2.0, 0.0), FRAC_PI_2);
        let v = Vec3::new(1.0, 2.0, 3.0);
        let by_quat = q.rotate_vec3(v);
        let by_mat = Mat4::from_quat(q).transform_point(v);
        let by_rot_y = Mat4::from_rotation_y(FRAC_PI_2).transform_point(v);
        assert_vec3_eq(by_quat, by_mat);
        assert_vec3_eq(by_mat, by_rot_y);
    }

    #[test]
    fn test_composition() {
        let a = Quaternion::from_axis_angle(Vec3::Y, 0.3);
        let b = Quaternion::from_axis_angle(Vec3::Y, 0.4);
        let ab = a * b;
        let expected = Quaternion::from_axis_angle(Vec3::Y, 0.7);
        assert_vec3_eq(ab.rotate_vec3(Vec3::X), expected.rotate_vec3(Vec3::X));
        assert_relative_eq!(ab.w, expected.w, epsilon = EPSILON * 10.0);
    }

    #[test]
    fn test_normalize_zero_is_identity() {
        let q = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
        assert_eq!(q.normalize(), Quaternion::IDENTITY);
    }
}
