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

//! Light definitions the shadow frustums are derived from.
//!
//! Only the geometric properties that shape a shadow view are carried here;
//! color and intensity belong to the renderer.

use vantage_core::math::Vec3;

/// A light infinitely far away, casting parallel rays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, from the light towards the scene.
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -0.5).normalize(),
        }
    }
}

/// A light emitting in all directions from a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    /// Distance beyond which the light has no effect.
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            range: 10.0,
        }
    }
}

/// A light emitting in a cone from a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// World-space position.
    pub position: Vec3,
    /// Direction the cone points to.
    pub direction: Vec3,
    /// Distance beyond which the light has no effect.
    pub range: f32,
    /// Half-angle of the cone in radians, measured from its axis.
    pub outer_cone_angle: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::new(0.0, -1.0, 0.0),
            range: 15.0,
            outer_cone_angle: 35.0_f32.to_radians(),
        }
    }
}

/// The kind of light and its shape parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// See [`DirectionalLight`].
    Directional(DirectionalLight),
    /// See [`PointLight`].
    Point(PointLight),
    /// See [`SpotLight`].
    Spot(SpotLight),
}

/// A light in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// The type and shape of the light.
    pub kind: LightKind,
    /// Disabled lights produce no shadow views.
    pub enabled: bool,
    /// Whether the light renders a shadow map.
    pub casts_shadows: bool,
}

impl Light {
    /// Creates an enabled, shadow-casting light.
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            enabled: true,
            casts_shadows: true,
        }
    }

    /// Creates a shadow-casting directional light.
    pub fn directional(direction: Vec3) -> Self {
        Self::new(LightKind::Directional(DirectionalLight { direction }))
    }

    /// Creates a shadow-casting point light.
    pub fn point(position: Vec3, range: f32) -> Self {
        Self::new(LightKind::Point(PointLight { position, range }))
    }

    /// Creates a shadow-casting spot light.
    pub fn spot(position: Vec3, direction: Vec3, range: f32, outer_cone_angle: f32) -> Self {
        Self::new(LightKind::Spot(SpotLight {
            position,
            direction,
            range,
            outer_cone_angle,
        }))
    }

    /// Returns this light with shadow casting turned off.
    pub fn without_shadows(mut self) -> Self {
        self.casts_shadows = false;
        self
    }

    /// Whether this light contributes shadow views this frame.
    #[inline]
    pub fn has_shadow_views(&self) -> bool {
        self.enabled && self.casts_shadows
    }
}
