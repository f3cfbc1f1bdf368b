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

//! # Vantage Lanes
//!
//! The hot-path lanes of the visibility pipeline.
//!
//! - [`BoundingVolumeLane`] turns the scene's objects into flat per-object and
//!   per-mesh world bounds.
//! - [`FrustumCullLane`] culls those bounds against the main view and every
//!   shadow view, picks a LOD, keys, sorts, and gathers the draws into one
//!   render list per frustum.
//! - [`VisibilityPipeline`] owns the worker pool and runs both lanes once per
//!   frame.

#![warn(missing_docs)]

pub mod bounds_lane;
pub mod config;
pub mod cull_lane;
mod pipeline;

pub use bounds_lane::BoundingVolumeLane;
pub use config::{ConfigError, CullingConfig};
pub use cull_lane::{CullStats, FrustumCullLane, LodPolicy, PendingCull, ShadowViews};
pub use pipeline::VisibilityPipeline;
