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

//! # Vantage Data
//!
//! The data side of the visibility pipeline.
//!
//! - [`scene`] is the contract with the scene owner: object handles, transforms,
//!   models resolving to (mesh, material) pairs, material flags and lights,
//!   plus [`scene::SceneStore`], an in-memory implementation of that contract.
//! - [`render`] holds the per-frame products: the flat bounding-volume arrays,
//!   the per-frustum render lists and the frame-slotted scene views that own
//!   them.

#![warn(missing_docs)]

pub mod render;
pub mod scene;
