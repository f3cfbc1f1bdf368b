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

//! Tuning knobs of the visibility pipeline.

use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};
use vantage_core::math::frustum::CULL_EPSILON;

/// Errors raised while loading or validating a [`CullingConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The RON text could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The configuration could not be written as RON.
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// A field holds a value the pipeline cannot run with.
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value is rejected.
        reason: &'static str,
    },
}

/// Configuration of the bounding-volume and cull lanes.
///
/// Every field has a default, so a RON document only needs to name the
/// fields it overrides:
///
/// ```
/// use vantage_lanes::CullingConfig;
///
/// let config = CullingConfig::from_ron_str("(worker_threads: Some(4))").unwrap();
/// assert_eq!(config.worker_threads, Some(4));
/// assert_eq!(config.min_objects_per_range, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    /// Worker threads to start. `None` uses the available parallelism minus
    /// one, leaving a core for the dispatching thread.
    pub worker_threads: Option<usize>,
    /// Number of scene-view slots.
    pub frames_in_flight: usize,
    /// Minimum objects per range in the object pass of the bounds build.
    pub min_objects_per_range: usize,
    /// Minimum mesh boxes per range in the mesh pass of the bounds build.
    pub min_meshes_per_range: usize,
    /// Minimum frustums per range when the cull pass is threaded.
    pub min_frustums_per_range: usize,
    /// Below this many mesh boxes the cull pass runs on the calling thread.
    pub cull_threading_threshold: usize,
    /// Projected area under which LOD 1 is selected.
    pub lod_area_threshold: f32,
    /// Factor applied to the threshold for each further LOD.
    pub lod_area_falloff: f32,
    /// Plane-test tolerance. Negative values keep boxes touching a plane.
    pub cull_epsilon: f32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            frames_in_flight: 2,
            min_objects_per_range: 256,
            min_meshes_per_range: 256,
            min_frustums_per_range: 1,
            cull_threading_threshold: 128,
            lod_area_threshold: 0.1,
            lod_area_falloff: 0.1,
            cull_epsilon: CULL_EPSILON,
        }
    }
}

impl CullingConfig {
    /// Parses and validates a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a RON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Writes the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Checks the invariants the lanes rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("frames_in_flight", self.frames_in_flight),
            ("min_objects_per_range", self.min_objects_per_range),
            ("min_meshes_per_range", self.min_meshes_per_range),
            ("min_frustums_per_range", self.min_frustums_per_range),
        ];
        if let Some(&(field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid {
                field,
                reason: "must be at least 1",
            });
        }

        let fractions = [
            ("lod_area_threshold", self.lod_area_threshold),
            ("lod_area_falloff", self.lod_area_falloff),
        ];
        for (field, value) in fractions {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must lie strictly between 0 and 1",
                });
            }
        }

        if !self.cull_epsilon.is_finite() {
            return Err(ConfigError::Invalid {
                field: "cull_epsilon",
                reason: "must be finite",
            });
        }
        Ok(())
    }

    /// The worker count to start the pool with.
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(0)
        })
    }
}
