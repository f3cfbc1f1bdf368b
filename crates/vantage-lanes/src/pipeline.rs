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

//! The per-frame driver tying the lanes together.

use std::sync::Arc;

use vantage_core::task::{PoolHandle, WorkerPool};
use vantage_data::render::{BoundingVolumes, CameraView, SceneView, SceneViewData};
use vantage_data::scene::SceneProvider;

use crate::bounds_lane::BoundingVolumeLane;
use crate::config::{ConfigError, CullingConfig};
use crate::cull_lane::{CullStats, FrustumCullLane, ShadowViews};

/// Owns the worker pool, both lanes and the frame-slotted scene views, and
/// runs one frame of visibility at a time:
///
/// 1. build the bounding volumes of every object the scene reports;
/// 2. wait on the build's ready signal;
/// 3. derive the frustum set from the camera and the scene lights;
/// 4. cull into the render lists of the frame's scene-view slot.
#[derive(Debug)]
pub struct VisibilityPipeline {
    config: CullingConfig,
    pool: WorkerPool,
    bounds: BoundingVolumeLane,
    cull: FrustumCullLane,
    views: SceneViewData,
    volumes: BoundingVolumes,
    frame_index: u64,
    last_stats: CullStats,
}

impl VisibilityPipeline {
    /// Validates `config` and starts the worker pool.
    pub fn new(config: CullingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = WorkerPool::with_threads(config.resolved_worker_threads());
        log::info!(
            "Visibility pipeline ready: {} workers, {} frames in flight.",
            pool.thread_count(),
            config.frames_in_flight
        );
        Ok(Self {
            bounds: BoundingVolumeLane::new(&config),
            cull: FrustumCullLane::new(&config),
            views: SceneViewData::new(config.frames_in_flight),
            volumes: BoundingVolumes::empty(),
            frame_index: 0,
            last_stats: CullStats::default(),
            pool,
            config,
        })
    }

    /// Runs one frame and returns its scene view.
    pub fn run_frame<S>(&mut self, scene: &Arc<S>, camera: &CameraView) -> &SceneView
    where
        S: SceneProvider + 'static,
    {
        let frame = self.frame_index;
        let pool = self.pool.handle();

        let objects = scene.object_handles();
        self.volumes = self.bounds.build(&objects, scene, &pool);
        self.bounds.ready().wait();

        let frustums = ShadowViews::frustums(camera, scene.lights());
        let view = self.views.view_mut(frame);
        view.prepare(frame, frustums);
        self.last_stats = self.cull.run(view, &self.volumes, &pool);

        self.frame_index += 1;
        self.views.view(frame)
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &CullingConfig {
        &self.config
    }

    /// Handle to the worker pool, for callers that want to share it.
    pub fn pool(&self) -> PoolHandle {
        self.pool.handle()
    }

    /// Number of frames run so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The scene view of `frame`'s slot. Only meaningful for the last
    /// `frames_in_flight` frames.
    pub fn view(&self, frame: u64) -> &SceneView {
        self.views.view(frame)
    }

    /// Bounding volumes of the last frame.
    pub fn bounding_volumes(&self) -> &BoundingVolumes {
        &self.volumes
    }

    /// Statistics of the last cull pass.
    pub fn last_stats(&self) -> CullStats {
        self.last_stats
    }

    /// Stops the worker pool. Later frames run on the calling thread.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}
