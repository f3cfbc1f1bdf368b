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

//! Worker-thread pool and counting-signal synchronization.
//!
//! Work is coordinated with fork-join batches: a producer partitions its
//! items with [`partition_work`], submits one task per range, keeps one range
//! for itself, and then blocks on a [`CountingSignal`] until every range has
//! reported in ([`fork_join`] packages that pattern). Threads are only joined
//! when the pool shuts down.

mod fork_join;
mod partition;
mod pool;
mod signal;

pub use fork_join::fork_join;
pub use partition::partition_work;
pub use pool::{PoolHandle, TaskError, TaskHandle, TaskPriority, WorkerPool};
pub use signal::CountingSignal;
