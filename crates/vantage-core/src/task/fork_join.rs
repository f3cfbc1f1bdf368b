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

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use super::{CountingSignal, PoolHandle, TaskPriority};

/// Reports one finished range when dropped, whether the task ran to
/// completion, panicked, or was dropped unexecuted by a pool shutdown.
struct RangeReport(Arc<CountingSignal>);

impl Drop for RangeReport {
    fn drop(&mut self) {
        self.0.add(1);
    }
}

/// Runs `job` once per range as a fork-join batch and returns the results in
/// range order.
///
/// Every range but the first is submitted to `pool`; the first runs on the
/// calling thread. The caller then drains whatever is still queued and blocks
/// on a [`CountingSignal`] until every range has reported. With no workers,
/// or a single range, everything runs inline.
///
/// A range whose task produced nothing (it panicked or was dropped by a
/// shutdown) is recomputed on the calling thread.
pub fn fork_join<T, F>(
    pool: &PoolHandle,
    ranges: Vec<Range<usize>>,
    priority: TaskPriority,
    job: F,
) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(Range<usize>) -> T + Send + Sync + 'static,
{
    if ranges.len() <= 1 || pool.thread_count() == 0 {
        return ranges.into_iter().map(job).collect();
    }

    let job = Arc::new(job);
    let slots: Arc<[Mutex<Option<T>>]> = ranges.iter().map(|_| Mutex::new(None)).collect();
    let done = Arc::new(CountingSignal::new());

    for (index, range) in ranges.iter().cloned().enumerate().skip(1) {
        let job = Arc::clone(&job);
        let slots = Arc::clone(&slots);
        let report = RangeReport(Arc::clone(&done));
        pool.submit(
            move || {
                let _report = report;
                let value = job(range);
                *slots[index].lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
            },
            priority,
        );
    }

    let first = job(ranges[0].clone());
    *slots[0].lock().unwrap_or_else(PoisonError::into_inner) = Some(first);
    done.add(1);

    pool.run_pending_on_calling_thread();
    done.wait_for_count(ranges.len());

    ranges
        .into_iter()
        .zip(slots.iter())
        .map(|(range, slot)| {
            let value = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            value.unwrap_or_else(|| {
                log::warn!("Range {range:?} produced no result; recomputing on the calling thread.");
                job(range)
            })
        })
        .collect()
}
