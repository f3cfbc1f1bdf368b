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

/// Splits `[0, items)` into contiguous, non-overlapping ranges for a fork-join
/// batch of `threads` workers plus the calling thread.
///
/// The number of ranges is `min(threads + 1, ceil(items / min_per_range))`, with
/// at least one range whenever `items > 0`. The remainder of the division is
/// spread over the leading ranges, so range lengths differ by at most one.
///
/// A `min_per_range` of zero is treated as one.
pub fn partition_work(items: usize, threads: usize, min_per_range: usize) -> Vec<Range<usize>> {
    if items == 0 {
        return Vec::new();
    }

    let min_per_range = min_per_range.max(1);
    let wanted = items.div_ceil(min_per_range);
    let count = wanted.min(threads.saturating_add(1)).max(1);

    let base = items / count;
    let remainder = items % count;

    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let len = base + usize::from(i < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    debug_assert_eq!(start, items, "partition must cover every item");
    ranges
}
