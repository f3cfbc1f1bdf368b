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

//! A counting signal: a one-shot gate that can also carry a count.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct SignalState {
    fired: bool,
    count: usize,
}

/// A synchronization primitive supporting "notify, optionally with a count" and
/// "wait, optionally until a predicate on the count holds".
///
/// It is used in two ways:
///
/// * as a one-shot gate: [`notify`](Self::notify) once, consumers
///   [`wait`](Self::wait);
/// * as a count-carrying gate: producers [`add`](Self::add) or
///   [`notify_count`](Self::notify_count), consumers
///   [`wait_for_count`](Self::wait_for_count) or [`wait_until`](Self::wait_until).
///
/// Waits are unconditional; there is no timeout.
#[derive(Debug, Default)]
pub struct CountingSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl CountingSignal {
    /// Creates an unfired signal with a count of zero.
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking task can poison the mutex; the state is two plain fields
    // that are always written together, so it is safe to keep using it.
    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires the signal without changing its count.
    pub fn notify(&self) {
        self.lock().fired = true;
        self.cond.notify_all();
    }

    /// Sets the count and fires the signal.
    pub fn notify_count(&self, count: usize) {
        {
            let mut state = self.lock();
            state.count = count;
            state.fired = true;
        }
        self.cond.notify_all();
    }

    /// Adds `n` to the count and fires the signal. Used by fork-join batches
    /// where each finished range reports in.
    pub fn add(&self, n: usize) {
        {
            let mut state = self.lock();
            state.count += n;
            state.fired = true;
        }
        self.cond.notify_all();
    }

    /// Blocks until the signal has fired, then returns the current count.
    pub fn wait(&self) -> usize {
        let guard = self
            .cond
            .wait_while(self.lock(), |state| !state.fired)
            .unwrap_or_else(PoisonError::into_inner);
        guard.count
    }

    /// Blocks until the count reaches at least `target`.
    ///
    /// Returns immediately for a `target` of zero.
    pub fn wait_for_count(&self, target: usize) -> usize {
        self.wait_until(|count| count >= target)
    }

    /// Blocks until `predicate` holds for the current count, and returns it.
    ///
    /// The predicate is evaluated under the signal's lock, before the first
    /// sleep and after every notification.
    pub fn wait_until(&self, mut predicate: impl FnMut(usize) -> bool) -> usize {
        let guard = self
            .cond
            .wait_while(self.lock(), |state| !predicate(state.count))
            .unwrap_or_else(PoisonError::into_inner);
        guard.count
    }

    /// Returns `true` once the signal has fired.
    pub fn is_fired(&self) -> bool {
        self.lock().fired
    }

    /// Returns the current count without waiting.
    pub fn count(&self) -> usize {
        self.lock().count
    }

    /// Clears the fired flag and the count, re-arming the signal for the next frame.
    pub fn reset(&self) {
        *self.lock() = SignalState::default();
    }
}
