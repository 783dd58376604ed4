// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene's update cycle: input sources, activities, then validation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::scene::Scene;

/// Something polled at the start of every [`Scene::process_inputs`].
pub trait InputSource {
    /// Deliver pending input. `now` is the new global time.
    fn process_input(&mut self, scene: &mut Scene, now: u64);
}

impl fmt::Debug for dyn InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSource").finish_non_exhaustive()
    }
}

/// Identifier of a registered input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputSourceId(u64);

#[derive(Debug, Default)]
pub(crate) struct InputSources {
    entries: Vec<(InputSourceId, Box<dyn InputSource>)>,
    next_id: u64,
    /// Sources taken out of `entries` while they run.
    in_flight: SmallVec<[InputSourceId; 4]>,
    /// In-flight sources removed before they were put back.
    removed: SmallVec<[InputSourceId; 2]>,
}

/// A millisecond time source for [`Scene::wait_for_activities`].
pub trait Clock {
    /// Current time in milliseconds.
    fn now(&self) -> u64;

    /// Wait for roughly `millis` milliseconds.
    fn sleep(&mut self, millis: u64);
}

/// A clock that only moves when told to. Sleeping advances it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManualClock {
    now: u64,
}

impl ManualClock {
    /// A clock reading `now`.
    #[must_use]
    pub const fn new(now: u64) -> Self {
        Self { now }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, millis: u64) {
        self.now = self.now.saturating_add(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now
    }

    fn sleep(&mut self, millis: u64) {
        self.advance(millis);
    }
}

/// Wall-clock time since the clock was created.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// A clock reading zero now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep(&mut self, millis: u64) {
        std::thread::sleep(std::time::Duration::from_millis(millis));
    }
}

impl Scene {
    /// Register an input source. Sources run in registration order.
    pub fn add_input_source(&mut self, source: Box<dyn InputSource>) -> InputSourceId {
        self.check_thread("input source registration");
        let sources = &mut self.input_sources;
        let id = InputSourceId(sources.next_id);
        sources.next_id += 1;
        sources.entries.push((id, source));
        id
    }

    /// Unregister an input source. Returns false if it was not registered.
    ///
    /// A source may remove itself, or another source, while inputs are being
    /// processed; removed sources that have not run yet are skipped.
    pub fn remove_input_source(&mut self, id: InputSourceId) -> bool {
        let sources = &mut self.input_sources;
        if let Some(index) = sources.entries.iter().position(|(i, _)| *i == id) {
            sources.entries.remove(index);
            return true;
        }
        if sources.in_flight.contains(&id) && !sources.removed.contains(&id) {
            sources.removed.push(id);
            return true;
        }
        false
    }

    /// Number of registered input sources.
    pub fn input_source_count(&self) -> usize {
        let sources = &self.input_sources;
        sources.entries.len() + sources.in_flight.len() - sources.removed.len()
    }

    /// Run one update cycle at time `now`.
    ///
    /// The global time is set to `now`, every input source runs, activities
    /// step, then full bounds and pending repaints are validated. Calls made
    /// from inside the cycle are ignored with a warning.
    pub fn process_inputs(&mut self, now: u64) {
        self.check_thread("input processing");
        if self.processing_inputs {
            log::warn!("process_inputs({now}) called while already processing inputs; ignored");
            return;
        }
        self.processing_inputs = true;
        self.global_time = now;

        let mut running = core::mem::take(&mut self.input_sources.entries);
        self.input_sources.in_flight = running.iter().map(|(id, _)| *id).collect();
        for (id, source) in &mut running {
            if !self.input_sources.removed.contains(id) {
                source.process_input(self, now);
            }
        }
        let removed = core::mem::take(&mut self.input_sources.removed);
        self.input_sources.in_flight.clear();
        running.retain(|(id, _)| !removed.contains(id));
        running.append(&mut self.input_sources.entries);
        self.input_sources.entries = running;

        self.process_activities(now);
        self.validate();
        self.processing_inputs = false;
    }

    /// Time passed to the latest [`process_inputs`](Self::process_inputs).
    pub fn global_time(&self) -> u64 {
        self.global_time
    }

    /// Whether an update cycle would do anything: activities are scheduled
    /// or some cache is stale.
    pub fn needs_update(&self) -> bool {
        !self.activities.is_empty()
            || self
                .parentless()
                .iter()
                .any(|&id| !self.dirty(id).is_empty())
    }

    /// Run update cycles on `clock` until no activities remain.
    ///
    /// Never returns while an unbounded activity is scheduled.
    pub fn wait_for_activities(&mut self, clock: &mut dyn Clock) {
        if self.processing_inputs {
            log::warn!("wait_for_activities called while processing inputs; ignored");
            return;
        }
        while !self.activities.is_empty() {
            self.process_inputs(clock.now());
            if !self.activities.is_empty() {
                clock.sleep(self.config.step_rate.max(1));
            }
        }
    }
}
