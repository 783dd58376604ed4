// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Activities: time-driven changes stepped by the scene.
//!
//! An [`Activity`] owns an [`ActivityTarget`] and decides when to start it,
//! step it and finish it. The scene steps every scheduled activity from
//! [`Scene::process_inputs`], after input sources have run.
//!
//! Times are integer milliseconds on whatever clock the caller feeds in.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::scene::Scene;
use crate::transform::{Transform, TransformError};
use crate::types::{Color, NodeId};

/// Identifier of a scheduled activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityId(u64);

/// How an activity's progress maps onto its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InterpolationMode {
    /// 0 at the start, 1 at the end.
    #[default]
    SourceToDestination,
    /// 1 at the start, 0 at the end.
    DestinationToSource,
    /// 0 at the start, 1 halfway, back to 0 at the end.
    SourceToDestinationToSource,
}

impl InterpolationMode {
    /// Map progress `t` in `0.0..=1.0` to the value handed to the target.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::SourceToDestination => t,
            Self::DestinationToSource => 1.0 - t,
            Self::SourceToDestinationToSource => {
                if t <= 0.5 {
                    t * 2.0
                } else {
                    1.0 - (t - 0.5) * 2.0
                }
            }
        }
    }
}

/// What [`Scene::terminate_activity`] does with the target.
///
/// Whatever the last step applied stays applied; termination never rolls back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TerminationBehavior {
    /// Drop the activity as it is.
    WithoutFinishing,
    /// Apply the end value and finish, starting first if it never started.
    #[default]
    AndFinish,
    /// Apply the end value and finish only if it has started.
    AndFinishIfStepping,
}

/// One step of an activity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Milliseconds since the current loop started.
    pub elapsed: u64,
    /// Interpolation value after easing and [`InterpolationMode`].
    ///
    /// Unbounded activities have no progress and always see the mode's start value.
    pub t: f64,
}

/// What an activity changes.
pub trait ActivityTarget {
    /// Called when a loop starts, before the first [`apply`](Self::apply) of that loop.
    fn started(&mut self, scene: &mut Scene, first_loop: bool) {
        let _ = (scene, first_loop);
    }

    /// Apply one step.
    fn apply(&mut self, scene: &mut Scene, step: Step);

    /// Called after the final value of a loop was applied.
    fn finished(&mut self, scene: &mut Scene) {
        let _ = scene;
    }
}

impl fmt::Debug for dyn ActivityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityTarget").finish_non_exhaustive()
    }
}

/// A scheduled change over time.
#[derive(Debug)]
pub struct Activity {
    start_time: Option<u64>,
    duration: Option<u64>,
    step_rate: Option<u64>,
    next_step_time: u64,
    stepping: bool,
    mode: InterpolationMode,
    loop_count: u32,
    slow_in_slow_out: bool,
    first_loop: bool,
    target: Box<dyn ActivityTarget>,
}

impl Activity {
    /// An activity lasting `duration` milliseconds.
    ///
    /// It starts at the scene's global time and steps at the scene's default
    /// rate unless told otherwise.
    pub fn new(duration: u64, target: impl ActivityTarget + 'static) -> Self {
        Self::with_duration(Some(duration), Box::new(target))
    }

    /// An activity that runs until terminated.
    pub fn unbounded(target: impl ActivityTarget + 'static) -> Self {
        Self::with_duration(None, Box::new(target))
    }

    fn with_duration(duration: Option<u64>, target: Box<dyn ActivityTarget>) -> Self {
        Self {
            start_time: None,
            duration,
            step_rate: None,
            next_step_time: 0,
            stepping: false,
            mode: InterpolationMode::default(),
            loop_count: 1,
            slow_in_slow_out: true,
            first_loop: true,
            target,
        }
    }

    /// Start at `start_time` instead of the scene's current time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: u64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Step at most once every `step_rate` milliseconds.
    #[must_use]
    pub fn with_step_rate(mut self, step_rate: u64) -> Self {
        self.step_rate = Some(step_rate);
        self
    }

    /// Set the interpolation mode.
    #[must_use]
    pub fn with_mode(mut self, mode: InterpolationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run `loop_count` times; `u32::MAX` loops forever.
    #[must_use]
    pub fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Ease in and out (on by default).
    #[must_use]
    pub fn with_slow_in_slow_out(mut self, enabled: bool) -> Self {
        self.slow_in_slow_out = enabled;
        self
    }

    /// When the current loop starts, once scheduled.
    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    /// Length of one loop; `None` when unbounded.
    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    /// When the current loop ends; `None` when unbounded or not yet scheduled.
    pub fn stop_time(&self) -> Option<u64> {
        Some(self.start_time?.saturating_add(self.duration?))
    }

    /// Whether the current loop has started and not finished.
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Loops left, including the current one.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    fn progress(&self, elapsed: u64) -> f64 {
        let Some(duration) = self.duration else {
            return self.mode.apply(0.0);
        };
        let t = if duration == 0 {
            1.0
        } else {
            (elapsed as f64 / duration as f64).clamp(0.0, 1.0)
        };
        let t = if self.slow_in_slow_out {
            slow_in_slow_out(t)
        } else {
            t
        };
        self.mode.apply(t)
    }

    fn start(&mut self, scene: &mut Scene) {
        self.stepping = true;
        self.target.started(scene, self.first_loop);
        let t = self.mode.apply(0.0);
        self.target.apply(scene, Step { elapsed: 0, t });
    }

    /// Apply the end value and finish. Returns true if another loop was scheduled.
    fn finish(&mut self, scene: &mut Scene, allow_loop: bool) -> bool {
        self.stepping = false;
        let t = self.mode.apply(1.0);
        let elapsed = self.duration.unwrap_or(0);
        self.target.apply(scene, Step { elapsed, t });
        self.target.finished(scene);
        if allow_loop && self.loop_count > 1 {
            if self.loop_count != u32::MAX {
                self.loop_count -= 1;
            }
            self.first_loop = false;
            self.start_time = Some(scene.global_time);
            self.next_step_time = scene.global_time;
            return true;
        }
        false
    }

    /// Advance to `now`. Returns false once the activity is done.
    fn process_step(&mut self, scene: &mut Scene, now: u64) -> bool {
        let start = *self.start_time.get_or_insert(now);
        if now < start {
            return true;
        }
        if self.stop_time().is_some_and(|stop| now > stop) {
            if !self.stepping {
                self.start(scene);
            }
            return self.finish(scene, true);
        }
        if !self.stepping {
            self.start(scene);
        }
        if now >= self.next_step_time {
            let elapsed = now - start;
            let t = self.progress(elapsed);
            self.target.apply(scene, Step { elapsed, t });
            self.next_step_time = now.saturating_add(self.step_rate.unwrap_or(0));
        }
        true
    }

    fn terminate(&mut self, scene: &mut Scene, behavior: TerminationBehavior) {
        match behavior {
            TerminationBehavior::WithoutFinishing => self.stepping = false,
            TerminationBehavior::AndFinish => {
                if !self.stepping {
                    self.start(scene);
                }
                self.finish(scene, false);
            }
            TerminationBehavior::AndFinishIfStepping => {
                if self.stepping {
                    self.finish(scene, false);
                }
            }
        }
    }
}

fn slow_in_slow_out(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        let complement = 1.0 - t;
        1.0 - 2.0 * complement * complement
    }
}

/// Activities owned by a scene, in scheduling order.
#[derive(Debug, Default)]
pub(crate) struct ActivityScheduler {
    entries: Vec<(ActivityId, Activity)>,
    next_id: u64,
    /// The activity taken out of `entries` while it steps.
    stepping: Option<ActivityId>,
    /// Set when the stepping activity is terminated from inside its own step.
    pending_termination: Option<TerminationBehavior>,
}

impl ActivityScheduler {
    fn position(&self, id: ActivityId) -> Option<usize> {
        self.entries.iter().position(|(i, _)| *i == id)
    }

    fn get_mut(&mut self, id: ActivityId) -> Option<&mut Activity> {
        self.entries
            .iter_mut()
            .find_map(|(i, a)| (*i == id).then_some(a))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.stepping.is_none()
    }
}

impl Scene {
    /// Schedule an activity and return its id.
    pub fn add_activity(&mut self, mut activity: Activity) -> ActivityId {
        self.check_thread("activity scheduling");
        let start = *activity.start_time.get_or_insert(self.global_time);
        activity.step_rate.get_or_insert(self.config.step_rate);
        activity.next_step_time = start;
        let id = ActivityId(self.activities.next_id);
        self.activities.next_id += 1;
        self.activities.entries.push((id, activity));
        log::trace!("activity {id:?} scheduled at {start}");
        id
    }

    /// Stop an activity early. Returns false if it is not scheduled.
    ///
    /// An activity may terminate itself from inside its own step; that takes
    /// effect as soon as the step returns. Terminating from the final step or
    /// from [`ActivityTarget::finished`] only drops the activity, including any
    /// loops it had left.
    pub fn terminate_activity(&mut self, id: ActivityId, behavior: TerminationBehavior) -> bool {
        if self.activities.stepping == Some(id) {
            self.activities.pending_termination = Some(behavior);
            return true;
        }
        let Some(index) = self.activities.position(id) else {
            return false;
        };
        let (_, mut activity) = self.activities.entries.remove(index);
        activity.terminate(self, behavior);
        log::trace!("activity {id:?} terminated ({behavior:?})");
        true
    }

    /// Reschedule `id` to start when `other` stops.
    ///
    /// Returns false if either is not scheduled or `other` is unbounded.
    pub fn start_after(&mut self, id: ActivityId, other: ActivityId) -> bool {
        let Some(stop) = self
            .activities
            .get_mut(other)
            .and_then(|a| a.stop_time())
        else {
            return false;
        };
        let Some(activity) = self.activities.get_mut(id) else {
            return false;
        };
        activity.start_time = Some(stop);
        activity.next_step_time = stop;
        true
    }

    /// Number of scheduled activities.
    pub fn activity_count(&self) -> usize {
        self.activities.entries.len() + usize::from(self.activities.stepping.is_some())
    }

    /// Whether `id` is still scheduled.
    pub fn has_activity(&self, id: ActivityId) -> bool {
        self.activities.stepping == Some(id) || self.activities.position(id).is_some()
    }

    /// Whether any activity has started and not yet finished.
    pub fn is_animating(&self) -> bool {
        self.activities.stepping.is_some()
            || self.activities.entries.iter().any(|(_, a)| a.stepping)
    }

    /// Step every scheduled activity to `now`, dropping those that are done.
    pub(crate) fn process_activities(&mut self, now: u64) {
        let ids: SmallVec<[ActivityId; 8]> =
            self.activities.entries.iter().map(|(id, _)| *id).collect();
        for id in ids.into_iter().rev() {
            let Some(index) = self.activities.position(id) else {
                continue;
            };
            let (_, mut activity) = self.activities.entries.remove(index);
            self.activities.stepping = Some(id);
            let mut keep = activity.process_step(self, now);
            self.activities.stepping = None;
            if let Some(behavior) = self.activities.pending_termination.take() {
                // A request made while the loop was finishing has nothing left to finish.
                if activity.stepping {
                    activity.terminate(self, behavior);
                }
                keep = false;
            }
            if keep {
                let index = index.min(self.activities.entries.len());
                self.activities.entries.insert(index, (id, activity));
            } else {
                log::trace!("activity {id:?} finished");
            }
        }
    }

    // --- node animation ---

    /// Animate a node's transform to `target`; a zero `duration` applies it immediately.
    pub fn animate_to_transform(
        &mut self,
        id: NodeId,
        target: Transform,
        duration: u64,
    ) -> Option<ActivityId> {
        if duration == 0 {
            self.set_transform(id, target);
            return None;
        }
        Some(self.add_activity(Activity::new(duration, TransformTarget::new(id, target))))
    }

    /// Animate a node to an offset, scale and rotation (radians), each replacing
    /// the current value.
    ///
    /// Fails with [`TransformError::DegenerateScale`] for a zero scale or a node
    /// whose current scale is zero.
    pub fn animate_to_position_scale_rotation(
        &mut self,
        id: NodeId,
        x: f64,
        y: f64,
        scale: f64,
        theta: f64,
        duration: u64,
    ) -> Result<Option<ActivityId>, TransformError> {
        let mut target = self.transform(id);
        target.set_offset(x, y);
        target.set_scale(scale)?;
        target.set_rotation(theta);
        Ok(self.animate_to_transform(id, target, duration))
    }

    /// Animate a node's transparency; a zero `duration` applies it immediately.
    pub fn animate_to_transparency(
        &mut self,
        id: NodeId,
        transparency: f32,
        duration: u64,
    ) -> Option<ActivityId> {
        if duration == 0 {
            self.set_transparency(id, transparency);
            return None;
        }
        let target = TransparencyTarget::new(id, transparency);
        Some(self.add_activity(Activity::new(duration, target)))
    }

    /// Animate a node's fill; a zero `duration` applies it immediately.
    ///
    /// A node without a fill starts from transparent.
    pub fn animate_to_color(&mut self, id: NodeId, color: Color, duration: u64) -> Option<ActivityId> {
        if duration == 0 {
            self.set_paint(id, Some(color));
            return None;
        }
        Some(self.add_activity(Activity::new(duration, ColorTarget::new(id, color))))
    }
}

/// Interpolates a node's transform. The source is read when the first loop starts.
#[derive(Clone, Copy, Debug)]
pub struct TransformTarget {
    node: NodeId,
    source: Transform,
    destination: Transform,
}

impl TransformTarget {
    /// Move `node` to `destination`.
    pub fn new(node: NodeId, destination: Transform) -> Self {
        Self {
            node,
            source: destination,
            destination,
        }
    }
}

impl ActivityTarget for TransformTarget {
    fn started(&mut self, scene: &mut Scene, first_loop: bool) {
        if first_loop && scene.is_alive(self.node) {
            self.source = scene.transform(self.node);
        }
    }

    fn apply(&mut self, scene: &mut Scene, step: Step) {
        if scene.is_alive(self.node) {
            let t = self.source.interpolate(&self.destination, step.t);
            scene.set_transform(self.node, t);
        }
    }
}

/// Interpolates a camera's view transform. The source is read when the first loop starts.
#[derive(Clone, Copy, Debug)]
pub struct ViewTransformTarget {
    camera: NodeId,
    source: Transform,
    destination: Transform,
}

impl ViewTransformTarget {
    /// Move `camera`'s view to `destination`.
    pub fn new(camera: NodeId, destination: Transform) -> Self {
        Self {
            camera,
            source: destination,
            destination,
        }
    }
}

impl ActivityTarget for ViewTransformTarget {
    fn started(&mut self, scene: &mut Scene, first_loop: bool) {
        if first_loop && scene.is_alive(self.camera) {
            self.source = scene.view_transform(self.camera);
        }
    }

    fn apply(&mut self, scene: &mut Scene, step: Step) {
        if scene.is_alive(self.camera) {
            let t = self.source.interpolate(&self.destination, step.t);
            scene.set_view_transform(self.camera, t);
        }
    }
}

/// Interpolates a node's transparency.
#[derive(Clone, Copy, Debug)]
pub struct TransparencyTarget {
    node: NodeId,
    source: f32,
    destination: f32,
}

impl TransparencyTarget {
    /// Fade `node` to `destination`.
    pub fn new(node: NodeId, destination: f32) -> Self {
        Self {
            node,
            source: destination,
            destination,
        }
    }
}

impl ActivityTarget for TransparencyTarget {
    fn started(&mut self, scene: &mut Scene, first_loop: bool) {
        if first_loop && scene.is_alive(self.node) {
            self.source = scene.transparency(self.node);
        }
    }

    #[allow(clippy::cast_possible_truncation, reason = "transparency is stored as f32")]
    fn apply(&mut self, scene: &mut Scene, step: Step) {
        if scene.is_alive(self.node) {
            let t = step.t as f32;
            scene.set_transparency(self.node, self.source + t * (self.destination - self.source));
        }
    }
}

/// Interpolates a node's fill.
#[derive(Clone, Copy, Debug)]
pub struct ColorTarget {
    node: NodeId,
    source: Color,
    destination: Color,
}

impl ColorTarget {
    /// Recolor `node` to `destination`.
    pub fn new(node: NodeId, destination: Color) -> Self {
        Self {
            node,
            source: destination,
            destination,
        }
    }
}

impl ActivityTarget for ColorTarget {
    fn started(&mut self, scene: &mut Scene, first_loop: bool) {
        if first_loop && scene.is_alive(self.node) {
            self.source = scene.paint(self.node).unwrap_or(Color::TRANSPARENT);
        }
    }

    #[allow(clippy::cast_possible_truncation, reason = "colors are stored as f32")]
    fn apply(&mut self, scene: &mut Scene, step: Step) {
        if scene.is_alive(self.node) {
            let color = self.source.lerp(self.destination, step.t as f32);
            scene.set_paint(self.node, Some(color));
        }
    }
}
