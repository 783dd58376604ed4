// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input events routed along a pick path.
//!
//! [`Scene::dispatch_event`] hands an event to the listeners of each node on a
//! [`PickPath`], starting at the picked node and bubbling up to the top camera.
//!
//! - [`Outcome`] only controls propagation.
//! - Whether an event was consumed is recorded on the event itself
//!   ([`InputEvent::handled`]).
//! - Listeners see positions through the path they were reached by, so a node
//!   viewed by two cameras gets coordinates for the camera that was picked.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::pick::{PickPath, PickPathError};
use crate::scene::Scene;
use crate::types::NodeId;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEventKind {
    /// A pointer button went down.
    PointerDown {
        /// Button index; 0 is the primary button.
        button: u8,
    },
    /// A pointer button was released.
    PointerUp {
        /// Button index; 0 is the primary button.
        button: u8,
    },
    /// The pointer moved.
    PointerMove,
    /// Scroll wheel or trackpad scroll.
    Wheel {
        /// Scroll amount in the top camera's parent frame.
        delta: Vec2,
    },
    /// A key changed state.
    Key {
        /// Platform key code.
        code: u32,
        /// Whether the key went down.
        pressed: bool,
    },
}

/// An input event in the top camera's parent frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    /// What happened.
    pub kind: InputEventKind,
    /// Where it happened, in the top camera's parent frame.
    pub canvas_position: Point,
    /// Set by listeners that consumed the event.
    pub handled: bool,
}

impl InputEvent {
    /// A new, unhandled event.
    pub fn new(kind: InputEventKind, canvas_position: Point) -> Self {
        Self {
            kind,
            canvas_position,
            handled: false,
        }
    }
}

/// Propagation control returned by listeners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Keep bubbling.
    #[default]
    Continue,
    /// Stop at this node; its remaining listeners and all ancestors are skipped.
    Stop,
}

/// Where a listener is being called from.
#[derive(Clone, Copy, Debug)]
pub struct EventContext<'a> {
    node: NodeId,
    path: &'a PickPath,
}

impl<'a> EventContext<'a> {
    /// The node whose listener is running.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The path the event is travelling along.
    pub fn path(&self) -> &'a PickPath {
        self.path
    }

    /// Whether the listener's node is the picked node rather than an ancestor.
    pub fn is_target(&self) -> bool {
        self.path.picked_node() == Some(self.node)
    }

    /// The event position in the listener node's local frame.
    pub fn local_position(&self, event: &InputEvent) -> Result<Point, PickPathError> {
        self.path.canvas_to_local_point(event.canvas_position, self.node)
    }
}

/// Receives events dispatched to a node.
pub trait EventListener {
    /// Handle `event`. Set [`InputEvent::handled`] to mark it consumed.
    fn on_event(
        &mut self,
        scene: &mut Scene,
        cx: &EventContext<'_>,
        event: &mut InputEvent,
    ) -> Outcome;
}

impl fmt::Debug for dyn EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener").finish_non_exhaustive()
    }
}

impl Scene {
    /// Attach a listener to a node. Listeners run in the order they were added.
    pub fn add_event_listener(&mut self, id: NodeId, listener: Box<dyn EventListener>) {
        self.check_thread("listener registration");
        self.node_mut(id).listeners.push(listener);
    }

    /// Detach every listener from a node.
    pub fn remove_event_listeners(&mut self, id: NodeId) {
        self.node_mut(id).listeners.clear();
    }

    /// Number of listeners attached to a node.
    pub fn listener_count(&self, id: NodeId) -> usize {
        self.node(id).listeners.len()
    }

    /// Bubble `event` from the picked node up to the top camera.
    ///
    /// Returns [`Outcome::Stop`] if a listener stopped propagation. Nodes
    /// destroyed by a listener are skipped; listeners added while an event is
    /// in flight first run for the next event.
    pub fn dispatch_event(&mut self, path: &PickPath, event: &mut InputEvent) -> Outcome {
        for &node in path.node_stack().iter().rev() {
            let Some(n) = self.node_opt_mut(node) else {
                continue;
            };
            if n.listeners.is_empty() {
                continue;
            }
            let mut listeners = core::mem::take(&mut n.listeners);
            let cx = EventContext { node, path };
            let mut outcome = Outcome::Continue;
            for listener in &mut listeners {
                if listener.on_event(self, &cx, event) == Outcome::Stop {
                    outcome = Outcome::Stop;
                    break;
                }
            }
            if let Some(n) = self.node_opt_mut(node) {
                let added: Vec<_> = core::mem::take(&mut n.listeners);
                listeners.extend(added);
                n.listeners = listeners;
            }
            if outcome == Outcome::Stop {
                return Outcome::Stop;
            }
        }
        Outcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;
    use crate::types::LocalNode;
    use alloc::rc::Rc;
    use core::cell::RefCell;
    use kurbo::Rect;

    type Log = Rc<RefCell<Vec<(NodeId, Point)>>>;

    struct Recorder {
        log: Log,
        outcome: Outcome,
    }

    impl EventListener for Recorder {
        fn on_event(
            &mut self,
            _: &mut Scene,
            cx: &EventContext<'_>,
            event: &mut InputEvent,
        ) -> Outcome {
            let p = cx.local_position(event).unwrap_or(Point::new(f64::NAN, f64::NAN));
            self.log.borrow_mut().push((cx.node(), p));
            if self.outcome == Outcome::Stop {
                event.handled = true;
            }
            self.outcome
        }
    }

    fn listen(scene: &mut Scene, id: NodeId, log: &Log, outcome: Outcome) {
        scene.add_event_listener(
            id,
            Box::new(Recorder {
                log: log.clone(),
                outcome,
            }),
        );
    }

    fn setup() -> (Scene, NodeId, NodeId, NodeId) {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let n = scene.insert(
            Some(layer),
            LocalNode {
                bounds: Rect::new(0.0, 0.0, 10.0, 10.0).into(),
                transform: Transform::from_translation(20.0, 20.0),
                ..Default::default()
            },
        );
        (scene, camera, layer, n)
    }

    fn click() -> InputEvent {
        InputEvent::new(InputEventKind::PointerDown { button: 0 }, Point::new(25.0, 25.0))
    }

    #[test]
    fn bubbles_from_picked_node_to_camera() {
        let (mut scene, camera, layer, n) = setup();
        let log = Log::default();
        listen(&mut scene, n, &log, Outcome::Continue);
        listen(&mut scene, layer, &log, Outcome::Continue);
        listen(&mut scene, camera, &log, Outcome::Continue);

        let path = scene.pick(camera, Point::new(25.0, 25.0), 0.0);
        let mut event = click();
        assert_eq!(scene.dispatch_event(&path, &mut event), Outcome::Continue);
        let log = log.borrow();
        let order: Vec<_> = log.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, [n, layer, camera], "target first, then ancestors");
        assert_eq!(log[0].1, Point::new(5.0, 5.0), "target sees local coordinates");
        assert!(!event.handled, "nobody consumed it");
    }

    #[test]
    fn stop_skips_ancestors() {
        let (mut scene, camera, layer, n) = setup();
        let log = Log::default();
        listen(&mut scene, n, &log, Outcome::Stop);
        listen(&mut scene, n, &log, Outcome::Continue);
        listen(&mut scene, layer, &log, Outcome::Continue);

        let path = scene.pick(camera, Point::new(25.0, 25.0), 0.0);
        let mut event = click();
        assert_eq!(scene.dispatch_event(&path, &mut event), Outcome::Stop);
        assert_eq!(log.borrow().len(), 1, "later listeners and ancestors skipped");
        assert!(event.handled, "consumed");
        assert_eq!(scene.listener_count(n), 2, "listeners restored after dispatch");
    }

    #[test]
    fn view_transform_applies_to_positions() {
        let (mut scene, camera, _, n) = setup();
        scene.set_view_transform(camera, Transform::from_scale(2.0));
        let log = Log::default();
        listen(&mut scene, n, &log, Outcome::Continue);

        let path = scene.pick(camera, Point::new(50.0, 50.0), 0.0);
        assert_eq!(path.picked_node(), Some(n));
        let mut event = InputEvent::new(InputEventKind::PointerMove, Point::new(50.0, 50.0));
        scene.dispatch_event(&path, &mut event);
        assert_eq!(log.borrow()[0].1, Point::new(5.0, 5.0), "(50 / 2) - 20");
    }

    struct Destroyer(NodeId);

    impl EventListener for Destroyer {
        fn on_event(&mut self, scene: &mut Scene, _: &EventContext<'_>, _: &mut InputEvent) -> Outcome {
            scene.destroy(self.0);
            Outcome::Continue
        }
    }

    #[test]
    fn listener_may_destroy_its_node() {
        let (mut scene, camera, layer, n) = setup();
        let log = Log::default();
        scene.add_event_listener(n, Box::new(Destroyer(n)));
        listen(&mut scene, layer, &log, Outcome::Continue);

        let path = scene.pick(camera, Point::new(25.0, 25.0), 0.0);
        scene.dispatch_event(&path, &mut click());
        assert!(!scene.is_alive(n), "destroyed by its own listener");
        assert_eq!(log.borrow().len(), 1, "bubbling continues past the destroyed node");
    }

    #[test]
    fn remove_listeners() {
        let (mut scene, _, _, n) = setup();
        let log = Log::default();
        listen(&mut scene, n, &log, Outcome::Continue);
        assert_eq!(scene.listener_count(n), 1);
        scene.remove_event_listeners(n);
        assert_eq!(scene.listener_count(n), 0);
    }
}
