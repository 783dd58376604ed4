// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage: paint invalidation and the repaint walk that reports dirty areas to camera surfaces.

use core::any::Any;
use core::fmt;

use alloc::vec::Vec;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::scene::{Kind, Scene};
use crate::types::{Dirty, NodeFlags, NodeId};
use crate::util::intersect_rects;

/// The rendering surface behind a camera, told which areas need redrawing.
///
/// Rectangles are in the camera's local frame, already clipped to the camera
/// bounds when they come from a viewed layer.
pub trait Component: Any {
    /// Schedule a redraw of `rect`.
    fn repaint(&mut self, rect: Rect);
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").finish_non_exhaustive()
    }
}

/// A [`Component`] that records every damaged rectangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Damage {
    /// Rectangles reported since the last [`take`](Self::take), in report order.
    pub dirty_rects: Vec<Rect>,
}

impl Damage {
    /// Returns the union of all dirty rectangles, if any.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.dirty_rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }

    /// Whether nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.dirty_rects.is_empty()
    }

    /// Drain the recorded rectangles.
    pub fn take(&mut self) -> Vec<Rect> {
        core::mem::take(&mut self.dirty_rects)
    }
}

impl Component for Damage {
    fn repaint(&mut self, rect: Rect) {
        self.dirty_rects.push(rect);
    }
}

impl Scene {
    /// Mark a node for repaint and flag its ancestors.
    ///
    /// The repaint itself happens on the next [`validate`](Self::validate).
    pub fn invalidate_paint(&mut self, id: NodeId) {
        self.check_thread("paint invalidation");
        self.node_mut(id).dirty.insert(Dirty::PAINT);
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            let n = self.node_mut(p);
            if n.dirty.contains(Dirty::CHILD_PAINT) {
                break;
            }
            n.dirty.insert(Dirty::CHILD_PAINT);
            cur = n.parent;
        }
    }

    /// Report a node's full bounds as damaged right away.
    ///
    /// Hidden nodes report nothing.
    pub fn repaint(&mut self, id: NodeId) {
        self.validate_full_bounds(id);
        if let Some(rect) = self.node(id).full_bounds.rect() {
            self.repaint_rect(id, rect);
        }
    }

    /// Report a rectangle in the node's local frame as damaged right away.
    ///
    /// The rectangle travels up the ancestor chain; layers on the way forward
    /// it to every camera viewing them, and cameras hand it to their
    /// [`Component`]. Hidden nodes report nothing.
    pub fn repaint_rect(&mut self, id: NodeId, rect: Rect) {
        self.check_thread("repaint");
        if !self.node(id).flags.contains(NodeFlags::VISIBLE) {
            return;
        }
        self.repaint_from(id, rect);
    }

    /// Continue a repaint at `id` with `rect` in `id`'s frame.
    pub(crate) fn repaint_from(&mut self, id: NodeId, rect: Rect) {
        let node = self.node_mut(id);
        if let Kind::Camera(camera) = &mut node.kind {
            if let Some(component) = camera.component.as_mut() {
                component.repaint(rect);
            }
        }
        let in_parent = node.transform.transform_rect(rect);
        self.repaint_above(id, in_parent);
    }

    /// Continue a repaint past `id` with `rect` already in `id`'s parent frame.
    pub(crate) fn repaint_above(&mut self, id: NodeId, rect: Rect) {
        let node = self.node(id);
        let parent = node.parent;
        if let Kind::Layer(layer) = &node.kind {
            let cameras: SmallVec<[NodeId; 4]> = layer.cameras.iter().copied().collect();
            for camera in cameras {
                self.repaint_from_layer(camera, rect);
            }
        }
        if let Some(parent) = parent {
            self.repaint_from(parent, rect);
        }
    }

    /// Damage reported by a viewed layer, in view coordinates.
    ///
    /// Mapped into the camera's frame through the view transform and clipped
    /// to the camera bounds before it continues up the camera's own ancestors.
    pub(crate) fn repaint_from_layer(&mut self, camera: NodeId, view_rect: Rect) {
        let node = self.node(camera);
        if !node.flags.contains(NodeFlags::VISIBLE) {
            return;
        }
        let Kind::Camera(data) = &node.kind else {
            return;
        };
        let local = data.view_transform.transform_rect(view_rect);
        let clipped = node.bounds.rect().and_then(|b| intersect_rects(b, local));
        if let Some(rect) = clipped {
            self.repaint_from(camera, rect);
        }
    }

    /// Repaint every node marked by [`invalidate_paint`](Self::invalidate_paint) below `id`.
    pub(crate) fn validate_full_paint(&mut self, id: NodeId) {
        let dirty = self.node(id).dirty;
        if dirty.contains(Dirty::PAINT) {
            self.node_mut(id).dirty.remove(Dirty::PAINT);
            self.repaint(id);
        }
        if dirty.contains(Dirty::CHILD_PAINT) {
            let children: SmallVec<[NodeId; 16]> =
                self.node(id).children.iter().copied().collect();
            for child in children {
                self.validate_full_paint(child);
            }
            self.node_mut(id).dirty.remove(Dirty::CHILD_PAINT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds;
    use crate::types::LocalNode;
    use alloc::boxed::Box;

    fn scene_with_damage() -> (Scene, NodeId, NodeId) {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_component(camera, Some(Box::new(Damage::default())));
        scene.validate();
        scene.component_mut::<Damage>(camera).unwrap().take();
        (scene, camera, layer)
    }

    fn damage(scene: &mut Scene, camera: NodeId) -> Vec<Rect> {
        scene.component_mut::<Damage>(camera).unwrap().take()
    }

    #[test]
    fn new_node_damages_its_area() {
        let (mut scene, camera, layer) = scene_with_damage();
        scene.insert(
            Some(layer),
            LocalNode {
                bounds: Bounds::new(10.0, 10.0, 5.0, 5.0),
                ..Default::default()
            },
        );
        scene.validate();
        assert_eq!(damage(&mut scene, camera), [Rect::new(10.0, 10.0, 15.0, 15.0)]);
        scene.validate();
        assert!(damage(&mut scene, camera).is_empty(), "clean scene reports nothing");
    }

    #[test]
    fn moving_damages_old_and_new_area() {
        let (mut scene, camera, layer) = scene_with_damage();
        let n = scene.insert(
            Some(layer),
            LocalNode {
                bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
                ..Default::default()
            },
        );
        scene.validate();
        damage(&mut scene, camera);

        scene.translate(n, 50.0, 0.0);
        scene.validate();
        let rects = damage(&mut scene, camera);
        assert!(rects.contains(&Rect::new(0.0, 0.0, 10.0, 10.0)), "old area: {rects:?}");
        assert!(rects.contains(&Rect::new(50.0, 0.0, 60.0, 10.0)), "new area: {rects:?}");
    }

    #[test]
    fn layer_damage_goes_through_view_transform_and_clip() {
        let (mut scene, camera, layer) = scene_with_damage();
        scene.set_view_transform(camera, crate::Transform::from_scale(2.0));
        scene.validate();
        damage(&mut scene, camera);

        let n = scene.insert(
            Some(layer),
            LocalNode {
                bounds: Bounds::new(40.0, 40.0, 20.0, 20.0),
                ..Default::default()
            },
        );
        scene.validate();
        // (40..60) scaled by 2 is (80..120), clipped to the 100x100 camera.
        assert_eq!(damage(&mut scene, camera), [Rect::new(80.0, 80.0, 100.0, 100.0)]);

        scene.set_bounds(n, Rect::new(200.0, 200.0, 210.0, 210.0));
        scene.validate();
        let rects = damage(&mut scene, camera);
        assert_eq!(rects, [Rect::new(80.0, 80.0, 100.0, 100.0)], "off-camera area is dropped");
    }

    #[test]
    fn hiding_damages_once() {
        let (mut scene, camera, layer) = scene_with_damage();
        let n = scene.insert(
            Some(layer),
            LocalNode {
                bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
                ..Default::default()
            },
        );
        scene.validate();
        damage(&mut scene, camera);

        scene.set_visible(n, false);
        assert_eq!(damage(&mut scene, camera), [Rect::new(0.0, 0.0, 10.0, 10.0)]);
        scene.validate();
        assert!(damage(&mut scene, camera).is_empty(), "hidden node repaints nothing");
    }

    #[test]
    fn unobserved_layer_reports_nothing() {
        let (mut scene, camera, layer) = scene_with_damage();
        assert!(scene.remove_layer(camera, layer), "layer was viewed");
        scene.validate();
        damage(&mut scene, camera);
        scene.insert(
            Some(layer),
            LocalNode {
                bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
                ..Default::default()
            },
        );
        scene.validate();
        assert!(damage(&mut scene, camera).is_empty(), "camera no longer views the layer");
    }

    #[test]
    fn damage_union() {
        let mut d = Damage::default();
        assert_eq!(d.union_rect(), None);
        d.repaint(Rect::new(0.0, 0.0, 1.0, 1.0));
        d.repaint(Rect::new(5.0, 5.0, 6.0, 6.0));
        assert_eq!(d.union_rect(), Some(Rect::new(0.0, 0.0, 6.0, 6.0)));
        assert_eq!(d.take().len(), 2);
        assert!(d.is_empty(), "take drains");
    }
}
