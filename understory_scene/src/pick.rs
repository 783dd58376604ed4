// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picking: hit testing from a camera down through its layers.
//!
//! A pick records the stack of nodes it descended through, together with the
//! transform each one contributed and the pick rectangle expressed in each
//! successive frame. Cameras splice in their view transform, so the path's
//! transforms can differ from the plain ancestor chain; coordinate mapping
//! along a [`PickPath`] uses only what this pick pushed.

use hashbrown::HashSet;
use kurbo::{Point, Rect, Size};
use smallvec::SmallVec;

use crate::scene::{Kind, Scene};
use crate::transform::{Transform, TransformError};
use crate::types::{NodeFlags, NodeId, NodeKind};

/// Errors from mapping coordinates along a [`PickPath`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PickPathError {
    /// The node was not visited by this pick.
    #[error("node is not on the pick path")]
    NotOnPath,
    /// The composed path transform could not be inverted.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// The result of a pick: the nodes from the top camera down to the picked node.
#[derive(Clone, Debug)]
pub struct PickPath {
    top_camera: NodeId,
    scene_pick_bounds: Rect,
    nodes: SmallVec<[NodeId; 8]>,
    transforms: SmallVec<[(NodeId, Transform); 8]>,
    pick_bounds: SmallVec<[Rect; 8]>,
    excluded: HashSet<NodeId>,
}

impl PickPath {
    /// An empty path that will pick from `top_camera` with `scene_pick_bounds`
    /// in the camera's parent frame.
    pub fn new(top_camera: NodeId, scene_pick_bounds: Rect) -> Self {
        Self {
            top_camera,
            scene_pick_bounds,
            nodes: SmallVec::new(),
            transforms: SmallVec::new(),
            pick_bounds: SmallVec::new(),
            excluded: HashSet::new(),
        }
    }

    /// The deepest node on the path, `None` before a pick has run.
    pub fn picked_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// The camera the pick started from.
    pub fn top_camera(&self) -> NodeId {
        self.top_camera
    }

    /// The deepest camera on the path.
    pub fn bottom_camera(&self, scene: &Scene) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .copied()
            .find(|&n| scene.is_alive(n) && scene.kind(n) == NodeKind::Camera)
    }

    /// Nodes from the top camera down to the picked node.
    pub fn node_stack(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The pick rectangle in the frame of the deepest pushed transform.
    pub fn pick_bounds(&self) -> Rect {
        self.pick_bounds
            .last()
            .copied()
            .unwrap_or(self.scene_pick_bounds)
    }

    /// The pick rectangle in the top camera's parent frame.
    pub fn scene_pick_bounds(&self) -> Rect {
        self.scene_pick_bounds
    }

    /// Whether `id` may still be the picked node.
    ///
    /// Nodes returned by earlier [`next_picked_node`](Self::next_picked_node)
    /// calls are refused.
    pub fn accepts_node(&self, id: NodeId) -> bool {
        !self.excluded.contains(&id)
    }

    pub(crate) fn push_node(&mut self, id: NodeId) {
        self.nodes.push(id);
    }

    pub(crate) fn pop_node(&mut self) {
        self.nodes.pop();
    }

    /// Enter `transform`'s frame on behalf of `owner`.
    ///
    /// Nothing is pushed when the transform is singular.
    pub(crate) fn push_transform(
        &mut self,
        owner: NodeId,
        transform: Transform,
    ) -> Result<(), TransformError> {
        let local = transform.inverse_transform_rect(self.pick_bounds())?;
        self.transforms.push((owner, transform));
        self.pick_bounds.push(local);
        Ok(())
    }

    /// Like [`push_transform`](Self::push_transform), but a singular transform
    /// is still recorded; the pick rectangle then stays in the outer frame.
    ///
    /// Mapping into `owner` afterwards reports the singular transform.
    pub(crate) fn push_transform_unchecked(&mut self, owner: NodeId, transform: Transform) {
        if let Err(err) = self.push_transform(owner, transform) {
            log::debug!("pick path keeps singular transform of {owner:?}: {err}");
            let outer = self.pick_bounds();
            self.transforms.push((owner, transform));
            self.pick_bounds.push(outer);
        }
    }

    pub(crate) fn pop_transform(&mut self) {
        self.transforms.pop();
        self.pick_bounds.pop();
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.transforms.clear();
        self.pick_bounds.clear();
    }

    /// Transform from `node`'s frame into the top camera's parent frame, as
    /// composed along this path.
    pub fn path_transform_to(&self, node: NodeId) -> Result<Transform, PickPathError> {
        let mut t = Transform::IDENTITY;
        for (owner, entry) in &self.transforms {
            t.concatenate(entry);
            if *owner == node {
                return Ok(t);
            }
        }
        Err(PickPathError::NotOnPath)
    }

    /// Map a point from the top camera's parent frame into `node`'s frame.
    pub fn canvas_to_local_point(&self, point: Point, node: NodeId) -> Result<Point, PickPathError> {
        Ok(self.path_transform_to(node)?.inverse_transform_point(point)?)
    }

    /// Map a size from the top camera's parent frame into `node`'s frame.
    pub fn canvas_to_local_size(&self, size: Size, node: NodeId) -> Result<Size, PickPathError> {
        Ok(self.path_transform_to(node)?.inverse_transform_size(size)?)
    }

    /// Map a rectangle from the top camera's parent frame into `node`'s frame.
    pub fn canvas_to_local_rect(&self, rect: Rect, node: NodeId) -> Result<Rect, PickPathError> {
        Ok(self.path_transform_to(node)?.inverse_transform_rect(rect)?)
    }

    /// Map a point from `node`'s frame into the top camera's parent frame.
    pub fn local_to_canvas_point(&self, point: Point, node: NodeId) -> Result<Point, PickPathError> {
        Ok(self.path_transform_to(node)?.transform_point(point))
    }

    /// Map a size from `node`'s frame into the top camera's parent frame.
    pub fn local_to_canvas_size(&self, size: Size, node: NodeId) -> Result<Size, PickPathError> {
        Ok(self.path_transform_to(node)?.transform_size(size))
    }

    /// Map a rectangle from `node`'s frame into the top camera's parent frame.
    pub fn local_to_canvas_rect(&self, rect: Rect, node: NodeId) -> Result<Rect, PickPathError> {
        Ok(self.path_transform_to(node)?.transform_rect(rect))
    }

    /// Find the node underneath the current one.
    ///
    /// The current picked node is excluded and the whole pick runs again from
    /// the top camera. Once nothing else is hit the camera itself is returned,
    /// and the call after that returns `None`.
    pub fn next_picked_node(&mut self, scene: &mut Scene) -> Option<NodeId> {
        let picked = self.picked_node()?;
        if picked == self.top_camera {
            return None;
        }
        self.excluded.insert(picked);
        self.clear();
        scene.validate_all_full_bounds();
        scene.run_pick(self);
        self.picked_node()
    }
}

impl Scene {
    /// Pick from `camera` at `point` (in the camera's parent frame), growing
    /// the hit area by `halo` on every side.
    ///
    /// When no node under the camera is hit, the path holds just the camera.
    pub fn pick(&mut self, camera: NodeId, point: Point, halo: f64) -> PickPath {
        self.validate_all_full_bounds();
        let bounds = Rect::from_points(point, point).inflate(halo, halo);
        let mut path = PickPath::new(camera, bounds);
        self.run_pick(&mut path);
        path
    }

    pub(crate) fn run_pick(&self, path: &mut PickPath) {
        let camera = path.top_camera;
        self.full_pick(camera, path);
        if path.nodes.is_empty() {
            path.push_node(camera);
            path.push_transform_unchecked(camera, self.node(camera).transform);
        }
    }

    /// Recursive pick of `id` and its subtree. Returns true and leaves the
    /// path extended when something was picked; otherwise the path is left as
    /// it was.
    ///
    /// Full bounds must be up to date; [`pick`](Self::pick) takes care of it.
    ///
    /// The node is skipped if it is hidden, neither it nor its children are
    /// pickable, or its full bounds miss the pick rectangle. Otherwise its
    /// content gets a first chance, then children from top to bottom, then the
    /// node's own test.
    pub fn full_pick(&self, id: NodeId, path: &mut PickPath) -> bool {
        let node = self.node(id);
        let pickable = node.flags.contains(NodeFlags::PICKABLE);
        let children_pickable = node.flags.contains(NodeFlags::CHILDREN_PICKABLE);
        if !node.flags.contains(NodeFlags::VISIBLE)
            || !(pickable || children_pickable)
            || !node.full_bounds_in_parent.intersects(path.pick_bounds())
        {
            return false;
        }

        path.push_node(id);
        if let Err(err) = path.push_transform(id, node.transform) {
            log::debug!("pick skipped {id:?}: {err}");
            path.pop_node();
            return false;
        }

        let this_pickable = pickable && path.accepts_node(id);
        if this_pickable
            && node
                .content
                .as_ref()
                .is_some_and(|c| c.pick(path.pick_bounds()))
        {
            return true;
        }
        if children_pickable {
            for &child in node.children.iter().rev() {
                if self.full_pick(child, path) {
                    return true;
                }
            }
        }
        if this_pickable && self.pick_after_children(id, path) {
            return true;
        }

        path.pop_transform();
        path.pop_node();
        false
    }

    /// The node's own test, run after none of its children were picked.
    fn pick_after_children(&self, id: NodeId, path: &mut PickPath) -> bool {
        let node = self.node(id);
        let pick_bounds = path.pick_bounds();
        match &node.kind {
            Kind::Camera(camera) => {
                if !node.bounds.intersects(pick_bounds) {
                    return false;
                }
                match path.push_transform(id, camera.view_transform) {
                    Ok(()) => {
                        if self.pick_camera_view(id, path) {
                            return true;
                        }
                        path.pop_transform();
                    }
                    Err(err) => log::debug!("camera view of {id:?} skipped: {err}"),
                }
                true
            }
            _ => match &node.content {
                Some(content) => content.intersects(pick_bounds),
                None => node.bounds.intersects(pick_bounds),
            },
        }
    }

    /// Pick the camera's layers, topmost first. The path must already be in
    /// view coordinates.
    pub fn pick_camera_view(&self, camera: NodeId, path: &mut PickPath) -> bool {
        self.layers(camera)
            .iter()
            .rev()
            .any(|&layer| self.full_pick(layer, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds;
    use crate::content::Content;
    use crate::types::LocalNode;
    use alloc::boxed::Box;

    fn boxed(scene: &mut Scene, parent: NodeId, rect: Rect) -> NodeId {
        scene.insert(
            Some(parent),
            LocalNode {
                bounds: rect.into(),
                ..Default::default()
            },
        )
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn overlapping_nodes_are_picked_top_down() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let n1 = boxed(&mut scene, layer, r);
        let n2 = boxed(&mut scene, layer, r);
        let n3 = boxed(&mut scene, layer, r);

        let mut path = scene.pick(camera, Point::new(5.0, 5.0), 0.0);
        assert_eq!(path.picked_node(), Some(n3), "last added is on top");
        assert_eq!(path.next_picked_node(&mut scene), Some(n2));
        assert_eq!(path.next_picked_node(&mut scene), Some(n1));
        assert_eq!(path.next_picked_node(&mut scene), Some(camera), "camera is the sentinel");
        assert_eq!(path.next_picked_node(&mut scene), None);
    }

    #[test]
    fn miss_picks_camera() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        boxed(&mut scene, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        let path = scene.pick(camera, Point::new(50.0, 50.0), 1.0);
        assert_eq!(path.picked_node(), Some(camera));
        assert_eq!(path.node_stack(), &[camera]);

        let path = scene.pick(camera, Point::new(500.0, 500.0), 1.0);
        assert_eq!(path.picked_node(), Some(camera), "outside the camera too");
    }

    #[test]
    fn halo_widens_the_hit_area() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let n = boxed(&mut scene, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.pick(camera, Point::new(12.0, 5.0), 0.0).picked_node(), Some(camera));
        assert_eq!(scene.pick(camera, Point::new(12.0, 5.0), 3.0).picked_node(), Some(n));
        assert_eq!(
            scene.pick(camera, Point::new(10.0, 5.0), 0.0).picked_node(),
            Some(n),
            "edges are inclusive"
        );
    }

    #[test]
    fn path_coordinates_follow_pushed_transforms() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.scale_view(camera, 2.0);
        let n = boxed(&mut scene, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_transform(n, Transform::from_translation(10.0, 10.0));

        let path = scene.pick(camera, Point::new(30.0, 30.0), 0.0);
        assert_eq!(path.picked_node(), Some(n));
        assert_eq!(path.node_stack(), &[camera, layer, n]);
        let local = path.canvas_to_local_point(Point::new(30.0, 30.0), n).unwrap();
        assert!(close(local, Point::new(5.0, 5.0)), "{local:?}");
        let in_layer = path.canvas_to_local_point(Point::new(30.0, 30.0), layer).unwrap();
        assert!(close(in_layer, Point::new(15.0, 15.0)), "{in_layer:?}");
        let in_camera = path.canvas_to_local_point(Point::new(30.0, 30.0), camera).unwrap();
        assert!(close(in_camera, Point::new(30.0, 30.0)), "camera frame skips the view");
        let back = path.local_to_canvas_point(local, n).unwrap();
        assert!(close(back, Point::new(30.0, 30.0)), "{back:?}");
        let size = path.local_to_canvas_size(Size::new(1.0, 1.0), n).unwrap();
        assert_eq!(size, Size::new(2.0, 2.0));
        let pb = path.pick_bounds();
        assert!(close(pb.origin(), Point::new(5.0, 5.0)), "pick bounds in the picked frame");

        let stranger = scene.insert(None, LocalNode::default());
        assert_eq!(
            path.canvas_to_local_point(Point::ORIGIN, stranger),
            Err(PickPathError::NotOnPath)
        );
    }

    #[test]
    fn singular_transform_rejects_branch() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let below = boxed(&mut scene, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        let flat = boxed(&mut scene, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_transform(flat, Transform::from_coeffs([0.0, 0.0, 0.0, 0.0, 5.0, 5.0]));
        let path = scene.pick(camera, Point::new(5.0, 5.0), 1.0);
        assert_eq!(path.picked_node(), Some(below), "collapsed node cannot be picked");
    }

    #[test]
    fn singular_camera_still_reports_its_transform() {
        let (mut scene, camera, _) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_transform(camera, Transform::from_coeffs([0.0, 0.0, 0.0, 0.0, 5.0, 5.0]));
        let path = scene.pick(camera, Point::new(50.0, 50.0), 0.0);
        assert_eq!(path.picked_node(), Some(camera), "falls back to the camera");
        assert_eq!(
            path.path_transform_to(camera),
            Ok(scene.transform(camera)),
            "camera transform is on the path"
        );
        assert_eq!(
            path.canvas_to_local_point(Point::new(50.0, 50.0), camera),
            Err(PickPathError::Transform(TransformError::NonInvertible)),
            "mapping reports the singular transform"
        );
        assert_eq!(path.pick_bounds(), path.scene_pick_bounds());
    }

    #[test]
    fn flags_gate_picking() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let parent = boxed(&mut scene, layer, Rect::new(0.0, 0.0, 20.0, 20.0));
        let child = boxed(&mut scene, parent, Rect::new(0.0, 0.0, 10.0, 10.0));
        let p = Point::new(5.0, 5.0);

        assert_eq!(scene.pick(camera, p, 0.0).picked_node(), Some(child));
        scene.set_children_pickable(parent, false);
        assert_eq!(scene.pick(camera, p, 0.0).picked_node(), Some(parent));
        scene.set_children_pickable(parent, true);
        scene.set_pickable(child, false);
        assert_eq!(scene.pick(camera, p, 0.0).picked_node(), Some(parent));
        scene.set_visible(parent, false);
        assert_eq!(scene.pick(camera, p, 0.0).picked_node(), Some(camera), "hidden subtree");
    }

    #[derive(Clone)]
    struct Grabby;

    impl Content for Grabby {
        fn bounds(&self) -> Bounds {
            Bounds::new(0.0, 0.0, 20.0, 20.0)
        }

        fn pick(&self, _: Rect) -> bool {
            true
        }

        fn box_clone(&self) -> Box<dyn Content> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn content_pick_runs_before_children() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let group = scene.insert(Some(layer), LocalNode::default());
        scene.set_content(group, Some(Box::new(Grabby)));
        boxed(&mut scene, group, Rect::new(0.0, 0.0, 10.0, 10.0));
        let path = scene.pick(camera, Point::new(5.0, 5.0), 0.0);
        assert_eq!(path.picked_node(), Some(group), "content accepted first");
    }

    #[test]
    fn nested_cameras() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        let inner = scene.insert_node(
            Some(layer),
            NodeKind::Camera,
            LocalNode {
                bounds: Rect::new(0.0, 0.0, 50.0, 50.0).into(),
                ..Default::default()
            },
        );
        let inner_layer = scene.insert_node(None, NodeKind::Layer, LocalNode::default());
        scene.add_layer(inner, inner_layer);
        let n = boxed(&mut scene, inner_layer, Rect::new(0.0, 0.0, 10.0, 10.0));

        let path = scene.pick(camera, Point::new(5.0, 5.0), 0.0);
        assert_eq!(path.node_stack(), &[camera, layer, inner, inner_layer, n]);
        assert_eq!(path.top_camera(), camera);
        assert_eq!(path.bottom_camera(&scene), Some(inner));

        let path = scene.pick(camera, Point::new(30.0, 30.0), 0.0);
        assert_eq!(path.picked_node(), Some(inner), "inner camera catches misses");
    }
}
