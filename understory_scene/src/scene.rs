// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node arena: structure, ordering, cloning and the full-bounds cache.

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::activity::ActivityScheduler;
use crate::bounds::Bounds;
use crate::camera::ViewConstraint;
use crate::config::SceneConfig;
use crate::content::Content;
use crate::damage::Component;
use crate::event::EventListener;
use crate::root::InputSources;
use crate::transform::Transform;
use crate::types::{Color, Dirty, LocalNode, NodeFlags, NodeId, NodeKind};

#[cfg(feature = "std")]
use crate::thread_check::ThreadOwner;

/// A retained 2D scene: a tree of nodes under a single root, plus the layers
/// and cameras that view parts of it.
///
/// Nodes are addressed by generational [`NodeId`]s. Parent links and the
/// camera/layer observer lists are plain ids, so ownership flows only from a
/// parent to its children. Nodes may also live detached (no parent); they are
/// still validated and can be viewed by cameras if they are layers.
///
/// Operations on ids that are not [live](Self::is_alive) panic.
#[derive(Debug)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: NodeId,
    pub(crate) config: SceneConfig,
    pub(crate) global_time: u64,
    pub(crate) activities: ActivityScheduler,
    pub(crate) input_sources: InputSources,
    pub(crate) processing_inputs: bool,
    #[cfg(feature = "std")]
    thread_owner: Option<ThreadOwner>,
}

#[derive(Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) kind: Kind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) bounds: Bounds,
    pub(crate) transform: Transform,
    pub(crate) flags: NodeFlags,
    pub(crate) dirty: Dirty,
    /// Local bounds plus visible descendants, in this node's frame.
    pub(crate) full_bounds: Bounds,
    /// `full_bounds` mapped through `transform`.
    pub(crate) full_bounds_in_parent: Bounds,
    pub(crate) paint: Option<Color>,
    pub(crate) transparency: f32,
    pub(crate) content: Option<Box<dyn Content>>,
    pub(crate) listeners: Vec<Box<dyn EventListener>>,
}

#[derive(Debug)]
pub(crate) enum Kind {
    Node,
    Layer(LayerData),
    Camera(Box<CameraData>),
    Root,
}

#[derive(Debug, Default)]
pub(crate) struct LayerData {
    pub(crate) cameras: Vec<NodeId>,
}

#[derive(Debug)]
pub(crate) struct CameraData {
    pub(crate) layers: Vec<NodeId>,
    pub(crate) view_transform: Transform,
    pub(crate) view_constraint: ViewConstraint,
    pub(crate) component: Option<Box<dyn Component>>,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            view_transform: Transform::IDENTITY,
            view_constraint: ViewConstraint::None,
            component: None,
        }
    }
}

impl Kind {
    fn from_node_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Node => Self::Node,
            NodeKind::Layer => Self::Layer(LayerData::default()),
            NodeKind::Camera => Self::Camera(Box::default()),
            NodeKind::Root => panic!("a scene has exactly one root; it cannot be inserted"),
        }
    }

    fn node_kind(&self) -> NodeKind {
        match self {
            Self::Node => NodeKind::Node,
            Self::Layer(_) => NodeKind::Layer,
            Self::Camera(_) => NodeKind::Camera,
            Self::Root => NodeKind::Root,
        }
    }
}

impl Node {
    fn new(kind: Kind, local: LocalNode) -> Self {
        Self {
            generation: 0,
            kind,
            parent: None,
            children: Vec::new(),
            bounds: local.bounds,
            transform: local.transform,
            flags: local.flags,
            dirty: Dirty::FULL_BOUNDS | Dirty::PAINT,
            full_bounds: Bounds::EMPTY,
            full_bounds_in_parent: Bounds::EMPTY,
            paint: local.paint,
            transparency: local.transparency.clamp(0.0, 1.0),
            content: None,
            listeners: Vec::new(),
        }
    }

    /// Copy of this node's own state, without parent, children, observers or listeners.
    fn detached_copy(&self) -> Self {
        let kind = match &self.kind {
            Kind::Node | Kind::Root => Kind::Node,
            Kind::Layer(_) => Kind::Layer(LayerData::default()),
            Kind::Camera(camera) => Kind::Camera(Box::new(CameraData {
                layers: Vec::new(),
                view_transform: camera.view_transform,
                view_constraint: camera.view_constraint,
                component: None,
            })),
        };
        Self {
            generation: 0,
            kind,
            parent: None,
            children: Vec::new(),
            bounds: self.bounds,
            transform: self.transform,
            flags: self.flags,
            dirty: Dirty::FULL_BOUNDS | Dirty::PAINT,
            full_bounds: Bounds::EMPTY,
            full_bounds_in_parent: Bounds::EMPTY,
            paint: self.paint,
            transparency: self.transparency,
            content: self.content.as_ref().map(|c| c.box_clone()),
            listeners: Vec::new(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene holding only a root node, with default settings.
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create a scene holding only a root node.
    pub fn with_config(config: SceneConfig) -> Self {
        let mut scene = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 0),
            config,
            global_time: 0,
            activities: ActivityScheduler::default(),
            input_sources: InputSources::default(),
            processing_inputs: false,
            #[cfg(feature = "std")]
            thread_owner: config.thread_check.then(ThreadOwner::current),
        };
        scene.root = scene.alloc(Node::new(Kind::Root, LocalNode::default()));
        scene
    }

    /// Create the usual starting point: a root with a layer and a camera
    /// viewing that layer through `viewport` (the camera's local bounds).
    ///
    /// Returns `(scene, camera, layer)`.
    ///
    /// ```
    /// use kurbo::{Point, Rect};
    /// use understory_scene::{LocalNode, Scene};
    ///
    /// let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 400.0, 300.0));
    /// let node = scene.insert(
    ///     Some(layer),
    ///     LocalNode { bounds: Rect::new(10.0, 10.0, 50.0, 50.0).into(), ..Default::default() },
    /// );
    /// let path = scene.pick(camera, Point::new(20.0, 20.0), 1.0);
    /// assert_eq!(path.picked_node(), Some(node));
    /// ```
    pub fn basic(viewport: Rect) -> (Self, NodeId, NodeId) {
        let mut scene = Self::new();
        let root = scene.root;
        let layer = scene.insert_node(Some(root), NodeKind::Layer, LocalNode::default());
        let camera = scene.insert_node(
            Some(root),
            NodeKind::Camera,
            LocalNode {
                bounds: Bounds::from_rect(viewport),
                ..Default::default()
            },
        );
        scene.add_layer(camera, layer);
        (scene, camera, layer)
    }

    /// Scene settings.
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Insert a plain node under `parent` (or detached if `None`).
    pub fn insert(&mut self, parent: Option<NodeId>, local: LocalNode) -> NodeId {
        self.insert_node(parent, NodeKind::Node, local)
    }

    /// Insert a node of the given kind under `parent` (or detached if `None`).
    ///
    /// # Panics
    ///
    /// If `kind` is [`NodeKind::Root`], or `parent` is not live.
    pub fn insert_node(&mut self, parent: Option<NodeId>, kind: NodeKind, local: LocalNode) -> NodeId {
        let id = self.alloc(Node::new(Kind::from_node_kind(kind), local));
        if let Some(p) = parent {
            self.add_child(p, id);
        }
        id
    }

    fn alloc(&mut self, mut node: Node) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            node.generation = generation;
            self.nodes[idx] = Some(node);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            NodeId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            node.generation = generation;
            self.nodes.push(Some(node));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            NodeId::new((self.nodes.len() - 1) as u32, generation)
        }
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.idx()).and_then(|n| n.as_ref()) {
            Some(n) if n.generation == id.1 => n,
            _ => panic!("dangling NodeId {id:?}"),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.idx()).and_then(|n| n.as_mut()) {
            Some(n) if n.generation == id.1 => n,
            _ => panic!("dangling NodeId {id:?}"),
        }
    }

    pub(crate) fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        (n.generation == id.1).then_some(n)
    }

    /// Live nodes without a parent, the root first.
    pub(crate) fn parentless(&self) -> SmallVec<[NodeId; 4]> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let n = slot.as_ref()?;
                n.parent.is_none().then(|| NodeId::from_slot(idx, n.generation))
            })
            .collect()
    }

    #[inline]
    pub(crate) fn check_thread(&self, operation: &str) {
        #[cfg(feature = "std")]
        if let Some(owner) = &self.thread_owner {
            owner.check(operation);
        }
        #[cfg(not(feature = "std"))]
        let _ = operation;
    }

    /// The role of a node.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind.node_kind()
    }

    /// Stale cached state on a node.
    pub fn dirty(&self, id: NodeId) -> Dirty {
        self.node(id).dirty
    }

    // --- structure ---

    /// The parent of a node, `None` for the root and detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children in paint order (first is painted first, so last is on top).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    /// The child at `index`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn child(&self, id: NodeId, index: usize) -> NodeId {
        let children = &self.node(id).children;
        match children.get(index) {
            Some(&c) => c,
            None => panic!("child index {index} out of range for {} children", children.len()),
        }
    }

    /// Position of `child` in `parent`'s child list.
    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.node(node).parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.node(p).parent;
        }
        false
    }

    /// Whether `node` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.is_ancestor_of(ancestor, node)
    }

    /// Append `child` as the topmost child of `parent`.
    ///
    /// Re-adding an existing child moves it to the top.
    ///
    /// # Panics
    ///
    /// If `child` already belongs to another parent, is the root, or is
    /// `parent` or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.node(parent).children.len();
        let index = if self.node(child).parent == Some(parent) {
            index - 1
        } else {
            index
        };
        self.insert_child(parent, index, child);
    }

    /// Insert `child` at `index` in `parent`'s child list.
    ///
    /// If `child` is already a child of `parent` it is moved, and `index` is
    /// interpreted after its removal.
    ///
    /// # Panics
    ///
    /// If `index` is greater than the child count, or on the same misuse as
    /// [`add_child`](Self::add_child).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        assert!(
            self.node(child).parent.is_none_or(|p| p == parent),
            "node {child:?} already has a parent; remove it before adding it elsewhere"
        );
        assert!(
            !matches!(self.node(child).kind, Kind::Root),
            "the root cannot be added as a child"
        );
        assert!(
            child != parent && !self.is_ancestor_of(child, parent),
            "cannot add {child:?} below itself"
        );
        if self.node(child).parent == Some(parent) {
            self.node_mut(parent).children.retain(|&c| c != child);
        }
        let children = &mut self.node_mut(parent).children;
        assert!(
            index <= children.len(),
            "child index {index} out of range for {} children",
            children.len()
        );
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        self.invalidate_paint(child);
        self.invalidate_full_bounds(parent);
    }

    /// Detach `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.node(child).parent != Some(parent) {
            return false;
        }
        self.detach(child, parent);
        true
    }

    /// Detach and return the child at `index`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> NodeId {
        let child = self.child(parent, index);
        self.detach(child, parent);
        child
    }

    /// Detach a node from its parent, if it has one.
    pub fn remove_from_parent(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.detach(id, parent);
        }
    }

    /// Detach every child of `parent`.
    pub fn remove_all_children(&mut self, parent: NodeId) {
        let children = core::mem::take(&mut self.node_mut(parent).children);
        for &child in &children {
            self.validate_full_bounds(child);
            self.repaint(child);
            self.node_mut(child).parent = None;
        }
        if !children.is_empty() {
            self.invalidate_full_bounds(parent);
        }
    }

    /// Put `replacement` in `id`'s place in its parent, detaching `id`.
    ///
    /// # Panics
    ///
    /// If `id` has no parent.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) {
        let Some(parent) = self.node(id).parent else {
            panic!("cannot replace {id:?}: it has no parent");
        };
        self.remove_from_parent(replacement);
        let index = self
            .index_of_child(parent, id)
            .unwrap_or(self.child_count(parent));
        self.detach(id, parent);
        self.insert_child(parent, index, replacement);
    }

    fn detach(&mut self, child: NodeId, parent: NodeId) {
        self.validate_full_bounds(child);
        self.repaint(child);
        self.node_mut(parent).children.retain(|&c| c != child);
        self.node_mut(child).parent = None;
        self.invalidate_full_bounds(parent);
    }

    /// Remove a node and its whole subtree from the scene.
    ///
    /// Destroyed layers and cameras are dropped from every observer list, and
    /// their ids become stale.
    ///
    /// # Panics
    ///
    /// If `id` is the root.
    pub fn destroy(&mut self, id: NodeId) {
        assert!(id != self.root, "the root cannot be destroyed");
        self.remove_from_parent(id);

        let mut subtree = Vec::new();
        let mut stack = Vec::new();
        stack.push(id);
        while let Some(n) = stack.pop() {
            subtree.push(n);
            stack.extend(self.node(n).children.iter().copied());
        }
        let doomed: HashSet<NodeId> = subtree.iter().copied().collect();

        // Observer lists are cleaned while every slot is still live; only
        // observers outside the subtree need updating.
        for &n in &subtree {
            let (cameras, layers): (SmallVec<[NodeId; 4]>, SmallVec<[NodeId; 4]>) =
                match &self.node(n).kind {
                    Kind::Layer(layer) => (layer.cameras.iter().copied().collect(), SmallVec::new()),
                    Kind::Camera(camera) => (SmallVec::new(), camera.layers.iter().copied().collect()),
                    Kind::Node | Kind::Root => continue,
                };
            for camera in cameras {
                if doomed.contains(&camera) {
                    continue;
                }
                if let Some(Node {
                    kind: Kind::Camera(data),
                    ..
                }) = self.node_opt_mut(camera)
                {
                    data.layers.retain(|&l| l != n);
                    self.invalidate_paint(camera);
                }
            }
            for layer in layers {
                if doomed.contains(&layer) {
                    continue;
                }
                if let Some(Node {
                    kind: Kind::Layer(data),
                    ..
                }) = self.node_opt_mut(layer)
                {
                    data.cameras.retain(|&c| c != n);
                }
            }
        }

        for n in subtree {
            self.nodes[n.idx()] = None;
            self.free_list.push(n.idx());
        }
    }

    /// Deep-copy a subtree and return the detached copy.
    ///
    /// Geometry, appearance and content are copied. Event listeners, camera
    /// components and camera/layer observations are not, and a cloned root
    /// becomes a plain node.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let copy = self.alloc(self.node(id).detached_copy());
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.add_child(copy, child_copy);
        }
        copy
    }

    // --- ordering ---

    fn move_within_parent(&mut self, id: NodeId, target: impl FnOnce(usize, usize) -> usize) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let Some(index) = self.index_of_child(parent, id) else {
            return;
        };
        let len = self.child_count(parent);
        let new_index = target(index, len);
        if new_index == index {
            return;
        }
        let children = &mut self.node_mut(parent).children;
        children.remove(index);
        children.insert(new_index, id);
        self.invalidate_paint(id);
    }

    /// Move one step towards the top of the parent's paint order.
    pub fn raise(&mut self, id: NodeId) {
        self.move_within_parent(id, |index, len| (index + 1).min(len - 1));
    }

    /// Move one step towards the bottom of the parent's paint order.
    pub fn lower(&mut self, id: NodeId) {
        self.move_within_parent(id, |index, _| index.saturating_sub(1));
    }

    /// Paint last among siblings.
    pub fn raise_to_top(&mut self, id: NodeId) {
        self.move_within_parent(id, |_, len| len - 1);
    }

    /// Paint first among siblings.
    pub fn lower_to_bottom(&mut self, id: NodeId) {
        self.move_within_parent(id, |_, _| 0);
    }

    /// Place directly above `sibling`. No-op unless both share a parent.
    pub fn raise_above(&mut self, id: NodeId, sibling: NodeId) {
        self.place_relative_to(id, sibling, 1);
    }

    /// Place directly below `sibling`. No-op unless both share a parent.
    pub fn lower_below(&mut self, id: NodeId, sibling: NodeId) {
        self.place_relative_to(id, sibling, 0);
    }

    fn place_relative_to(&mut self, id: NodeId, sibling: NodeId, after: usize) {
        let parent = match self.node(id).parent {
            Some(p) if id != sibling && self.node(sibling).parent == Some(p) => p,
            _ => return,
        };
        let children = &mut self.node_mut(parent).children;
        children.retain(|&c| c != id);
        let Some(index) = children.iter().position(|&c| c == sibling) else {
            return;
        };
        children.insert(index + after, id);
        self.invalidate_paint(id);
    }

    // --- full bounds cache ---

    /// Mark a node's full bounds stale and flag its ancestors.
    pub(crate) fn invalidate_full_bounds(&mut self, id: NodeId) {
        self.check_thread("bounds invalidation");
        self.node_mut(id).dirty.insert(Dirty::FULL_BOUNDS);
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            let n = self.node_mut(p);
            if n.dirty.contains(Dirty::CHILD_BOUNDS) {
                break;
            }
            n.dirty.insert(Dirty::CHILD_BOUNDS);
            cur = n.parent;
        }
    }

    /// Bring a subtree's full-bounds caches up to date in one post-order pass.
    ///
    /// When a node's result in its parent's frame changes, the parent is marked
    /// for recomputation, and if the node was also awaiting repaint, its old
    /// area is repainted.
    pub(crate) fn validate_full_bounds(&mut self, id: NodeId) {
        let dirty = self.node(id).dirty;
        if !dirty.intersects(Dirty::FULL_BOUNDS | Dirty::CHILD_BOUNDS) {
            return;
        }
        if dirty.contains(Dirty::CHILD_BOUNDS) {
            let children: SmallVec<[NodeId; 16]> =
                self.node(id).children.iter().copied().collect();
            for child in children {
                self.validate_full_bounds(child);
            }
        }
        if self.node(id).dirty.contains(Dirty::FULL_BOUNDS) {
            let node = self.node(id);
            let mut full = node.bounds;
            for &child in &node.children {
                let c = self.node(child);
                if c.flags.contains(NodeFlags::VISIBLE) {
                    full.add_bounds(&c.full_bounds_in_parent);
                }
            }
            let node = self.node_mut(id);
            let old = node.full_bounds_in_parent;
            let in_parent = node.transform.transform_bounds(&full);
            node.full_bounds = full;
            node.full_bounds_in_parent = in_parent;
            let paint_dirty = node.dirty.contains(Dirty::PAINT);
            let parent = node.parent;
            if old != in_parent {
                if let Some(parent) = parent {
                    self.invalidate_full_bounds(parent);
                }
                if paint_dirty {
                    if let Some(old_rect) = old.rect() {
                        self.repaint_above(id, old_rect);
                    }
                }
            }
        }
        self.node_mut(id)
            .dirty
            .remove(Dirty::FULL_BOUNDS | Dirty::CHILD_BOUNDS);
    }

    /// Validate full bounds for every tree in the scene.
    pub(crate) fn validate_all_full_bounds(&mut self) {
        for id in self.parentless() {
            self.validate_full_bounds(id);
        }
    }

    /// Bring every cache up to date: full bounds first, then pending repaints.
    pub fn validate(&mut self) {
        self.validate_all_full_bounds();
        for id in self.parentless() {
            self.validate_full_paint(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f64, y: f64, w: f64, h: f64) -> LocalNode {
        LocalNode {
            bounds: Bounds::new(x, y, w, h),
            ..Default::default()
        }
    }

    #[test]
    fn insert_links_parent_and_children() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(a), LocalNode::default());
        assert_eq!(scene.parent(b), Some(a));
        assert_eq!(scene.children(root), &[a]);
        assert_eq!(scene.child(a, 0), b);
        assert!(scene.is_ancestor_of(root, b), "root is above b");
        assert!(scene.is_descendant_of(b, a), "b is below a");
        assert!(!scene.is_ancestor_of(b, a), "b is not above a");
        assert_eq!(scene.kind(root), NodeKind::Root);
    }

    #[test]
    fn readding_moves_to_top() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(root), LocalNode::default());
        let c = scene.insert(Some(root), LocalNode::default());
        scene.add_child(root, a);
        assert_eq!(scene.children(root), &[b, c, a], "no duplicates, moved to end");
        scene.insert_child(root, 0, c);
        assert_eq!(scene.children(root), &[c, b, a]);
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn adding_owned_node_elsewhere_panics() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(root), LocalNode::default());
        let c = scene.insert(Some(a), LocalNode::default());
        scene.add_child(b, c);
    }

    #[test]
    #[should_panic(expected = "below itself")]
    fn adding_ancestor_panics() {
        let mut scene = Scene::new();
        let a = scene.insert(None, LocalNode::default());
        let b = scene.insert(Some(a), LocalNode::default());
        scene.add_child(b, a);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn child_index_out_of_range_panics() {
        let scene = Scene::new();
        let _ = scene.child(scene.root(), 0);
    }

    #[test]
    fn remove_and_replace() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(root), LocalNode::default());
        let c = scene.insert(None, LocalNode::default());
        scene.replace_with(a, c);
        assert_eq!(scene.children(root), &[c, b]);
        assert_eq!(scene.parent(a), None);
        assert!(scene.remove_child(root, b), "b was a child");
        assert!(!scene.remove_child(root, b), "b is no longer a child");
        assert_eq!(scene.remove_child_at(root, 0), c);
        assert_eq!(scene.child_count(root), 0);

        let d = scene.insert(Some(root), LocalNode::default());
        let e = scene.insert(Some(root), LocalNode::default());
        scene.remove_all_children(root);
        assert_eq!(scene.parent(d), None);
        assert_eq!(scene.parent(e), None);
        assert!(scene.is_alive(d), "removal does not destroy");
    }

    #[test]
    fn destroy_frees_subtree_and_reuses_slots() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(a), LocalNode::default());
        scene.destroy(a);
        assert!(!scene.is_alive(a), "destroyed node is stale");
        assert!(!scene.is_alive(b), "descendants are destroyed too");
        assert_eq!(scene.child_count(root), 0);
        let c = scene.insert(Some(root), LocalNode::default());
        assert!(scene.is_alive(c), "new node is live");
        assert!(!scene.is_alive(a) && !scene.is_alive(b), "old ids stay stale after reuse");
    }

    #[test]
    #[should_panic(expected = "root cannot be destroyed")]
    fn destroying_root_panics() {
        let mut scene = Scene::new();
        let root = scene.root();
        scene.destroy(root);
    }

    #[test]
    fn ordering_moves_within_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(root), LocalNode::default());
        let c = scene.insert(Some(root), LocalNode::default());

        scene.raise(a);
        assert_eq!(scene.children(root), &[b, a, c]);
        scene.raise_to_top(b);
        assert_eq!(scene.children(root), &[a, c, b]);
        scene.lower(b);
        assert_eq!(scene.children(root), &[a, b, c]);
        scene.lower_to_bottom(c);
        assert_eq!(scene.children(root), &[c, a, b]);
        scene.raise_above(c, b);
        assert_eq!(scene.children(root), &[a, b, c]);
        scene.lower_below(c, a);
        assert_eq!(scene.children(root), &[c, a, b]);

        // Raising the top node or lowering the bottom one does nothing.
        scene.raise(b);
        scene.lower(c);
        assert_eq!(scene.children(root), &[c, a, b]);
    }

    #[test]
    fn sibling_relative_ordering_ignores_non_siblings() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(root), LocalNode::default());
        let stranger = scene.insert(None, LocalNode::default());
        scene.raise_above(a, stranger);
        scene.lower_below(b, stranger);
        assert_eq!(scene.children(root), &[a, b], "no-op for non-siblings");
    }

    struct Ignore;

    impl EventListener for Ignore {
        fn on_event(
            &mut self,
            _: &mut Scene,
            _: &crate::event::EventContext<'_>,
            _: &mut crate::event::InputEvent,
        ) -> crate::event::Outcome {
            crate::event::Outcome::Continue
        }
    }

    #[test]
    fn clone_copies_subtree_but_not_parent_or_listeners() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), boxed(0.0, 0.0, 10.0, 10.0));
        let b = scene.insert(Some(a), boxed(5.0, 5.0, 10.0, 10.0));
        scene.set_transform(b, Transform::from_translation(3.0, 4.0));
        scene.add_event_listener(a, Box::new(Ignore));
        scene.add_event_listener(b, Box::new(Ignore));

        let copy = scene.clone_subtree(a);
        assert_eq!(scene.listener_count(copy), 0, "listeners are not cloned");
        assert_eq!(scene.listener_count(a), 1, "original keeps its listener");
        assert_ne!(copy, a);
        assert_eq!(scene.parent(copy), None, "clones start detached");
        assert_eq!(scene.child_count(copy), 1);
        let b_copy = scene.child(copy, 0);
        assert_ne!(b_copy, b, "children are new instances");
        assert_eq!(scene.transform(b_copy), scene.transform(b));
        assert_eq!(scene.bounds(b_copy), scene.bounds(b));
        assert_eq!(scene.full_bounds(copy), scene.full_bounds(a));
        assert_eq!(scene.listener_count(b_copy), 0, "nor are the children's");
    }

    #[test]
    fn clone_of_camera_drops_layers_and_component() {
        let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_component(camera, Some(Box::new(crate::damage::Damage::default())));
        scene.set_view_transform(camera, Transform::from_scale(2.0));

        let copy = scene.clone_subtree(camera);
        assert_eq!(scene.kind(copy), NodeKind::Camera);
        assert_eq!(scene.layer_count(copy), 0, "layers are not observed by the clone");
        assert!(scene.component(copy).is_none(), "component stays with the original");
        assert_eq!(scene.view_transform(copy), scene.view_transform(camera));
        assert_eq!(scene.cameras(layer), &[camera], "layer still has one observer");
        assert!(scene.component(camera).is_some(), "original keeps its component");

        let root_copy = scene.clone_subtree(scene.root());
        assert_eq!(scene.kind(root_copy), NodeKind::Node, "a cloned root is a plain node");
    }

    #[test]
    fn invalidation_stops_at_flagged_ancestor() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(Some(root), LocalNode::default());
        let b = scene.insert(Some(a), LocalNode::default());
        scene.validate();
        assert!(scene.dirty(root).is_empty(), "validated scene is clean");

        scene.set_bounds(b, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(scene.dirty(b).contains(Dirty::FULL_BOUNDS));
        assert!(scene.dirty(a).contains(Dirty::CHILD_BOUNDS));
        assert!(scene.dirty(root).contains(Dirty::CHILD_BOUNDS));
        assert!(!scene.dirty(a).contains(Dirty::FULL_BOUNDS), "parent recomputes lazily");

        scene.validate();
        assert!(scene.dirty(root).is_empty() && scene.dirty(a).is_empty() && scene.dirty(b).is_empty());
    }
}
