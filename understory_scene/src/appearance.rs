// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node appearance: fill, transparency, flags and attached content.

use alloc::boxed::Box;

use crate::content::Content;
use crate::scene::Scene;
use crate::types::{Color, NodeFlags, NodeId};

impl Scene {
    /// Visibility and picking flags.
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.node(id).flags
    }

    /// Whether the node is painted and counted in its parent's full bounds.
    pub fn visible(&self, id: NodeId) -> bool {
        self.node(id).flags.contains(NodeFlags::VISIBLE)
    }

    /// Show or hide a node and its subtree.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if self.visible(id) == visible {
            return;
        }
        if !visible {
            self.validate_full_bounds(id);
            self.repaint(id);
        }
        self.node_mut(id).flags.set(NodeFlags::VISIBLE, visible);
        self.invalidate_paint(id);
        if let Some(parent) = self.node(id).parent {
            self.invalidate_full_bounds(parent);
        }
    }

    /// Whether the node itself can be picked.
    pub fn pickable(&self, id: NodeId) -> bool {
        self.node(id).flags.contains(NodeFlags::PICKABLE)
    }

    /// Allow or refuse picks on the node itself.
    pub fn set_pickable(&mut self, id: NodeId, pickable: bool) {
        self.node_mut(id).flags.set(NodeFlags::PICKABLE, pickable);
    }

    /// Whether picks descend into the node's children.
    pub fn children_pickable(&self, id: NodeId) -> bool {
        self.node(id).flags.contains(NodeFlags::CHILDREN_PICKABLE)
    }

    /// Allow or refuse picks below the node.
    pub fn set_children_pickable(&mut self, id: NodeId, pickable: bool) {
        self.node_mut(id)
            .flags
            .set(NodeFlags::CHILDREN_PICKABLE, pickable);
    }

    /// Fill painted over the node's bounds.
    pub fn paint(&self, id: NodeId) -> Option<Color> {
        self.node(id).paint
    }

    /// Replace the node's fill.
    pub fn set_paint(&mut self, id: NodeId, paint: Option<Color>) {
        if self.node(id).paint == paint {
            return;
        }
        self.node_mut(id).paint = paint;
        self.invalidate_paint(id);
    }

    /// Opacity applied to the node and its subtree.
    pub fn transparency(&self, id: NodeId) -> f32 {
        self.node(id).transparency
    }

    /// Set the opacity, clamped to `0.0..=1.0`.
    pub fn set_transparency(&mut self, id: NodeId, transparency: f32) {
        let transparency = transparency.clamp(0.0, 1.0);
        if self.node(id).transparency == transparency {
            return;
        }
        self.node_mut(id).transparency = transparency;
        self.invalidate_paint(id);
    }

    /// Attach (or with `None`, detach) shape content and size the node to it.
    pub fn set_content(&mut self, id: NodeId, content: Option<Box<dyn Content>>) {
        self.node_mut(id).content = content;
        self.update_bounds_from_content(id);
        self.invalidate_paint(id);
    }

    /// The node's content, if any.
    pub fn content(&self, id: NodeId) -> Option<&dyn Content> {
        self.node(id).content.as_deref()
    }

    /// Re-read the content's bounds into the node's local bounds.
    ///
    /// Call this after mutating content in place. Nodes without content keep
    /// their bounds.
    pub fn update_bounds_from_content(&mut self, id: NodeId) {
        if let Some(bounds) = self.node(id).content.as_ref().map(|c| c.bounds()) {
            self.set_bounds(id, bounds);
        }
    }

    /// Mutable access to content of a concrete type.
    ///
    /// Follow mutations that change the shape with
    /// [`update_bounds_from_content`](Self::update_bounds_from_content).
    pub fn content_mut<T: Content>(&mut self, id: NodeId) -> Option<&mut T> {
        let content: &mut dyn Content = self.node_mut(id).content.as_deref_mut()?;
        let any: &mut dyn core::any::Any = content;
        any.downcast_mut::<T>()
    }
}
