// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local geometry, full bounds queries and coordinate conversion along the ancestor chain.

use kurbo::{Point, Rect, Size, Vec2};

use crate::bounds::Bounds;
use crate::scene::Scene;
use crate::transform::{Transform, TransformError};
use crate::types::NodeId;

impl Scene {
    // --- local bounds ---

    /// Local bounds of a node.
    pub fn bounds(&self, id: NodeId) -> Bounds {
        self.node(id).bounds
    }

    /// Replace a node's local bounds.
    pub fn set_bounds(&mut self, id: NodeId, bounds: impl Into<Bounds>) {
        let bounds = bounds.into();
        if self.node(id).bounds == bounds {
            return;
        }
        self.node_mut(id).bounds = bounds;
        self.geometry_changed(id);
    }

    /// Make a node's local bounds empty.
    pub fn reset_bounds(&mut self, id: NodeId) {
        let mut bounds = self.node(id).bounds;
        bounds.reset_to_zero();
        self.set_bounds(id, bounds);
    }

    /// Shift local bounds so their center lands on `point` (local frame).
    ///
    /// Returns false when the bounds are empty.
    pub fn center_bounds_on_point(&mut self, id: NodeId, point: Point) -> bool {
        let Some(rect) = self.node(id).bounds.rect() else {
            return false;
        };
        let delta = point - rect.center();
        self.set_bounds(id, rect + delta);
        true
    }

    /// Offset the node so its full bounds are centered on `point` (parent frame).
    ///
    /// Returns false when the full bounds are empty.
    pub fn center_full_bounds_on_point(&mut self, id: NodeId, point: Point) -> bool {
        let Some(rect) = self.full_bounds_in_parent(id).rect() else {
            return false;
        };
        let delta = point - rect.center();
        self.offset_by(id, delta.x, delta.y);
        true
    }

    fn geometry_changed(&mut self, id: NodeId) {
        self.invalidate_paint(id);
        self.invalidate_full_bounds(id);
    }

    // --- full bounds ---

    /// Local bounds united with every visible descendant, in the node's own frame.
    pub fn full_bounds(&mut self, id: NodeId) -> Bounds {
        self.validate_full_bounds(id);
        self.node(id).full_bounds
    }

    /// [`full_bounds`](Self::full_bounds) mapped into the parent's frame.
    pub fn full_bounds_in_parent(&mut self, id: NodeId) -> Bounds {
        self.validate_full_bounds(id);
        self.node(id).full_bounds_in_parent
    }

    /// Union of every child's full bounds, in this node's frame.
    pub fn union_of_children_bounds(&mut self, id: NodeId) -> Bounds {
        let children = self.node(id).children.clone();
        let mut out = Bounds::EMPTY;
        for child in children {
            out.add_bounds(&self.full_bounds_in_parent(child));
        }
        out
    }

    // --- transform ---

    /// Transform from the node's frame into its parent's frame.
    pub fn transform(&self, id: NodeId) -> Transform {
        self.node(id).transform
    }

    /// Replace the node's transform.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if self.node(id).transform == transform {
            return;
        }
        self.node_mut(id).transform = transform;
        self.geometry_changed(id);
    }

    fn update_transform(&mut self, id: NodeId, f: impl FnOnce(&mut Transform)) {
        let mut transform = self.node(id).transform;
        f(&mut transform);
        self.set_transform(id, transform);
    }

    /// Translation component of the transform.
    pub fn offset(&self, id: NodeId) -> Vec2 {
        self.node(id).transform.offset()
    }

    /// Replace the translation component of the transform.
    pub fn set_offset(&mut self, id: NodeId, x: f64, y: f64) {
        self.update_transform(id, |t| t.set_offset(x, y));
    }

    /// Add to the translation component, in the parent's frame.
    pub fn offset_by(&mut self, id: NodeId, dx: f64, dy: f64) {
        self.update_transform(id, |t| {
            let o = t.offset();
            t.set_offset(o.x + dx, o.y + dy);
        });
    }

    /// Compose a translation in the node's own frame.
    pub fn translate(&mut self, id: NodeId, dx: f64, dy: f64) {
        self.update_transform(id, |t| t.translate(dx, dy));
    }

    /// Compose a uniform scale about the local origin.
    pub fn scale(&mut self, id: NodeId, scale: f64) {
        self.update_transform(id, |t| t.scale(scale));
    }

    /// Compose a uniform scale about a local point.
    pub fn scale_about_point(&mut self, id: NodeId, scale: f64, point: Point) {
        self.update_transform(id, |t| t.scale_about_point(scale, point.x, point.y));
    }

    /// Current scale of the transform.
    pub fn scale_factor(&self, id: NodeId) -> f64 {
        self.node(id).transform.scale_factor()
    }

    /// Replace the scale of the transform.
    pub fn set_scale(&mut self, id: NodeId, scale: f64) -> Result<(), TransformError> {
        let mut transform = self.node(id).transform;
        transform.set_scale(scale)?;
        self.set_transform(id, transform);
        Ok(())
    }

    /// Compose a rotation about the local origin.
    pub fn rotate(&mut self, id: NodeId, theta: f64) {
        self.update_transform(id, |t| t.rotate(theta));
    }

    /// Compose a rotation about a local point.
    pub fn rotate_about_point(&mut self, id: NodeId, theta: f64, point: Point) {
        self.update_transform(id, |t| t.rotate_about_point(theta, point.x, point.y));
    }

    /// Current rotation of the transform, in `[0, 2π)`.
    pub fn rotation(&self, id: NodeId) -> f64 {
        self.node(id).transform.rotation()
    }

    /// Replace the rotation of the transform.
    pub fn set_rotation(&mut self, id: NodeId, theta: f64) {
        self.update_transform(id, |t| t.set_rotation(theta));
    }

    // --- parent frame ---

    /// Map a local point into the parent's frame.
    pub fn local_to_parent_point(&self, id: NodeId, point: Point) -> Point {
        self.node(id).transform.transform_point(point)
    }

    /// Map a local rectangle into the parent's frame.
    pub fn local_to_parent_rect(&self, id: NodeId, rect: Rect) -> Rect {
        self.node(id).transform.transform_rect(rect)
    }

    /// Map a point in the parent's frame into the local frame.
    pub fn parent_to_local_point(&self, id: NodeId, point: Point) -> Result<Point, TransformError> {
        self.node(id).transform.inverse_transform_point(point)
    }

    /// Map a rectangle in the parent's frame into the local frame.
    pub fn parent_to_local_rect(&self, id: NodeId, rect: Rect) -> Result<Rect, TransformError> {
        self.node(id).transform.inverse_transform_rect(rect)
    }

    // --- global frame ---

    /// Composition of every transform from the node up to and including the topmost ancestor.
    ///
    /// Walks the ancestor chain on every call.
    pub fn local_to_global_transform(&self, id: NodeId) -> Transform {
        let node = self.node(id);
        let mut transform = node.transform;
        let mut cur = node.parent;
        while let Some(p) = cur {
            let parent = self.node(p);
            transform.pre_concatenate(&parent.transform);
            cur = parent.parent;
        }
        transform
    }

    /// Inverse of [`local_to_global_transform`](Self::local_to_global_transform).
    pub fn global_to_local_transform(&self, id: NodeId) -> Result<Transform, TransformError> {
        self.local_to_global_transform(id).create_inverse()
    }

    /// Map a local point into the global frame.
    pub fn local_to_global_point(&self, id: NodeId, point: Point) -> Point {
        self.local_to_global_transform(id).transform_point(point)
    }

    /// Map a local size into the global frame.
    pub fn local_to_global_size(&self, id: NodeId, size: Size) -> Size {
        self.local_to_global_transform(id).transform_size(size)
    }

    /// Map a local rectangle into the global frame.
    pub fn local_to_global_rect(&self, id: NodeId, rect: Rect) -> Rect {
        self.local_to_global_transform(id).transform_rect(rect)
    }

    /// Map a global point into the local frame.
    pub fn global_to_local_point(&self, id: NodeId, point: Point) -> Result<Point, TransformError> {
        self.local_to_global_transform(id).inverse_transform_point(point)
    }

    /// Map a global size into the local frame.
    pub fn global_to_local_size(&self, id: NodeId, size: Size) -> Result<Size, TransformError> {
        self.local_to_global_transform(id).inverse_transform_size(size)
    }

    /// Map a global rectangle into the local frame.
    pub fn global_to_local_rect(&self, id: NodeId, rect: Rect) -> Result<Rect, TransformError> {
        self.local_to_global_transform(id).inverse_transform_rect(rect)
    }

    /// Accumulated scale from the node up through its ancestors.
    pub fn global_scale(&self, id: NodeId) -> f64 {
        self.local_to_global_transform(id).scale_factor()
    }

    /// Set the local scale so the accumulated scale becomes `scale`.
    ///
    /// Fails with [`TransformError::DegenerateScale`] when an ancestor scale is zero.
    pub fn set_global_scale(&mut self, id: NodeId, scale: f64) -> Result<(), TransformError> {
        let parent_scale = self.node(id).parent.map_or(1.0, |p| self.global_scale(p));
        if parent_scale == 0.0 {
            return Err(TransformError::DegenerateScale);
        }
        self.set_scale(id, scale / parent_scale)
    }

    /// Accumulated rotation from the node up through its ancestors.
    pub fn global_rotation(&self, id: NodeId) -> f64 {
        self.local_to_global_transform(id).rotation()
    }

    /// Set the local rotation so the accumulated rotation becomes `theta`.
    pub fn set_global_rotation(&mut self, id: NodeId, theta: f64) {
        let parent_rotation = self.node(id).parent.map_or(0.0, |p| self.global_rotation(p));
        self.set_rotation(id, theta - parent_rotation);
    }

    /// The node's offset expressed in the global frame.
    pub fn global_translation(&self, id: NodeId) -> Point {
        let offset = self.offset(id).to_point();
        match self.node(id).parent {
            Some(p) => self.local_to_global_point(p, offset),
            None => offset,
        }
    }

    /// Set the offset so the node's origin lands on the global point `point`.
    pub fn set_global_translation(&mut self, id: NodeId, point: Point) -> Result<(), TransformError> {
        let local = match self.node(id).parent {
            Some(p) => self.global_to_local_point(p, point)?,
            None => point,
        };
        self.set_offset(id, local.x, local.y);
        Ok(())
    }

    /// Local bounds in the global frame.
    pub fn global_bounds(&self, id: NodeId) -> Bounds {
        self.local_to_global_transform(id)
            .transform_bounds(&self.node(id).bounds)
    }

    /// Full bounds in the global frame.
    pub fn global_full_bounds(&mut self, id: NodeId) -> Bounds {
        let in_parent = self.full_bounds_in_parent(id);
        match self.node(id).parent {
            Some(p) => self.local_to_global_transform(p).transform_bounds(&in_parent),
            None => in_parent,
        }
    }

    /// Move a node under `new_parent` without changing where it renders.
    ///
    /// The node's transform is replaced by the one that maps it to the same
    /// global position under the new parent. Fails, leaving the scene
    /// untouched, when the new parent's global transform is not invertible.
    ///
    /// # Panics
    ///
    /// If `new_parent` is the node itself or one of its descendants.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), TransformError> {
        assert!(
            id != new_parent && !self.is_ancestor_of(id, new_parent),
            "cannot reparent {id:?} below itself"
        );
        let global = self.local_to_global_transform(id);
        let mut local = self.global_to_local_transform(new_parent)?;
        local.concatenate(&global);
        self.remove_from_parent(id);
        self.set_transform(id, local);
        self.add_child(new_parent, id);
        Ok(())
    }
}
