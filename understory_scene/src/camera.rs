// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cameras and layers: observer lists, the view transform, view framing and constraints.
//!
//! A camera views any number of layers through its view transform, which maps
//! layer (view) coordinates into the camera's local frame. Layers are observed,
//! not owned: one layer may be watched by several cameras at once.

use alloc::boxed::Box;
use core::any::Any;

use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::activity::{Activity, ActivityId, ViewTransformTarget};
use crate::bounds::Bounds;
use crate::damage::Component;
use crate::scene::{CameraData, Kind, LayerData, Scene};
use crate::transform::{Transform, TransformError};
use crate::types::NodeId;

/// Keeps a camera's view over its layers after every view change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewConstraint {
    /// The view moves freely.
    #[default]
    None,
    /// The view is panned by the smallest amount that keeps the union of the
    /// layers' full bounds inside it (axes where the layers are larger than
    /// the view are left alone).
    All,
    /// The view is panned so the center of the layers stays inside it.
    Center,
}

impl Scene {
    fn camera_data(&self, camera: NodeId) -> &CameraData {
        match &self.node(camera).kind {
            Kind::Camera(data) => data,
            _ => panic!("node {camera:?} is not a camera"),
        }
    }

    fn camera_data_mut(&mut self, camera: NodeId) -> &mut CameraData {
        match &mut self.node_mut(camera).kind {
            Kind::Camera(data) => data,
            _ => panic!("node {camera:?} is not a camera"),
        }
    }

    fn layer_data(&self, layer: NodeId) -> &LayerData {
        match &self.node(layer).kind {
            Kind::Layer(data) => data,
            _ => panic!("node {layer:?} is not a layer"),
        }
    }

    fn layer_data_mut(&mut self, layer: NodeId) -> &mut LayerData {
        match &mut self.node_mut(layer).kind {
            Kind::Layer(data) => data,
            _ => panic!("node {layer:?} is not a layer"),
        }
    }

    // --- layer list ---

    /// View `layer` on top of the camera's other layers.
    ///
    /// A layer that is already viewed moves to the top.
    ///
    /// # Panics
    ///
    /// If `camera` is not a camera or `layer` is not a layer.
    pub fn add_layer(&mut self, camera: NodeId, layer: NodeId) {
        let len = self.camera_data(camera).layers.len();
        let index = if self.camera_data(camera).layers.contains(&layer) {
            len - 1
        } else {
            len
        };
        self.insert_layer(camera, index, layer);
    }

    /// View `layer` at `index` in the camera's layer list.
    ///
    /// A layer that is already viewed is moved, and `index` is interpreted
    /// after its removal.
    ///
    /// # Panics
    ///
    /// If `index` is greater than the layer count, or on the same misuse as
    /// [`add_layer`](Self::add_layer).
    pub fn insert_layer(&mut self, camera: NodeId, index: usize, layer: NodeId) {
        let _ = self.layer_data(layer);
        let layers = &mut self.camera_data_mut(camera).layers;
        layers.retain(|&l| l != layer);
        assert!(
            index <= layers.len(),
            "layer index {index} out of range for {} layers",
            layers.len()
        );
        layers.insert(index, layer);
        let cameras = &mut self.layer_data_mut(layer).cameras;
        if !cameras.contains(&camera) {
            cameras.push(camera);
        }
        self.invalidate_paint(camera);
    }

    /// Stop viewing `layer`. Returns false if the camera did not view it.
    pub fn remove_layer(&mut self, camera: NodeId, layer: NodeId) -> bool {
        match self.index_of_layer(camera, layer) {
            Some(index) => {
                self.remove_layer_at(camera, index);
                true
            }
            None => false,
        }
    }

    /// Stop viewing the layer at `index` and return it.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn remove_layer_at(&mut self, camera: NodeId, index: usize) -> NodeId {
        let layer = self.layer(camera, index);
        self.camera_data_mut(camera).layers.remove(index);
        self.layer_data_mut(layer).cameras.retain(|&c| c != camera);
        self.invalidate_paint(camera);
        layer
    }

    /// The layer at `index`, bottom first.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn layer(&self, camera: NodeId, index: usize) -> NodeId {
        let layers = &self.camera_data(camera).layers;
        match layers.get(index) {
            Some(&l) => l,
            None => panic!("layer index {index} out of range for {} layers", layers.len()),
        }
    }

    /// Number of layers the camera views.
    pub fn layer_count(&self, camera: NodeId) -> usize {
        self.camera_data(camera).layers.len()
    }

    /// Viewed layers in paint order.
    pub fn layers(&self, camera: NodeId) -> &[NodeId] {
        &self.camera_data(camera).layers
    }

    /// Position of `layer` in the camera's layer list.
    pub fn index_of_layer(&self, camera: NodeId, layer: NodeId) -> Option<usize> {
        self.camera_data(camera)
            .layers
            .iter()
            .position(|&l| l == layer)
    }

    /// Cameras currently viewing `layer`.
    pub fn cameras(&self, layer: NodeId) -> &[NodeId] {
        &self.layer_data(layer).cameras
    }

    /// Number of cameras viewing `layer`.
    pub fn camera_count(&self, layer: NodeId) -> usize {
        self.layer_data(layer).cameras.len()
    }

    /// The camera at `index` in `layer`'s observer list.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn camera(&self, layer: NodeId, index: usize) -> NodeId {
        let cameras = &self.layer_data(layer).cameras;
        match cameras.get(index) {
            Some(&c) => c,
            None => panic!("camera index {index} out of range for {} cameras", cameras.len()),
        }
    }

    /// Union of the viewed layers' full bounds, in view coordinates.
    ///
    /// The view transform is not applied.
    pub fn union_of_layer_full_bounds(&mut self, camera: NodeId) -> Bounds {
        let layers: SmallVec<[NodeId; 4]> = self.layers(camera).iter().copied().collect();
        let mut union = Bounds::EMPTY;
        for layer in layers {
            union.add_bounds(&self.full_bounds_in_parent(layer));
        }
        union
    }

    // --- view transform ---

    /// Transform from view (layer) coordinates into the camera's local frame.
    pub fn view_transform(&self, camera: NodeId) -> Transform {
        self.camera_data(camera).view_transform
    }

    /// Replace the view transform, then apply the camera's view constraint.
    pub fn set_view_transform(&mut self, camera: NodeId, transform: Transform) {
        self.camera_data_mut(camera).view_transform = transform;
        self.apply_view_constraint(camera);
        self.invalidate_paint(camera);
    }

    fn update_view(&mut self, camera: NodeId, f: impl FnOnce(&mut Transform)) {
        let mut view = self.view_transform(camera);
        f(&mut view);
        self.set_view_transform(camera, view);
    }

    /// Pan the view by `(dx, dy)` in view coordinates.
    pub fn translate_view(&mut self, camera: NodeId, dx: f64, dy: f64) {
        self.update_view(camera, |v| v.translate(dx, dy));
    }

    /// Replace the view's translation.
    pub fn set_view_offset(&mut self, camera: NodeId, x: f64, y: f64) {
        self.update_view(camera, |v| v.set_offset(x, y));
    }

    /// Zoom by a factor relative to the current zoom, about the view origin.
    pub fn scale_view(&mut self, camera: NodeId, scale: f64) {
        self.scale_view_about_point(camera, scale, Point::ORIGIN);
    }

    /// Zoom by a factor about a point in view coordinates, which stays put on screen.
    pub fn scale_view_about_point(&mut self, camera: NodeId, scale: f64, point: Point) {
        self.update_view(camera, |v| v.scale_about_point(scale, point.x, point.y));
    }

    /// Current zoom factor.
    pub fn view_scale(&self, camera: NodeId) -> f64 {
        self.view_transform(camera).scale_factor()
    }

    /// Set an absolute zoom factor about the view origin.
    ///
    /// Fails with [`TransformError::DegenerateScale`] for a zero target or a
    /// view that is currently collapsed to zero.
    pub fn set_view_scale(&mut self, camera: NodeId, scale: f64) -> Result<(), TransformError> {
        let current = self.view_scale(camera);
        if scale == 0.0 || current == 0.0 {
            return Err(TransformError::DegenerateScale);
        }
        self.scale_view(camera, scale / current);
        Ok(())
    }

    /// The camera bounds expressed in view coordinates.
    pub fn view_bounds(&self, camera: NodeId) -> Result<Bounds, TransformError> {
        self.view_transform(camera)
            .inverse_transform_bounds(&self.node(camera).bounds)
    }

    /// Frame `rect` (view coordinates) so it is centered and fills the camera.
    pub fn set_view_bounds(&mut self, camera: NodeId, rect: Rect) -> Result<(), TransformError> {
        self.animate_view_to_center_bounds(camera, rect, true, 0)
            .map(|_| ())
    }

    /// Map a point from the camera's local frame into view coordinates.
    pub fn local_to_view_point(&self, camera: NodeId, point: Point) -> Result<Point, TransformError> {
        self.view_transform(camera).inverse_transform_point(point)
    }

    /// Map a rectangle from the camera's local frame into view coordinates.
    pub fn local_to_view_rect(&self, camera: NodeId, rect: Rect) -> Result<Rect, TransformError> {
        self.view_transform(camera).inverse_transform_rect(rect)
    }

    /// Map a point from view coordinates into the camera's local frame.
    pub fn view_to_local_point(&self, camera: NodeId, point: Point) -> Point {
        self.view_transform(camera).transform_point(point)
    }

    /// Map a rectangle from view coordinates into the camera's local frame.
    pub fn view_to_local_rect(&self, camera: NodeId, rect: Rect) -> Rect {
        self.view_transform(camera).transform_rect(rect)
    }

    // --- framing ---

    /// Move the view so `rect` (view coordinates) is centered, optionally
    /// zooming so it just fits.
    ///
    /// A zero `duration` applies the result immediately and returns `None`;
    /// otherwise the change is animated.
    pub fn animate_view_to_center_bounds(
        &mut self,
        camera: NodeId,
        rect: Rect,
        scale_to_fit: bool,
        duration: u64,
    ) -> Result<Option<ActivityId>, TransformError> {
        let view_bounds = self.view_bounds(camera)?;
        let delta = view_bounds.delta_required_to_center(rect);
        let mut target = self.view_transform(camera);
        target.translate(delta.x, delta.y);
        if scale_to_fit {
            let s = (view_bounds.width() / rect.width()).min(view_bounds.height() / rect.height());
            if s.is_finite() && s != 0.0 {
                let center = rect.center();
                target.scale_about_point(s, center.x, center.y);
            }
        }
        Ok(self.animate_view_to_transform(camera, target, duration))
    }

    /// Pan the view by the smallest amount that brings `rect` (view
    /// coordinates) fully into view. The zoom is kept.
    ///
    /// Returns `Ok(None)` without moving if `rect` is already visible.
    pub fn animate_view_to_pan_to_bounds(
        &mut self,
        camera: NodeId,
        rect: Rect,
        duration: u64,
    ) -> Result<Option<ActivityId>, TransformError> {
        let view_bounds = self.view_bounds(camera)?;
        let delta = view_bounds.delta_required_to_contain(rect);
        if delta.x == 0.0 && delta.y == 0.0 {
            return Ok(None);
        }
        let mut target = self.view_transform(camera);
        target.translate(-delta.x, -delta.y);
        Ok(self.animate_view_to_transform(camera, target, duration))
    }

    /// Move the view transform to `target`, immediately for a zero `duration`.
    pub fn animate_view_to_transform(
        &mut self,
        camera: NodeId,
        target: Transform,
        duration: u64,
    ) -> Option<ActivityId> {
        let _ = self.camera_data(camera);
        if duration == 0 {
            self.set_view_transform(camera, target);
            return None;
        }
        let activity = Activity::new(duration, ViewTransformTarget::new(camera, target));
        Some(self.add_activity(activity))
    }

    // --- constraint ---

    /// The camera's view constraint.
    pub fn view_constraint(&self, camera: NodeId) -> ViewConstraint {
        self.camera_data(camera).view_constraint
    }

    /// Replace the view constraint and apply it right away.
    pub fn set_view_constraint(&mut self, camera: NodeId, constraint: ViewConstraint) {
        self.camera_data_mut(camera).view_constraint = constraint;
        self.apply_view_constraint(camera);
        self.invalidate_paint(camera);
    }

    fn apply_view_constraint(&mut self, camera: NodeId) {
        let constraint = self.view_constraint(camera);
        if constraint == ViewConstraint::None {
            return;
        }
        let view_bounds = match self.view_bounds(camera) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => return,
            Err(err) => {
                log::debug!("view constraint skipped for {camera:?}: {err}");
                return;
            }
        };
        let Some(layers) = self.union_of_layer_full_bounds(camera).rect() else {
            return;
        };
        let target = match constraint {
            ViewConstraint::Center => {
                let c = layers.center();
                Rect::from_points(c, c)
            }
            ViewConstraint::All | ViewConstraint::None => layers,
        };
        let delta = view_bounds.delta_required_to_contain(target);
        self.camera_data_mut(camera)
            .view_transform
            .translate(-delta.x, -delta.y);
    }

    // --- component ---

    /// Attach (or with `None`, detach) the surface that receives this camera's damage.
    pub fn set_component(&mut self, camera: NodeId, component: Option<Box<dyn Component>>) {
        self.camera_data_mut(camera).component = component;
        self.invalidate_paint(camera);
    }

    /// The camera's component, if any.
    pub fn component(&self, camera: NodeId) -> Option<&dyn Component> {
        self.camera_data(camera).component.as_deref()
    }

    /// Mutable access to a component of a concrete type.
    pub fn component_mut<T: Component>(&mut self, camera: NodeId) -> Option<&mut T> {
        let component: &mut dyn Component = self.camera_data_mut(camera).component.as_deref_mut()?;
        let any: &mut dyn Any = component;
        any.downcast_mut::<T>()
    }
}
