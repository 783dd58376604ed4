// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting: the caller's drawing [`Surface`], the [`PaintContext`] stack
//! discipline, and the recursive paint traversal.
//!
//! Every `push_*` on a [`PaintContext`] must be matched by the corresponding
//! `pop_*` in strict nesting order. Transparency pushes of `1.0` are skipped
//! on both ends, so the composite stack is paired by value rather than by
//! call count.

use core::fmt;

use kurbo::{Affine, Rect};
use smallvec::SmallVec;

use crate::bounds::Bounds;
use crate::config::ConfigError;
use crate::scene::{Kind, Scene};
use crate::transform::Transform;
use crate::types::{Color, NodeFlags, NodeId};
use crate::util::intersect_rects;

/// Rendering quality hint passed to the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderQuality {
    /// Favor speed, used while animating by default.
    Low,
    /// Favor fidelity.
    #[default]
    High,
}

impl TryFrom<u8> for RenderQuality {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Low),
            1 => Ok(Self::High),
            other => Err(ConfigError::InvalidRenderQuality(other)),
        }
    }
}

/// The caller-supplied drawing target.
///
/// The surface keeps the current device transform, device clip and alpha;
/// [`PaintContext`] saves and restores them around each nesting level.
pub trait Surface {
    /// Current transform from local to device coordinates.
    fn transform(&self) -> Affine;
    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine);
    /// Current clip in device coordinates, `None` when unclipped.
    fn clip(&self) -> Option<Rect>;
    /// Replace the current clip.
    fn set_clip(&mut self, clip: Option<Rect>);
    /// Current group alpha.
    fn alpha(&self) -> f32;
    /// Replace the current group alpha.
    fn set_alpha(&mut self, alpha: f32);
    /// Quality hint for subsequent drawing.
    fn set_render_quality(&mut self, quality: RenderQuality) {
        let _ = quality;
    }
    /// Fill `rect`, given in local coordinates, with the current transform, clip and alpha.
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

impl fmt::Debug for dyn Surface + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("transform", &self.transform())
            .field("clip", &self.clip())
            .field("alpha", &self.alpha())
            .finish()
    }
}

/// The visible area in the current local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalClip {
    /// Nothing clips.
    Unbounded,
    /// Only this rectangle is visible.
    Rect(Rect),
    /// Nothing is visible.
    Empty,
}

impl LocalClip {
    /// Whether any of `bounds` may be visible.
    pub fn intersects(&self, bounds: &Bounds) -> bool {
        match self {
            Self::Unbounded => !bounds.is_empty(),
            Self::Rect(r) => bounds.intersects(*r),
            Self::Empty => false,
        }
    }
}

/// Stack depths of a [`PaintContext`], for balance checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StackDepths {
    /// Non-opaque transparency pushes.
    pub composite: usize,
    /// Clip pushes.
    pub clip: usize,
    /// Local clip levels, one per clip or transform push.
    pub local_clip: usize,
    /// Camera pushes.
    pub camera: usize,
    /// Transform pushes.
    pub transform: usize,
}

/// Per-traversal paint state layered over a [`Surface`].
#[derive(Debug)]
pub struct PaintContext<'a> {
    surface: &'a mut dyn Surface,
    composite_stack: SmallVec<[f32; 8]>,
    clip_stack: SmallVec<[Option<Rect>; 8]>,
    local_clip_stack: SmallVec<[LocalClip; 16]>,
    camera_stack: SmallVec<[NodeId; 4]>,
    transform_stack: SmallVec<[Affine; 16]>,
    render_quality: RenderQuality,
}

impl<'a> PaintContext<'a> {
    /// Start painting onto `surface`, in its current frame.
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        let base = match surface.clip() {
            None => LocalClip::Unbounded,
            Some(clip) => match Transform::from(surface.transform()).inverse_transform_rect(clip) {
                Ok(local) => LocalClip::Rect(local),
                Err(err) => {
                    log::debug!("surface transform is singular, nothing is visible: {err}");
                    LocalClip::Empty
                }
            },
        };
        let mut local_clip_stack = SmallVec::new();
        local_clip_stack.push(base);
        Self {
            surface,
            composite_stack: SmallVec::new(),
            clip_stack: SmallVec::new(),
            local_clip_stack,
            camera_stack: SmallVec::new(),
            transform_stack: SmallVec::new(),
            render_quality: RenderQuality::default(),
        }
    }

    /// The surface being painted.
    pub fn surface(&self) -> &dyn Surface {
        &*self.surface
    }

    /// Mutable access to the surface, for drawing beyond [`fill_rect`](Self::fill_rect).
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    /// Fill `rect` in local coordinates.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.surface.fill_rect(rect, color);
    }

    /// The visible area in the current local frame.
    pub fn local_clip(&self) -> LocalClip {
        self.local_clip_stack
            .last()
            .copied()
            .unwrap_or(LocalClip::Unbounded)
    }

    /// Current local-to-device scale factor.
    pub fn scale(&self) -> f64 {
        Transform::from(self.surface.transform()).scale_factor()
    }

    /// Intersect the clip with `rect` in local coordinates.
    pub fn push_clip(&mut self, rect: Rect) {
        let device = Transform::from(self.surface.transform()).transform_rect(rect);
        let current = self.surface.clip();
        self.clip_stack.push(current);
        self.surface
            .set_clip(Some(current.map_or(device, |c| c.intersect(device))));
        let local = match self.local_clip() {
            LocalClip::Unbounded => LocalClip::Rect(rect),
            LocalClip::Rect(r) => intersect_rects(r, rect).map_or(LocalClip::Empty, LocalClip::Rect),
            LocalClip::Empty => LocalClip::Empty,
        };
        self.local_clip_stack.push(local);
    }

    /// Restore the clip saved by the matching [`push_clip`](Self::push_clip).
    ///
    /// # Panics
    ///
    /// If there is no clip to pop.
    pub fn pop_clip(&mut self) {
        let Some(previous) = self.clip_stack.pop() else {
            panic!("pop_clip without a matching push_clip");
        };
        self.local_clip_stack.pop();
        self.surface.set_clip(previous);
    }

    /// Enter the frame of `transform` (local to current).
    ///
    /// The local clip is carried into the new frame through the inverse; a
    /// singular transform leaves nothing visible until the matching pop.
    pub fn push_transform(&mut self, transform: Transform) {
        let current = self.surface.transform();
        self.transform_stack.push(current);
        self.surface.set_transform(current * transform.affine());
        let local = match self.local_clip() {
            LocalClip::Empty => LocalClip::Empty,
            LocalClip::Unbounded if transform.is_invertible() => LocalClip::Unbounded,
            LocalClip::Unbounded => {
                log::debug!("singular transform while painting, subtree clipped");
                LocalClip::Empty
            }
            LocalClip::Rect(r) => match transform.inverse_transform_rect(r) {
                Ok(local) => LocalClip::Rect(local),
                Err(err) => {
                    log::debug!("singular transform while painting, subtree clipped: {err}");
                    LocalClip::Empty
                }
            },
        };
        self.local_clip_stack.push(local);
    }

    /// Restore the transform saved by the matching [`push_transform`](Self::push_transform).
    ///
    /// # Panics
    ///
    /// If there is no transform to pop.
    pub fn pop_transform(&mut self) {
        let Some(previous) = self.transform_stack.pop() else {
            panic!("pop_transform without a matching push_transform");
        };
        self.local_clip_stack.pop();
        self.surface.set_transform(previous);
    }

    /// Multiply the group alpha by `transparency`. Does nothing for `1.0`.
    pub fn push_transparency(&mut self, transparency: f32) {
        if transparency == 1.0 {
            return;
        }
        let alpha = self.surface.alpha();
        self.composite_stack.push(alpha);
        self.surface.set_alpha(alpha * transparency);
    }

    /// Undo the matching [`push_transparency`](Self::push_transparency), which
    /// must have been given the same value.
    ///
    /// # Panics
    ///
    /// If `transparency` is not `1.0` and there is nothing to pop.
    pub fn pop_transparency(&mut self, transparency: f32) {
        if transparency == 1.0 {
            return;
        }
        let Some(previous) = self.composite_stack.pop() else {
            panic!("pop_transparency without a matching push_transparency");
        };
        self.surface.set_alpha(previous);
    }

    /// Enter a camera.
    pub fn push_camera(&mut self, camera: NodeId) {
        self.camera_stack.push(camera);
    }

    /// Leave the innermost camera.
    ///
    /// # Panics
    ///
    /// If no camera was pushed.
    pub fn pop_camera(&mut self) {
        assert!(
            self.camera_stack.pop().is_some(),
            "pop_camera without a matching push_camera"
        );
    }

    /// The innermost camera being painted.
    pub fn camera(&self) -> Option<NodeId> {
        self.camera_stack.last().copied()
    }

    /// The current quality hint.
    pub fn render_quality(&self) -> RenderQuality {
        self.render_quality
    }

    /// Replace the quality hint and forward it to the surface.
    pub fn set_render_quality(&mut self, quality: RenderQuality) {
        self.render_quality = quality;
        self.surface.set_render_quality(quality);
    }

    /// Replace the quality hint from its numeric code.
    ///
    /// Unknown codes are rejected and the current hint is kept.
    pub fn try_set_render_quality(&mut self, code: u8) -> Result<(), ConfigError> {
        let quality = RenderQuality::try_from(code)?;
        self.set_render_quality(quality);
        Ok(())
    }

    /// Current stack depths.
    pub fn depths(&self) -> StackDepths {
        StackDepths {
            composite: self.composite_stack.len(),
            clip: self.clip_stack.len(),
            local_clip: self.local_clip_stack.len(),
            camera: self.camera_stack.len(),
            transform: self.transform_stack.len(),
        }
    }
}

impl Scene {
    /// Paint `camera` and everything it views onto `surface`.
    ///
    /// The surface's current frame is taken as the camera's parent frame.
    /// Caches are validated first, and the quality hint follows
    /// [`SceneConfig`](crate::SceneConfig) depending on whether an activity is
    /// stepping.
    pub fn render(&mut self, camera: NodeId, surface: &mut dyn Surface) {
        self.check_thread("render");
        self.validate();
        let quality = if self.is_animating() {
            self.config.animating_render_quality
        } else {
            self.config.default_render_quality
        };
        let mut ctx = PaintContext::new(surface);
        ctx.set_render_quality(quality);
        let before = ctx.depths();
        self.full_paint(camera, &mut ctx);
        debug_assert_eq!(ctx.depths(), before, "paint stacks must be balanced");
    }

    /// Paint a node and its subtree.
    ///
    /// Hidden nodes and nodes whose full bounds miss the local clip are
    /// skipped. Full bounds must be up to date; [`render`](Self::render) takes
    /// care of it.
    pub fn full_paint(&self, id: NodeId, ctx: &mut PaintContext<'_>) {
        let node = self.node(id);
        if !node.flags.contains(NodeFlags::VISIBLE)
            || !ctx.local_clip().intersects(&node.full_bounds_in_parent)
        {
            return;
        }
        let is_camera = matches!(node.kind, Kind::Camera(_));
        if is_camera {
            ctx.push_camera(id);
        }
        ctx.push_transform(node.transform);
        ctx.push_transparency(node.transparency);

        self.paint_node(id, ctx);
        for &child in &node.children {
            self.full_paint(child, ctx);
        }

        ctx.pop_transparency(node.transparency);
        ctx.pop_transform();
        if is_camera {
            ctx.pop_camera();
        }
    }

    fn paint_node(&self, id: NodeId, ctx: &mut PaintContext<'_>) {
        let node = self.node(id);
        match &node.content {
            Some(content) => content.paint(ctx, node.paint),
            None => {
                if let (Some(color), Some(rect)) = (node.paint, node.bounds.rect()) {
                    ctx.fill_rect(rect, color);
                }
            }
        }
        if matches!(node.kind, Kind::Camera(_)) {
            self.paint_camera_view(id, ctx);
        }
    }

    /// Paint the camera's layers, bottom to top, clipped to the camera bounds
    /// and seen through the view transform. `ctx` must be in the camera's frame.
    pub fn paint_camera_view(&self, camera: NodeId, ctx: &mut PaintContext<'_>) {
        let node = self.node(camera);
        let Kind::Camera(data) = &node.kind else {
            return;
        };
        let Some(bounds) = node.bounds.rect() else {
            return;
        };
        ctx.push_clip(bounds);
        ctx.push_transform(data.view_transform);
        for &layer in &data.layers {
            self.full_paint(layer, ctx);
        }
        ctx.pop_transform();
        ctx.pop_clip();
    }
}
