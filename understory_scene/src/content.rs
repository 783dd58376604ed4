// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape hooks a node can delegate to.

use core::any::Any;
use core::fmt;

use alloc::boxed::Box;
use kurbo::Rect;

use crate::bounds::Bounds;
use crate::paint::PaintContext;
use crate::types::Color;

/// Shape-specific behavior attached to a node.
///
/// The scene never inspects shape geometry beyond this contract: it reads
/// [`bounds`](Content::bounds) to size the node, calls [`paint`](Content::paint)
/// instead of its default fill, and asks [`pick`](Content::pick) and
/// [`intersects`](Content::intersects) during hit testing. All rectangles are in
/// the node's local frame.
pub trait Content: Any {
    /// Local bounds of the shape.
    fn bounds(&self) -> Bounds;

    /// Draw the shape. `paint` is the owning node's fill.
    ///
    /// The default fills [`bounds`](Content::bounds) with `paint`.
    fn paint(&self, ctx: &mut PaintContext<'_>, paint: Option<Color>) {
        if let (Some(color), Some(rect)) = (paint, self.bounds().rect()) {
            ctx.fill_rect(rect, color);
        }
    }

    /// Accept a pick before the node's children are tested.
    fn pick(&self, pick_bounds: Rect) -> bool {
        let _ = pick_bounds;
        false
    }

    /// Accept a pick after none of the node's children did.
    ///
    /// The default accepts anything overlapping [`bounds`](Content::bounds).
    fn intersects(&self, pick_bounds: Rect) -> bool {
        self.bounds().intersects(pick_bounds)
    }

    /// Clone into a new box, used when a subtree is cloned.
    fn box_clone(&self) -> Box<dyn Content>;
}

impl fmt::Debug for dyn Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Content")
            .field("bounds", &self.bounds())
            .finish_non_exhaustive()
    }
}
