// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangles with a distinguished empty state.

use kurbo::{Point, Rect, Vec2};

use crate::util::rects_overlap;

/// An axis-aligned rectangle that remembers whether any geometry was ever added to it.
///
/// Emptiness is a separate bit, not a property of the width or height: a
/// zero-size bounds at a real point is *not* empty. An empty bounds is the
/// identity for [`Bounds::add_bounds`], which lets cached bounds distinguish
/// "nothing to report" from "a genuine zero extent".
///
/// [`Bounds::reset`] only flips the empty bit and leaves the coordinates in
/// place, so callers can compare old coordinates against a recomputed result
/// without keeping a copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    rect: Rect,
    empty: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl Bounds {
    /// Empty bounds at the origin.
    pub const EMPTY: Self = Self {
        rect: Rect::ZERO,
        empty: true,
    };

    /// Non-empty bounds covering `rect`.
    pub const fn from_rect(rect: Rect) -> Self {
        Self { rect, empty: false }
    }

    /// Non-empty bounds from an origin and a size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_rect(Rect::new(x, y, x + width, y + height))
    }

    /// Non-empty, zero-size bounds at `point`.
    pub fn from_point(point: Point) -> Self {
        Self::from_rect(Rect::from_points(point, point))
    }

    /// Whether no geometry has been added since creation or the last reset.
    pub const fn is_empty(&self) -> bool {
        self.empty
    }

    /// The covered rectangle, or `None` when empty.
    pub fn rect(&self) -> Option<Rect> {
        (!self.empty).then_some(self.rect)
    }

    /// The stored rectangle regardless of the empty bit.
    ///
    /// After [`Bounds::reset`] this still reports the previous coordinates.
    pub const fn raw_rect(&self) -> Rect {
        self.rect
    }

    /// Left edge.
    pub const fn x(&self) -> f64 {
        self.rect.x0
    }

    /// Top edge.
    pub const fn y(&self) -> f64 {
        self.rect.y0
    }

    /// Horizontal extent.
    pub fn width(&self) -> f64 {
        self.rect.width()
    }

    /// Vertical extent.
    pub fn height(&self) -> f64 {
        self.rect.height()
    }

    /// Center of the stored rectangle.
    pub fn center(&self) -> Point {
        self.rect.center()
    }

    /// Mark as empty, keeping the stored coordinates.
    pub fn reset(&mut self) {
        self.empty = true;
    }

    /// Mark as empty and move the stored rectangle to the origin.
    pub fn reset_to_zero(&mut self) {
        self.empty = true;
        self.rect = Rect::ZERO;
    }

    /// Replace the covered rectangle and clear the empty bit.
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
        self.empty = false;
    }

    /// Grow to include `point`.
    pub fn add_point(&mut self, point: Point) {
        if self.empty {
            self.set_rect(Rect::from_points(point, point));
        } else {
            self.rect = self.rect.union_pt(point);
        }
    }

    /// Grow to include `rect`.
    pub fn add_rect(&mut self, rect: Rect) {
        if self.empty {
            self.set_rect(rect);
        } else {
            self.rect = self.rect.union(rect);
        }
    }

    /// Grow to include `other`; adding an empty bounds changes nothing.
    pub fn add_bounds(&mut self, other: &Self) {
        if other.empty {
            return;
        }
        self.add_rect(other.rect);
    }

    /// Union of two bounds.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.add_bounds(other);
        self
    }

    /// Shrink each edge inward by `dx` and `dy` (negative values grow).
    pub fn inset(&mut self, dx: f64, dy: f64) {
        self.rect = Rect::new(
            self.rect.x0 + dx,
            self.rect.y0 + dy,
            self.rect.x1 - dx,
            self.rect.y1 - dy,
        );
    }

    /// Translate by `(dx, dy)`.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.rect = self.rect + Vec2::new(dx, dy);
    }

    /// Whether this bounds overlaps `rect`, edges included. Empty bounds overlap nothing.
    pub fn intersects(&self, rect: Rect) -> bool {
        !self.empty && rects_overlap(self.rect, rect)
    }

    /// Whether `point` lies inside, edges included.
    pub fn contains_point(&self, point: Point) -> bool {
        !self.empty
            && point.x >= self.rect.x0
            && point.x <= self.rect.x1
            && point.y >= self.rect.y0
            && point.y <= self.rect.y1
    }

    /// Whether `rect` lies entirely inside, edges included.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        !self.empty
            && rect.x0 >= self.rect.x0
            && rect.y0 >= self.rect.y0
            && rect.x1 <= self.rect.x1
            && rect.y1 <= self.rect.y1
    }

    /// Translation that moves the center of `rect` onto this center.
    pub fn delta_required_to_center(&self, rect: Rect) -> Vec2 {
        self.center() - rect.center()
    }

    /// Smallest translation of this bounds that makes it contain `rect`.
    ///
    /// Zero when `rect` is already contained. On an axis where `rect` is
    /// larger than this bounds on both sides, that axis is left alone.
    pub fn delta_required_to_contain(&self, rect: Rect) -> Vec2 {
        if self.contains_rect(rect) {
            return Vec2::ZERO;
        }
        Vec2::new(
            axis_delta(self.rect.x0, self.rect.x1, rect.x0, rect.x1),
            axis_delta(self.rect.y0, self.rect.y1, rect.y0, rect.y1),
        )
    }
}

fn axis_delta(min: f64, max: f64, other_min: f64, other_max: f64) -> f64 {
    if other_max > max && other_min < min {
        return 0.0;
    }
    if other_max > max || other_min < min {
        let to_max = other_max - max;
        let to_min = other_min - min;
        if to_max.abs() < to_min.abs() {
            to_max
        } else {
            to_min
        }
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_union_identity() {
        let mut b = Bounds::EMPTY;
        let r = Rect::new(1.0, 2.0, 4.0, 8.0);
        b.add_rect(r);
        assert!(!b.is_empty());
        assert_eq!(b.rect(), Some(r));

        let mut c = Bounds::from_rect(r);
        c.add_bounds(&Bounds::EMPTY);
        assert_eq!(c, Bounds::from_rect(r), "adding empty must be a no-op");
    }

    #[test]
    fn zero_size_is_not_empty() {
        let b = Bounds::from_point(Point::new(3.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.width(), 0.0);
        assert!(b.contains_point(Point::new(3.0, 3.0)));
    }

    #[test]
    fn add_self_is_idempotent() {
        let mut b = Bounds::new(0.0, 0.0, 10.0, 5.0);
        let copy = b;
        b.add_bounds(&copy);
        assert_eq!(b, copy);
    }

    #[test]
    fn add_is_order_independent() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let b = Bounds::new(5.0, -2.0, 1.0, 1.0);
        let c = Bounds::new(-3.0, 4.0, 2.0, 2.0);
        let left = a.union(&b).union(&c);
        let right = c.union(&a.union(&b));
        assert_eq!(left, right);
        assert_eq!(left.rect(), Some(Rect::new(-3.0, -2.0, 6.0, 6.0)));
    }

    #[test]
    fn reset_keeps_coordinates() {
        let mut b = Bounds::new(2.0, 3.0, 4.0, 5.0);
        b.reset();
        assert!(b.is_empty());
        assert_eq!(b.rect(), None);
        assert_eq!(b.raw_rect(), Rect::new(2.0, 3.0, 6.0, 8.0));

        b.reset_to_zero();
        assert_eq!(b.raw_rect(), Rect::ZERO);
    }

    #[test]
    fn add_point_grows() {
        let mut b = Bounds::EMPTY;
        b.add_point(Point::new(1.0, 1.0));
        b.add_point(Point::new(-1.0, 4.0));
        assert_eq!(b.rect(), Some(Rect::new(-1.0, 1.0, 1.0, 4.0)));
    }

    #[test]
    fn inset_and_move() {
        let mut b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        b.inset(2.0, 1.0);
        assert_eq!(b.rect(), Some(Rect::new(2.0, 1.0, 8.0, 9.0)));
        b.move_by(-2.0, 3.0);
        assert_eq!(b.rect(), Some(Rect::new(0.0, 4.0, 6.0, 12.0)));

        // Negative inset grows, which is how pick halos are built.
        let mut p = Bounds::from_point(Point::new(5.0, 5.0));
        p.inset(-2.0, -2.0);
        assert_eq!(p.rect(), Some(Rect::new(3.0, 3.0, 7.0, 7.0)));
    }

    #[test]
    fn empty_never_intersects() {
        let b = Bounds::EMPTY;
        assert!(!b.intersects(Rect::new(-1.0, -1.0, 1.0, 1.0)));
        assert!(!b.contains_point(Point::ZERO));
    }

    #[test]
    fn touching_edges_intersect() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.intersects(Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!b.intersects(Rect::new(10.5, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn delta_to_contain_is_minimal() {
        let view = Bounds::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            view.delta_required_to_contain(Rect::new(10.0, 10.0, 20.0, 20.0)),
            Vec2::ZERO
        );
        assert_eq!(
            view.delta_required_to_contain(Rect::new(120.0, 10.0, 150.0, 20.0)),
            Vec2::new(50.0, 0.0)
        );
        assert_eq!(
            view.delta_required_to_contain(Rect::new(-30.0, -5.0, -10.0, 10.0)),
            Vec2::new(-30.0, -5.0)
        );
        // Wider than the view on both sides: leave that axis alone.
        assert_eq!(
            view.delta_required_to_contain(Rect::new(-10.0, 200.0, 110.0, 210.0)),
            Vec2::new(0.0, 110.0)
        );
    }

    #[test]
    fn delta_to_center() {
        let view = Bounds::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            view.delta_required_to_center(Rect::new(60.0, 60.0, 80.0, 80.0)),
            Vec2::new(-20.0, -20.0)
        );
    }
}
