// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Affine, Rect};

/// Transform an axis-aligned `Rect` by an `Affine` and return the axis-aligned
/// bounding box of the four transformed corners.
pub(crate) fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    let min_x = (a * rect.x0).min(a * rect.x1) + (c * rect.y0).min(c * rect.y1);
    let max_x = (a * rect.x0).max(a * rect.x1) + (c * rect.y0).max(c * rect.y1);
    let min_y = (b * rect.x0).min(b * rect.x1) + (d * rect.y0).min(d * rect.y1);
    let max_y = (b * rect.x0).max(b * rect.x1) + (d * rect.y0).max(d * rect.y1);
    Rect::new(min_x + e, min_y + f, max_x + e, max_y + f)
}

/// Inclusive overlap test between two rectangles.
pub(crate) fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Intersection of two rectangles, `None` when they do not overlap.
pub(crate) fn intersect_rects(a: Rect, b: Rect) -> Option<Rect> {
    rects_overlap(a, b).then(|| a.intersect(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn bbox_of_rotated_square_grows() {
        let r = Rect::new(-1.0, -1.0, 1.0, 1.0);
        let bb = transform_rect_bbox(Affine::rotate(core::f64::consts::FRAC_PI_4), r);
        let s = 2.0_f64.sqrt();
        assert!((bb.x0 + s).abs() < 1e-9, "x0 = {}", bb.x0);
        assert!((bb.x1 - s).abs() < 1e-9, "x1 = {}", bb.x1);
    }

    #[test]
    fn bbox_of_translation_is_exact() {
        let r = Rect::new(0.0, 0.0, 2.0, 3.0);
        let bb = transform_rect_bbox(Affine::translate(Vec2::new(5.0, -1.0)), r);
        assert_eq!(bb, Rect::new(5.0, -1.0, 7.0, 2.0));
    }

    #[test]
    fn disjoint_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(2.0, 2.0, 3.0, 3.0);
        assert_eq!(intersect_rects(a, b), None);
        assert_eq!(
            intersect_rects(a, Rect::new(0.5, 0.5, 4.0, 4.0)),
            Some(Rect::new(0.5, 0.5, 1.0, 1.0))
        );
    }
}
