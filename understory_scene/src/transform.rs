// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2D affine transforms with replace-style setters and fallible inverses.

use core::f64::consts::TAU;

use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::bounds::Bounds;
use crate::util::transform_rect_bbox;

/// Errors reported by transform operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The determinant is zero (or not finite), so no inverse exists.
    #[error("transform is not invertible")]
    NonInvertible,
    /// A scale could not be replaced because the target or the current scale is zero.
    #[error("cannot replace a scale of zero or set the scale to zero")]
    DegenerateScale,
}

/// Shape of a transform, used to pick a rectangle mapping strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// Maps every point to itself.
    Identity,
    /// Pure offset.
    Translation,
    /// Equal positive scale on both axes plus an optional offset.
    UniformScale,
    /// Anything else: non-uniform scale, flips, rotation or shear.
    General,
}

/// A 2D affine transform.
///
/// The six coefficients follow the usual column layout: a point `(x, y)` maps
/// to `(m00 * x + m01 * y + m02, m10 * x + m11 * y + m12)`. They are stored as
/// a [`kurbo::Affine`] in `[m00, m10, m01, m11, m02, m12]` order.
///
/// [`translate`](Self::translate), [`scale`](Self::scale) and
/// [`rotate`](Self::rotate) compose onto the current transform in its local
/// frame. [`set_offset`](Self::set_offset), [`set_scale`](Self::set_scale) and
/// [`set_rotation`](Self::set_rotation) replace the current value of that
/// component instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(Affine);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for Transform {
    fn from(affine: Affine) -> Self {
        Self(affine)
    }
}

impl From<Transform> for Affine {
    fn from(transform: Transform) -> Self {
        transform.0
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self(Affine::IDENTITY);

    /// Build from coefficients in `[m00, m10, m01, m11, m02, m12]` order.
    pub const fn from_coeffs(coeffs: [f64; 6]) -> Self {
        Self(Affine::new(coeffs))
    }

    /// A pure translation.
    pub fn from_translation(dx: f64, dy: f64) -> Self {
        Self(Affine::translate(Vec2::new(dx, dy)))
    }

    /// A uniform scale about the origin.
    pub fn from_scale(scale: f64) -> Self {
        Self(Affine::scale(scale))
    }

    /// The underlying [`Affine`].
    pub const fn affine(&self) -> Affine {
        self.0
    }

    /// Coefficients in `[m00, m10, m01, m11, m02, m12]` order.
    pub fn coeffs(&self) -> [f64; 6] {
        self.0.as_coeffs()
    }

    /// Classify the transform.
    pub fn kind(&self) -> TransformKind {
        let [a, b, c, d, e, f] = self.0.as_coeffs();
        if b != 0.0 || c != 0.0 {
            return TransformKind::General;
        }
        if a == 1.0 && d == 1.0 {
            if e == 0.0 && f == 0.0 {
                TransformKind::Identity
            } else {
                TransformKind::Translation
            }
        } else if a == d && a > 0.0 {
            TransformKind::UniformScale
        } else {
            TransformKind::General
        }
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Whether an inverse exists.
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det.abs() >= f64::MIN_POSITIVE
    }

    /// The inverse transform.
    pub fn create_inverse(&self) -> Result<Self, TransformError> {
        if self.is_invertible() {
            Ok(Self(self.0.inverse()))
        } else {
            Err(TransformError::NonInvertible)
        }
    }

    /// Apply `other` first, then this transform.
    pub fn concatenate(&mut self, other: &Self) {
        self.0 = self.0 * other.0;
    }

    /// Apply this transform first, then `other`.
    pub fn pre_concatenate(&mut self, other: &Self) {
        self.0 = other.0 * self.0;
    }

    /// Compose a translation in the local frame.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.0 = self.0 * Affine::translate(Vec2::new(dx, dy));
    }

    /// Compose a uniform scale about the local origin.
    pub fn scale(&mut self, scale: f64) {
        self.0 = self.0 * Affine::scale(scale);
    }

    /// Compose a uniform scale about a local point.
    pub fn scale_about_point(&mut self, scale: f64, x: f64, y: f64) {
        self.translate(x, y);
        self.scale(scale);
        self.translate(-x, -y);
    }

    /// Compose a rotation (radians) about the local origin.
    pub fn rotate(&mut self, theta: f64) {
        self.0 = self.0 * Affine::rotate(theta);
    }

    /// Compose a rotation (radians) about a local point.
    pub fn rotate_about_point(&mut self, theta: f64, x: f64, y: f64) {
        self.translate(x, y);
        self.rotate(theta);
        self.translate(-x, -y);
    }

    /// The translation component.
    pub fn offset(&self) -> Vec2 {
        self.0.translation()
    }

    /// Replace the translation component.
    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.0 = self.0.with_translation(Vec2::new(x, y));
    }

    /// Length of the transformed unit segment along x.
    pub fn scale_factor(&self) -> f64 {
        self.unit_vector().length()
    }

    /// Replace the scale, keeping rotation and offset.
    ///
    /// Fails with [`TransformError::DegenerateScale`] when `scale` is zero or
    /// the current scale is zero, since neither can be divided out.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), TransformError> {
        let current = self.scale_factor();
        if scale == 0.0 || current == 0.0 {
            return Err(TransformError::DegenerateScale);
        }
        self.scale_about_point(scale / current, 0.0, 0.0);
        Ok(())
    }

    /// Angle of the transformed unit segment along x, in `[0, 2π)`.
    pub fn rotation(&self) -> f64 {
        let angle = self.unit_vector().atan2();
        if angle < 0.0 { angle + TAU } else { angle }
    }

    /// Replace the rotation, keeping scale and offset.
    pub fn set_rotation(&mut self, theta: f64) {
        let current = self.rotation();
        self.rotate(theta - current);
    }

    fn unit_vector(&self) -> Vec2 {
        (self.0 * Point::new(1.0, 0.0)) - (self.0 * Point::ORIGIN)
    }

    /// Map a point.
    pub fn transform_point(&self, point: Point) -> Point {
        self.0 * point
    }

    /// Map a size through the linear part; translation is ignored.
    pub fn transform_size(&self, size: Size) -> Size {
        let [a, b, c, d, _, _] = self.0.as_coeffs();
        Size::new(
            a * size.width + c * size.height,
            b * size.width + d * size.height,
        )
    }

    /// Map a rectangle to the axis-aligned box of its transformed corners.
    pub fn transform_rect(&self, rect: Rect) -> Rect {
        match self.kind() {
            TransformKind::Identity => rect,
            TransformKind::Translation => rect + self.offset(),
            TransformKind::UniformScale => {
                let [s, _, _, _, e, f] = self.0.as_coeffs();
                Rect::new(
                    rect.x0 * s + e,
                    rect.y0 * s + f,
                    rect.x1 * s + e,
                    rect.y1 * s + f,
                )
            }
            TransformKind::General => transform_rect_bbox(self.0, rect),
        }
    }

    /// Map bounds, preserving emptiness.
    pub fn transform_bounds(&self, bounds: &Bounds) -> Bounds {
        match bounds.rect() {
            Some(rect) => Bounds::from_rect(self.transform_rect(rect)),
            None => Bounds::EMPTY,
        }
    }

    /// Map a point through the inverse.
    pub fn inverse_transform_point(&self, point: Point) -> Result<Point, TransformError> {
        Ok(self.create_inverse()?.transform_point(point))
    }

    /// Map a size through the inverse linear part.
    pub fn inverse_transform_size(&self, size: Size) -> Result<Size, TransformError> {
        Ok(self.create_inverse()?.transform_size(size))
    }

    /// Map a rectangle through the inverse.
    pub fn inverse_transform_rect(&self, rect: Rect) -> Result<Rect, TransformError> {
        Ok(self.create_inverse()?.transform_rect(rect))
    }

    /// Map bounds through the inverse, preserving emptiness.
    pub fn inverse_transform_bounds(&self, bounds: &Bounds) -> Result<Bounds, TransformError> {
        Ok(self.create_inverse()?.transform_bounds(bounds))
    }

    /// Coefficient-wise linear interpolation towards `other`.
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        let from = self.0.as_coeffs();
        let to = other.0.as_coeffs();
        let mut out = [0.0; 6];
        for (i, v) in out.iter_mut().enumerate() {
            *v = from[i] + t * (to[i] - from[i]);
        }
        Self::from_coeffs(out)
    }
}
