// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: node identifiers, flags, kinds, colors and node descriptors.

use crate::bounds::Bounds;
use crate::transform::Transform;

/// Identifier for a node in the scene (generational).
///
/// Ids are plain handles: holding one never keeps a node alive, and an id
/// whose node was destroyed is simply no longer [live](crate::Scene::is_alive).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "NodeId uses 32-bit indices by design."
    )]
    pub(crate) const fn from_slot(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (painted, and counted in its parent's full bounds).
        const VISIBLE           = 0b0000_0001;
        /// Node itself can be the result of a pick.
        const PICKABLE          = 0b0000_0010;
        /// Picks descend into the node's children.
        const CHILDREN_PICKABLE = 0b0000_0100;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE | Self::CHILDREN_PICKABLE
    }
}

bitflags::bitflags! {
    /// Stale cached state on a node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Dirty: u8 {
        /// The node's own full-bounds cache must be recomputed.
        const FULL_BOUNDS = 0b0000_0001;
        /// Some descendant has a stale full-bounds cache.
        const CHILD_BOUNDS = 0b0000_0010;
        /// The node's area must be repainted.
        const PAINT = 0b0000_0100;
        /// Some descendant must be repainted.
        const CHILD_PAINT = 0b0000_1000;
    }
}

/// The role a node plays in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A plain node.
    Node,
    /// A node whose subtree can be viewed by cameras.
    Layer,
    /// A node that renders a list of layers through a view transform.
    Camera,
    /// The top of the scene; there is exactly one.
    Root,
}

/// A straight-alpha RGBA color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Build a color from components.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build an opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    /// Component-wise interpolation.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + t * (other.r - self.r),
            self.g + t * (other.g - self.g),
            self.b + t * (other.b - self.b),
            self.a + t * (other.a - self.a),
        )
    }
}

/// Initial state for a new node.
#[derive(Clone, Debug)]
pub struct LocalNode {
    /// Local bounds. Empty by default.
    pub bounds: Bounds,
    /// Transform from this node's frame into its parent's frame.
    pub transform: Transform,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
    /// Fill painted over the local bounds, if any.
    pub paint: Option<Color>,
    /// Opacity applied to the node and its subtree, `0.0..=1.0`.
    pub transparency: f32,
}

impl Default for LocalNode {
    fn default() -> Self {
        Self {
            bounds: Bounds::EMPTY,
            transform: Transform::IDENTITY,
            flags: NodeFlags::default(),
            paint: None,
            transparency: 1.0,
        }
    }
}
