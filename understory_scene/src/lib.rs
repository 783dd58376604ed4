// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scene: a retained-mode 2D scene graph for zoomable interfaces.
//!
//! A [`Scene`] is a tree of nodes. Each node has local bounds, a local
//! [`Transform`], visibility and picking flags, an optional fill and
//! transparency, and optional [`Content`] for custom painting and hit tests.
//! Two node kinds are special:
//!
//! - Layers are subtrees that can be viewed.
//! - Cameras render an ordered list of layers through a view transform.
//!   Many cameras may view the same layer, and a camera can itself live in a
//!   layer viewed by another camera.
//!
//! ## What the scene keeps for you
//!
//! - Full bounds: every node caches the union of its own bounds and those of
//!   its visible descendants. Changing bounds, transforms, visibility or
//!   structure marks the cache stale up the ancestor chain; it is recomputed
//!   lazily on [`Scene::validate`].
//! - Damage: changes schedule repaints. On validation each damaged area travels
//!   up the tree, through every camera viewing an affected layer, and reaches
//!   the camera's [`Component`] in camera-local coordinates. [`Damage`] is a
//!   ready-made component that records rectangles.
//! - Picking: [`Scene::pick`] returns a [`PickPath`] from a camera down to the
//!   topmost hit node, with the transforms used along the way so positions can
//!   be mapped into any node on the path.
//! - Painting: [`Scene::render`] walks a camera's view into a caller-provided
//!   [`Surface`] through a [`PaintContext`] that tracks transforms, clips and
//!   transparency.
//! - Activities: time-driven changes such as animated transforms and view
//!   changes, stepped from [`Scene::process_inputs`].
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::{Point, Rect};
//! use understory_scene::{Damage, LocalNode, Scene};
//!
//! let (mut scene, camera, layer) = Scene::basic(Rect::new(0.0, 0.0, 200.0, 100.0));
//! scene.set_component(camera, Some(Box::new(Damage::default())));
//!
//! let node = scene.insert(
//!     Some(layer),
//!     LocalNode { bounds: Rect::new(10.0, 10.0, 30.0, 30.0).into(), ..Default::default() },
//! );
//! scene.process_inputs(0);
//!
//! let damage = scene.component_mut::<Damage>(camera).unwrap();
//! assert_eq!(damage.union_rect(), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
//!
//! let path = scene.pick(camera, Point::new(15.0, 15.0), 0.0);
//! assert_eq!(path.picked_node(), Some(node));
//! ```
//!
//! ## Identity and lifetime
//!
//! Nodes are addressed by generational [`NodeId`]s. Parents own their
//! children; every other link (a layer's cameras, a camera's layers, a pick
//! path's nodes) is a plain id that never keeps a node alive. Destroying a node
//! destroys its subtree and removes it from every observer list.
//!
//! ## Threading
//!
//! A scene is used from one thread. With the `std` feature and
//! [`SceneConfig::thread_check`] enabled, mutations from another thread are
//! logged with `log::warn!`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod activity;
mod appearance;
mod bounds;
mod camera;
mod config;
mod content;
mod damage;
mod event;
mod geometry;
mod paint;
mod pick;
mod root;
mod scene;
#[cfg(feature = "std")]
mod thread_check;
mod transform;
mod types;
mod util;

pub use activity::{
    Activity, ActivityId, ActivityTarget, ColorTarget, InterpolationMode, Step,
    TerminationBehavior, TransformTarget, TransparencyTarget, ViewTransformTarget,
};
pub use bounds::Bounds;
pub use camera::ViewConstraint;
pub use config::{ConfigError, SceneConfig};
pub use content::Content;
pub use damage::{Component, Damage};
pub use event::{EventContext, EventListener, InputEvent, InputEventKind, Outcome};
pub use paint::{LocalClip, PaintContext, RenderQuality, StackDepths, Surface};
pub use pick::{PickPath, PickPathError};
pub use root::{Clock, InputSource, InputSourceId, ManualClock};
#[cfg(feature = "std")]
pub use root::SystemClock;
pub use scene::Scene;
pub use transform::{Transform, TransformError, TransformKind};
pub use types::{Color, Dirty, LocalNode, NodeFlags, NodeId, NodeKind};
