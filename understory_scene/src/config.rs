// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-wide settings.

use crate::paint::RenderQuality;

/// Rejected configuration values. The setting that was being changed keeps its previous value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A render quality code other than `0` (low) or `1` (high).
    #[error("unknown render quality {0}; expected 0 (low) or 1 (high)")]
    InvalidRenderQuality(u8),
}

/// Settings shared by every node in a [`Scene`](crate::Scene).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    /// Default interval between activity steps, in milliseconds.
    pub step_rate: u64,
    /// Quality hint used by [`Scene::render`](crate::Scene::render) while nothing is animating.
    pub default_render_quality: RenderQuality,
    /// Quality hint used while an activity is stepping.
    pub animating_render_quality: RenderQuality,
    /// Log a warning when the scene is mutated or repainted off the thread that created it.
    ///
    /// Only has an effect with the `std` feature. [`Scene`](crate::Scene) holds
    /// boxed callbacks without a `Send` bound, so it is not `Send` and safe code
    /// cannot move it to another thread; the check only fires for scenes shared
    /// across threads through `unsafe` wrappers.
    pub thread_check: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            step_rate: 20,
            default_render_quality: RenderQuality::High,
            animating_render_quality: RenderQuality::Low,
            thread_check: false,
        }
    }
}

impl SceneConfig {
    /// Set the default activity step rate.
    #[must_use]
    pub fn with_step_rate(mut self, step_rate: u64) -> Self {
        self.step_rate = step_rate;
        self
    }

    /// Set the quality hint for idle frames.
    #[must_use]
    pub fn with_default_render_quality(mut self, quality: RenderQuality) -> Self {
        self.default_render_quality = quality;
        self
    }

    /// Set the quality hint for frames rendered while animating.
    #[must_use]
    pub fn with_animating_render_quality(mut self, quality: RenderQuality) -> Self {
        self.animating_render_quality = quality;
        self
    }

    /// Enable or disable the advisory thread-owner check.
    #[must_use]
    pub fn with_thread_check(mut self, enabled: bool) -> Self {
        self.thread_check = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_defaults() {
        let config = SceneConfig::default()
            .with_step_rate(5)
            .with_default_render_quality(RenderQuality::Low)
            .with_animating_render_quality(RenderQuality::High)
            .with_thread_check(true);
        assert_eq!(config.step_rate, 5);
        assert_eq!(config.default_render_quality, RenderQuality::Low);
        assert_eq!(config.animating_render_quality, RenderQuality::High);
        assert!(config.thread_check, "thread check enabled");
        assert_eq!(SceneConfig::default().step_rate, 20);
    }
}
