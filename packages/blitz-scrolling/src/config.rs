use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables used when constructing an
/// [`AsyncScrollingCoordinator`](crate::AsyncScrollingCoordinator)
///
/// Thresholds in here are platform tuning values, not protocol invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollingConfig {
    /// Drive inertial scrolling on the scrolling thread instead of relying on
    /// platform momentum events
    pub kinetic_scrolling: bool,
    /// Fraction of velocity kept per animation frame
    pub momentum_friction: f32,
    /// Momentum stops below this speed, in px/s
    pub momentum_min_velocity: f32,
    /// Number of recent wheel deltas kept to seed momentum
    pub position_history_size: usize,
    /// Deltas older than this (relative to the newest one) are ignored
    pub position_history_window_ms: u64,
    pub animation_frame_interval_ms: u64,
    /// Fraction of an overscroll that turns into rubber-band stretch
    pub rubber_band_resistance: f32,
    /// Horizontal delta a `Began` event must exceed to start a swipe
    pub swipe_min_horizontal_delta: f32,
    /// A swipe needs `|dx| >= |dy| * swipe_direction_ratio`
    pub swipe_direction_ratio: f32,
    /// Initial value of the forced main-thread scrolling override
    pub force_main_thread_scroll_layer_position_updates: bool,
    pub scrolling_performance_logging: bool,
}

impl Default for ScrollingConfig {
    fn default() -> Self {
        Self {
            kinetic_scrolling: false,
            momentum_friction: 0.95,
            momentum_min_velocity: 10.0,
            position_history_size: 8,
            position_history_window_ms: 100,
            animation_frame_interval_ms: 16,
            rubber_band_resistance: 0.5,
            swipe_min_horizontal_delta: 0.0,
            swipe_direction_ratio: 1.0,
            force_main_thread_scroll_layer_position_updates: false,
            scrolling_performance_logging: false,
        }
    }
}

impl ScrollingConfig {
    pub fn animation_frame_interval(&self) -> Duration {
        Duration::from_millis(self.animation_frame_interval_ms.max(1))
    }

    pub fn position_history_window(&self) -> Duration {
        Duration::from_millis(self.position_history_window_ms)
    }

    /// Config for tests and headless embedders that want inertia handled here
    pub fn with_kinetic_scrolling() -> Self {
        Self {
            kinetic_scrolling: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ScrollingConfig =
            serde_json::from_str(r#"{ "kinetic_scrolling": true, "momentum_friction": 0.9 }"#)
                .expect("config should deserialize");
        assert!(config.kinetic_scrolling);
        assert_eq!(config.momentum_friction, 0.9);
        assert_eq!(config.animation_frame_interval_ms, 16);
        assert_eq!(config.swipe_direction_ratio, 1.0);
    }

    #[test]
    fn test_frame_interval_is_never_zero() {
        let config = ScrollingConfig {
            animation_frame_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.animation_frame_interval(), Duration::from_millis(1));
    }
}
