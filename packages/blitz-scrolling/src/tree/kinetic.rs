//! Inertial scrolling driven by the scrolling thread

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use blitz_traits::geometry::LayoutVector;

use crate::ScrollingConfig;

/// Rolling window of recent wheel deltas, used to estimate the gesture's velocity
#[derive(Debug, Clone)]
pub struct ScrollHistory {
    samples: VecDeque<(Instant, LayoutVector)>,
    capacity: usize,
    window: Duration,
}

impl ScrollHistory {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
            window,
        }
    }

    pub fn from_config(config: &ScrollingConfig) -> Self {
        Self::new(
            config.position_history_size,
            config.position_history_window(),
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, timestamp: Instant, delta: LayoutVector) {
        self.samples.push_back((timestamp, delta));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        while let Some((oldest, _)) = self.samples.front() {
            if timestamp.saturating_duration_since(*oldest) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Average delta per second over the window, in wheel delta direction
    ///
    /// The history is emptied. Fewer than two samples, or samples sharing one
    /// timestamp, give a zero velocity.
    pub fn take_velocity(&mut self) -> LayoutVector {
        let samples = std::mem::take(&mut self.samples);
        let (Some((first, _)), Some((last, _))) = (samples.front(), samples.back()) else {
            return LayoutVector::zero();
        };
        let elapsed = last.saturating_duration_since(*first).as_secs_f32();
        if samples.len() < 2 || elapsed <= 0.0 {
            return LayoutVector::zero();
        }
        // The first delta was accumulated before the window started
        let travelled = samples
            .iter()
            .skip(1)
            .fold(LayoutVector::zero(), |acc, (_, delta)| acc + *delta);
        travelled / elapsed
    }
}

/// A decaying scroll velocity applied once per animation frame
#[derive(Debug, Clone)]
pub struct MomentumAnimation {
    /// Scroll position change per second
    velocity: LayoutVector,
    last_tick: Instant,
}

impl MomentumAnimation {
    /// `None` when the velocity is too small to be worth animating
    pub fn start(velocity: LayoutVector, now: Instant, config: &ScrollingConfig) -> Option<Self> {
        if velocity.length() < config.momentum_min_velocity {
            return None;
        }
        Some(Self {
            velocity,
            last_tick: now,
        })
    }

    pub fn velocity(&self) -> LayoutVector {
        self.velocity
    }

    /// Advance to `now`, returning the scroll delta to apply, or `None` once the
    /// animation has run out of speed
    pub fn step(&mut self, now: Instant, config: &ScrollingConfig) -> Option<LayoutVector> {
        let elapsed = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let frame = config.animation_frame_interval().as_secs_f32();
        let decay = config.momentum_friction.clamp(0.0, 1.0).powf(elapsed / frame);
        self.velocity = self.velocity * decay;

        if self.velocity.length() < config.momentum_min_velocity {
            return None;
        }
        Some(self.velocity * elapsed)
    }
}
