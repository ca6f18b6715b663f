//! Platform-neutral wheel events

use std::time::Instant;

use keyboard_types::Modifiers;

use crate::geometry::{LayoutPoint, LayoutVector};

/// Phase of a wheel or momentum gesture as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WheelEventPhase {
    /// Discrete wheel tick, or the event carries no gesture information
    #[default]
    None,
    Began,
    Stationary,
    Changed,
    Ended,
    Cancelled,
    MayBegin,
}

impl WheelEventPhase {
    #[inline]
    fn is_began_or_changed(self) -> bool {
        matches!(self, WheelEventPhase::Began | WheelEventPhase::Changed)
    }
}

/// A wheel event in the coordinate space of the main frame's viewport
///
/// `delta` follows the platform convention: a positive value moves the content
/// right/down, which scrolls the viewport towards its minimum scroll position.
#[derive(Debug, Clone, PartialEq)]
pub struct BlitzWheelEvent {
    /// Pointer position, relative to the main frame's viewport
    pub position: LayoutPoint,
    /// Scroll delta in CSS pixels
    pub delta: LayoutVector,
    /// Phase of the user-driven part of the gesture
    pub phase: WheelEventPhase,
    /// Phase of the platform-generated momentum part of the gesture
    pub momentum_phase: WheelEventPhase,
    /// Platform-reported swipe velocity in CSS pixels per second, in the same
    /// direction convention as `delta`
    pub velocity: Option<LayoutVector>,
    pub timestamp: Instant,
    pub modifiers: Modifiers,
}

impl BlitzWheelEvent {
    pub fn new(position: LayoutPoint, delta: LayoutVector) -> Self {
        Self {
            position,
            delta,
            phase: WheelEventPhase::None,
            momentum_phase: WheelEventPhase::None,
            velocity: None,
            timestamp: Instant::now(),
            modifiers: Modifiers::empty(),
        }
    }

    pub fn with_phase(mut self, phase: WheelEventPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_momentum_phase(mut self, momentum_phase: WheelEventPhase) -> Self {
        self.momentum_phase = momentum_phase;
        self
    }

    pub fn with_velocity(mut self, velocity: LayoutVector) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// True for events generated by the platform's momentum phase
    #[inline]
    pub fn is_momentum(&self) -> bool {
        self.momentum_phase != WheelEventPhase::None
    }

    /// The user lifted their fingers and the platform will not send momentum
    #[inline]
    pub fn is_end_of_non_momentum_scroll(&self) -> bool {
        self.phase == WheelEventPhase::Ended && self.momentum_phase == WheelEventPhase::None
    }

    /// First event of the platform momentum phase
    #[inline]
    pub fn is_transitioning_to_momentum_scroll(&self) -> bool {
        self.phase == WheelEventPhase::None && self.momentum_phase == WheelEventPhase::Began
    }

    /// Events that pin the rest of their gesture to the target chosen for them
    #[inline]
    pub fn should_consider_latching(&self) -> bool {
        self.phase.is_began_or_changed() || self.momentum_phase.is_began_or_changed()
    }

    /// Events that end any latch established earlier in the gesture
    #[inline]
    pub fn should_reset_latching(&self) -> bool {
        matches!(
            self.phase,
            WheelEventPhase::Cancelled | WheelEventPhase::MayBegin
        ) || (self.phase == WheelEventPhase::None
            && self.momentum_phase == WheelEventPhase::Ended)
    }
}
