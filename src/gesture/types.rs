use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Outcome of sampling the tap line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureClassification {
    SingleTap,
    DoubleTap,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Pressed,
    Released,
}

/// A single sample of the tap line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapEvent {
    pub timestamp: Instant,
    pub line_state: LineState,
}

impl TapEvent {
    pub fn pressed(timestamp: Instant) -> Self {
        Self {
            timestamp,
            line_state: LineState::Pressed,
        }
    }

    pub fn released(timestamp: Instant) -> Self {
        Self {
            timestamp,
            line_state: LineState::Released,
        }
    }
}

/// Tap counting state; `window_start` is the instant of the latest press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapState {
    Idle,
    Armed { tap_count: u32, window_start: Instant },
}
