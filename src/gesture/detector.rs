use super::types::{GestureClassification, LineState, TapEvent, TapState};
use crate::clock::{Clock, MonotonicClock};
use crate::config::GestureConfig;
use crate::error::GpioError;
use crate::gpio::InputLine;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Turns samples of the tap line into single and double tap gestures.
///
/// A first press is reported as `SingleTap` straight away; a second press
/// landing inside the double-tap window is reported as `DoubleTap`. After
/// any classification the line is left unsampled for the debounce period,
/// which the caller restarts with [`TapGestureDetector::action_finished`]
/// once the gesture's action has run.
pub struct TapGestureDetector<C: Clock = MonotonicClock> {
    line: Box<dyn InputLine>,
    clock: C,
    config: GestureConfig,
    state: TapState,
    suppressed_until: Option<Instant>,
}

impl TapGestureDetector<MonotonicClock> {
    pub fn new(line: Box<dyn InputLine>, config: GestureConfig) -> Self {
        Self::with_clock(line, config, MonotonicClock)
    }
}

impl<C: Clock> TapGestureDetector<C> {
    pub fn with_clock(line: Box<dyn InputLine>, config: GestureConfig, clock: C) -> Self {
        Self {
            line,
            clock,
            config,
            state: TapState::Idle,
            suppressed_until: None,
        }
    }

    /// Sample the line once.
    ///
    /// Returns `None` while debouncing or when the line is not pressed.
    pub fn poll(&mut self) -> Result<Option<GestureClassification>, GpioError> {
        let now = self.clock.now();

        if let Some(until) = self.suppressed_until {
            if now < until {
                return Ok(None);
            }
            self.suppressed_until = None;
        }

        let event = if self.line.is_high()? {
            TapEvent::pressed(now)
        } else {
            TapEvent::released(now)
        };

        Ok(self.on_event(event))
    }

    /// Advance the state machine with one sample
    pub fn on_event(&mut self, event: TapEvent) -> Option<GestureClassification> {
        if event.line_state == LineState::Released {
            return None;
        }

        let now = event.timestamp;
        let tap_count = match self.state {
            TapState::Armed {
                tap_count,
                window_start,
            } if now.saturating_duration_since(window_start) < self.config.double_tap_window() => {
                tap_count + 1
            }
            _ => 1,
        };

        let gesture = if tap_count >= 2 {
            self.state = TapState::Idle;
            info!("Double tap detected");
            GestureClassification::DoubleTap
        } else {
            self.state = TapState::Armed {
                tap_count,
                window_start: now,
            };
            info!("Single tap detected");
            GestureClassification::SingleTap
        };

        self.suppressed_until = Some(now + self.config.debounce());
        debug!("Tap line debounced for {:?}", self.config.debounce());

        Some(gesture)
    }

    /// Restart the debounce period from now, after the action for the last
    /// gesture has completed
    pub fn action_finished(&mut self) {
        let until = self.clock.now() + self.config.debounce();
        self.suppressed_until = Some(until);
        debug!("Action finished, tap line debounced until {:?}", until);
    }

    /// How long the caller should wait before the next `poll`
    pub fn next_poll_delay(&self) -> Duration {
        let idle = self.config.poll_interval();
        match self.suppressed_until {
            Some(until) => until
                .saturating_duration_since(self.clock.now())
                .max(idle),
            None => idle,
        }
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    pub fn is_debouncing(&self) -> bool {
        self.suppressed_until.is_some()
    }
}
