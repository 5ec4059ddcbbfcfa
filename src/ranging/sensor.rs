use crate::clock::{Clock, MonotonicClock};
use crate::config::RangingConfig;
use crate::error::{EchoEdge, RangeError};
use crate::events::{EventBus, GlassesEvent};
use crate::gpio::{InputLine, Level, OutputLine};
use std::time::{Duration, Instant};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Longest stretch the ranging loop sleeps without checking for cancellation
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(50);

/// One pulse-width measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingSample {
    /// Width of the echo pulse
    pub elapsed: Duration,
    /// Distance to the obstacle in centimetres
    pub distance_cm: f64,
}

impl RangingSample {
    /// Convert an echo pulse width to a one-way distance
    pub fn from_echo(elapsed: Duration, speed_of_sound_cm_s: f64) -> Self {
        Self {
            elapsed,
            distance_cm: elapsed.as_secs_f64() * speed_of_sound_cm_s / 2.0,
        }
    }
}

/// Ultrasonic range finder driven by a trigger and an echo line
pub struct RangeSensor<C: Clock = MonotonicClock> {
    trigger: Box<dyn OutputLine>,
    echo: Box<dyn InputLine>,
    clock: C,
    config: RangingConfig,
}

impl RangeSensor<MonotonicClock> {
    pub fn new(
        trigger: Box<dyn OutputLine>,
        echo: Box<dyn InputLine>,
        config: RangingConfig,
    ) -> Self {
        Self::with_clock(trigger, echo, config, MonotonicClock)
    }
}

impl<C: Clock> RangeSensor<C> {
    pub fn with_clock(
        trigger: Box<dyn OutputLine>,
        echo: Box<dyn InputLine>,
        config: RangingConfig,
        clock: C,
    ) -> Self {
        Self {
            trigger,
            echo,
            clock,
            config,
        }
    }

    /// Fire one trigger pulse and time the echo.
    ///
    /// Each echo transition is awaited for at most `echo_timeout`, so a
    /// disconnected or stuck sensor costs two timeouts, never a hang.
    pub fn measure_once(&mut self) -> Result<RangingSample, RangeError> {
        self.trigger.set_high()?;
        self.clock.sleep(self.config.trigger_pulse());
        self.trigger.set_low()?;

        let start = self.wait_for_echo(Level::High, EchoEdge::Rising)?;
        let stop = self.wait_for_echo(Level::Low, EchoEdge::Falling)?;

        Ok(RangingSample::from_echo(
            stop.saturating_duration_since(start),
            self.config.speed_of_sound_cm_s,
        ))
    }

    /// Poll the echo line until it reaches `target`, returning the instant seen
    fn wait_for_echo(&mut self, target: Level, edge: EchoEdge) -> Result<Instant, RangeError> {
        let timeout = self.config.echo_timeout();
        let began = self.clock.now();

        loop {
            let now = self.clock.now();
            if self.echo.level()? == target {
                return Ok(now);
            }
            if now.saturating_duration_since(began) >= timeout {
                return Err(RangeError::EchoTimeout {
                    edge,
                    waited: timeout,
                });
            }
        }
    }

    pub fn is_proximity_alert(&self, sample: &RangingSample) -> bool {
        sample.distance_cm < self.config.alert_distance_cm
    }

    /// Measure once and publish a proximity alert if the obstacle is too close
    pub fn cycle(&mut self, event_bus: &EventBus) -> Result<RangingSample, RangeError> {
        let sample = self.measure_once()?;
        trace!("Ranging sample: {:?}", sample);

        if self.is_proximity_alert(&sample) {
            // No subscriber is not an error for an alert
            let _ = event_bus.publish(GlassesEvent::proximity_alert(sample.distance_cm));
        }

        Ok(sample)
    }

    /// Run ranging cycles until `cancel` fires. Each cycle is independent.
    pub fn run(&mut self, event_bus: &EventBus, cancel: &CancellationToken) {
        info!(
            "Ranging loop started (interval {:?}, echo timeout {:?})",
            self.config.interval(),
            self.config.echo_timeout()
        );

        while !cancel.is_cancelled() {
            match self.cycle(event_bus) {
                Ok(sample) => debug!("Distance: {:.1} cm", sample.distance_cm),
                Err(e @ RangeError::EchoTimeout { .. }) => debug!("Skipping cycle: {}", e),
                Err(e) => warn!("Ranging cycle failed: {}", e),
            }

            if !self.pause(cancel) {
                break;
            }
        }

        info!("Ranging loop stopped");
    }

    /// Sleep for one interval; false if cancelled meanwhile
    fn pause(&self, cancel: &CancellationToken) -> bool {
        let mut remaining = self.config.interval();
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                return false;
            }
            let slice = remaining.min(CANCEL_CHECK_SLICE);
            self.clock.sleep(slice);
            remaining -= slice;
        }
        !cancel.is_cancelled()
    }
}

impl<C: Clock + 'static> RangeSensor<C> {
    /// Move the sensor onto a blocking thread and run it there.
    ///
    /// The handle yields the sensor back once the loop has observed `cancel`.
    pub fn spawn(mut self, event_bus: EventBus, cancel: CancellationToken) -> JoinHandle<Self> {
        task::spawn_blocking(move || {
            self.run(&event_bus, &cancel);
            self
        })
    }
}
