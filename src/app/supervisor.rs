use super::hardware::{HardwareGuard, HardwareSetup};
use super::reporter::ConsoleReporter;
use super::state::ComponentRegistry;
use super::types::{ComponentState, ShutdownReason, ShutdownReport};
use crate::config::GlassesConfig;
use crate::dispatch::{ActionDispatcher, ActionOutcome, Collaborators, DispatchSettings};
use crate::error::Result;
use crate::events::{EventBus, GlassesEvent};
use crate::gesture::TapGestureDetector;
use crate::gpio::{Bias, InputLine, Level, OutputLine};
use crate::keyboard_input::KeyboardTapSimulator;
use crate::ranging::RangeSensor;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub(super) const GPIO: &str = "gpio";
pub(super) const CAMERA: &str = "camera";
pub(super) const RANGING: &str = "ranging";
pub(super) const GESTURES: &str = "gestures";
pub(super) const REPORTER: &str = "reporter";
pub(super) const KEYBOARD: &str = "keyboard";

/// Owns the controller's lifecycle.
///
/// Brings up the hardware, runs the ranging loop on its own thread and the
/// gesture/dispatch loop on the calling task, and tears the hardware down
/// exactly once however the run ends.
pub struct Supervisor {
    pub(super) config: GlassesConfig,
    pub(super) event_bus: EventBus,
    pub(super) collaborators: Collaborators,
    pub(super) keyboard: Option<KeyboardTapSimulator>,
    pub(super) console: bool,
    pub(super) components: ComponentRegistry,
    pub(super) cancellation_token: CancellationToken,
}

impl Supervisor {
    pub fn new(config: GlassesConfig, collaborators: Collaborators) -> Self {
        let event_bus = EventBus::new(config.system.event_bus_capacity);
        Self::with_event_bus(config, collaborators, event_bus)
    }

    pub fn with_event_bus(
        config: GlassesConfig,
        collaborators: Collaborators,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config,
            event_bus,
            collaborators,
            keyboard: None,
            console: false,
            components: ComponentRegistry::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Drive the tap line from the keyboard (simulation mode)
    pub fn with_keyboard(mut self, simulator: KeyboardTapSimulator) -> Self {
        self.keyboard = Some(simulator);
        self
    }

    /// Print user-facing events to stdout
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    pub fn event_bus(&self) -> EventBus {
        self.event_bus.clone()
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Claim the lines and start the camera. On failure everything already
    /// set up is torn down before the error is returned.
    pub(super) async fn initialize(
        &self,
        guard: &HardwareGuard,
    ) -> Result<(RangeSensor, TapGestureDetector)> {
        info!("Initializing smart glasses hardware");

        match self.bring_up(guard).await {
            Ok(components) => Ok(components),
            Err(e) => {
                error!("Hardware initialization failed: {}", e);
                if let Err(teardown_error) = guard.teardown() {
                    error!("Teardown after failed initialization: {}", teardown_error);
                }
                Err(e)
            }
        }
    }

    async fn bring_up(&self, guard: &HardwareGuard) -> Result<(RangeSensor, TapGestureDetector)> {
        self.components.set(GPIO, ComponentState::Starting);
        let (trigger, echo, tap) = match self.claim_lines(guard) {
            Ok(lines) => lines,
            Err(e) => {
                self.components.set(GPIO, ComponentState::Failed);
                return Err(e);
            }
        };
        self.components.set(GPIO, ComponentState::Running);

        self.components.set(CAMERA, ComponentState::Starting);
        if let Err(e) = guard.camera().start(self.config.camera.warmup()).await {
            self.components.set(CAMERA, ComponentState::Failed);
            return Err(e.into());
        }
        self.components.set(CAMERA, ComponentState::Running);

        Ok((
            RangeSensor::new(trigger, echo, self.config.ranging.clone()),
            TapGestureDetector::new(tap, self.config.gesture.clone()),
        ))
    }

    #[allow(clippy::type_complexity)]
    fn claim_lines(
        &self,
        guard: &HardwareGuard,
    ) -> Result<(Box<dyn OutputLine>, Box<dyn InputLine>, Box<dyn InputLine>)> {
        let gpio = &self.config.gpio;
        let trigger = guard.claim_output(gpio.trigger_pin, Level::Low)?;
        let echo = guard.claim_input(gpio.echo_pin, Bias::None, false)?;
        let tap = guard.claim_input(gpio.tap_pin, Bias::PullUp, gpio.tap_active_low)?;
        info!(
            "GPIO claimed: trigger {}, echo {}, tap {}",
            gpio.trigger_pin, gpio.echo_pin, gpio.tap_pin
        );
        Ok((trigger, echo, tap))
    }

    /// Run until `shutdown` resolves or a shutdown request arrives on the bus.
    ///
    /// `shutdown` is polled before any hardware is touched, so an interrupt
    /// during initialization still tears down what was brought up. Fails only
    /// if initialization fails; errors during teardown show up as a non-zero
    /// exit code in the report.
    pub async fn run<F>(&self, hardware: HardwareSetup, shutdown: F) -> Result<ShutdownReport>
    where
        F: Future<Output = ShutdownReason>,
    {
        tokio::pin!(shutdown);
        self.components.register(&[GPIO, CAMERA, RANGING, GESTURES, REPORTER]);
        let guard = HardwareGuard::new(hardware);

        let (sensor, mut detector) = tokio::select! {
            biased;
            reason = &mut shutdown => {
                warn!("Shutdown during initialization: {}", reason);
                let exit_code = self.teardown_hardware(&guard);
                return Ok(ShutdownReport { reason, exit_code });
            }
            ready = self.initialize(&guard) => ready?,
        };

        let ranging = sensor.spawn(self.event_bus.clone(), self.cancellation_token.child_token());
        self.components.set(RANGING, ComponentState::Running);

        let reporter = if self.console {
            let reporter = ConsoleReporter::new(self.event_bus.clone())
                .with_raw_terminal(self.keyboard.is_some())
                .spawn(self.cancellation_token.child_token());
            self.components.set(REPORTER, ComponentState::Running);
            Some(reporter)
        } else {
            None
        };

        if let Some(keyboard) = &self.keyboard {
            self.components.set(KEYBOARD, ComponentState::Starting);
            match keyboard.start().await {
                Ok(()) => self.components.set(KEYBOARD, ComponentState::Running),
                Err(e) => {
                    warn!("Keyboard simulator unavailable: {}", e);
                    self.components.set(KEYBOARD, ComponentState::Failed);
                }
            }
        }

        let dispatcher = ActionDispatcher::new(
            guard.camera().clone(),
            self.collaborators.clone(),
            DispatchSettings::from_config(&self.config),
            self.event_bus.clone(),
        );

        self.components.set(GESTURES, ComponentState::Running);
        info!("Smart glasses running");

        let reason = self.control_loop(&mut detector, &dispatcher, &mut shutdown).await;
        info!("Shutdown initiated: {}", reason);

        drop(dispatcher);
        drop(detector);
        let exit_code = self.shutdown(guard, ranging, reporter).await;

        Ok(ShutdownReport { reason, exit_code })
    }

    /// Initialize the hardware, then tear it straight down
    pub async fn dry_run(&self, hardware: HardwareSetup) -> Result<ShutdownReport> {
        self.components.register(&[GPIO, CAMERA, RANGING, GESTURES, REPORTER]);
        let guard = HardwareGuard::new(hardware);
        self.initialize(&guard).await?;
        info!("Dry run: hardware initialized successfully, tearing down");

        let exit_code = self.teardown_hardware(&guard);
        Ok(ShutdownReport {
            reason: ShutdownReason::UserRequest,
            exit_code,
        })
    }

    /// Poll the tap line and dispatch gestures until asked to stop.
    ///
    /// An in-flight action is abandoned when shutdown arrives; dropping it
    /// releases the camera lease.
    async fn control_loop<F>(
        &self,
        detector: &mut TapGestureDetector,
        dispatcher: &ActionDispatcher,
        shutdown: F,
    ) -> ShutdownReason
    where
        F: Future<Output = ShutdownReason>,
    {
        tokio::pin!(shutdown);
        let mut requests = self.event_bus.subscribe();

        loop {
            let gesture = tokio::select! {
                reason = &mut shutdown => return reason,
                reason = next_shutdown_request(&mut requests) => return reason,
                _ = tokio::time::sleep(detector.next_poll_delay()) => match detector.poll() {
                    Ok(gesture) => gesture,
                    Err(e) => {
                        error!("Tap line failed: {}", e);
                        self.components.set(GESTURES, ComponentState::Failed);
                        let _ = self.event_bus.publish(GlassesEvent::SystemError {
                            component: GESTURES.to_string(),
                            error: e.to_string(),
                        });
                        return ShutdownReason::Error(e.to_string());
                    }
                },
            };

            let Some(gesture) = gesture else {
                continue;
            };

            tokio::select! {
                reason = &mut shutdown => {
                    warn!("Abandoning in-flight {:?} action", gesture);
                    return reason;
                }
                reason = next_shutdown_request(&mut requests) => {
                    warn!("Abandoning in-flight {:?} action", gesture);
                    return reason;
                }
                outcome = dispatcher.dispatch(gesture) => match outcome {
                    ActionOutcome::Failed { action, error } => {
                        debug!("{} ended with failure: {}", action, error)
                    }
                    outcome => debug!("Action outcome: {:?}", outcome),
                },
            }

            detector.action_finished();
        }
    }
}

/// Wait for a `ShutdownRequested` event, skipping everything else
async fn next_shutdown_request(receiver: &mut broadcast::Receiver<GlassesEvent>) -> ShutdownReason {
    loop {
        match receiver.recv().await {
            Ok(GlassesEvent::ShutdownRequested { reason, .. }) => {
                info!("Shutdown requested on the event bus: {}", reason);
                return ShutdownReason::UserRequest;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!("Shutdown listener skipped {} events", skipped),
            Err(RecvError::Closed) => return std::future::pending().await,
        }
    }
}
