use super::line::{Bias, GpioBackend, InputLine, Level, OutputLine};
use crate::error::GpioError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

type LevelSource = Arc<dyn Fn() -> Level + Send + Sync>;

/// Shared, externally settable input level
#[derive(Debug, Clone, Default)]
pub struct MockLevel(Arc<AtomicBool>);

impl MockLevel {
    pub fn set(&self, level: Level) {
        self.0.store(level.is_high(), Ordering::SeqCst);
    }

    pub fn get(&self) -> Level {
        Level::from(self.0.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
struct MockGpioState {
    sources: HashMap<u32, LevelSource>,
    history: HashMap<u32, Vec<Level>>,
    claimed: Vec<u32>,
    claim_log: Vec<u32>,
    fail_claim: Option<u32>,
    cleanups: usize,
    released: bool,
}

/// In-memory GPIO backend for tests and simulation.
///
/// Inputs read from scripted sources (unscripted pins read `Low`); outputs
/// record every level written. Clones share state so a test can keep a handle
/// while the backend itself is owned by the code under test.
#[derive(Clone, Default)]
pub struct MockGpio {
    state: Arc<Mutex<MockGpioState>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `pin` from a settable level and return the handle
    pub fn input_level(&self, pin: u32) -> MockLevel {
        let level = MockLevel::default();
        let source = level.clone();
        self.script_input(pin, move || source.get());
        level
    }

    /// Drive `pin` from an arbitrary function, evaluated on every read
    pub fn script_input<F>(&self, pin: u32, source: F)
    where
        F: Fn() -> Level + Send + Sync + 'static,
    {
        self.state.lock().sources.insert(pin, Arc::new(source));
    }

    /// Make the next claim of `pin` fail, as a missing line would
    pub fn fail_claim(&self, pin: u32) {
        self.state.lock().fail_claim = Some(pin);
    }

    pub fn output_history(&self, pin: u32) -> Vec<Level> {
        self.state
            .lock()
            .history
            .get(&pin)
            .cloned()
            .unwrap_or_default()
    }

    /// Pins currently claimed; emptied by `cleanup`
    pub fn claimed_pins(&self) -> Vec<u32> {
        self.state.lock().claimed.clone()
    }

    /// Every successful claim in order, including ones since released
    pub fn claim_history(&self) -> Vec<u32> {
        self.state.lock().claim_log.clone()
    }

    pub fn cleanup_count(&self) -> usize {
        self.state.lock().cleanups
    }

    fn check_claim(&self, pin: u32) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        if state.fail_claim == Some(pin) {
            state.fail_claim = None;
            return Err(GpioError::Export {
                pin,
                details: "mock claim failure".to_string(),
            });
        }
        state.claimed.push(pin);
        state.claim_log.push(pin);
        state.released = false;
        Ok(())
    }
}

impl GpioBackend for MockGpio {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn claim_output(
        &mut self,
        pin: u32,
        initial: Level,
    ) -> Result<Box<dyn OutputLine>, GpioError> {
        self.check_claim(pin)?;
        self.state
            .lock()
            .history
            .entry(pin)
            .or_default()
            .push(initial);
        Ok(Box::new(MockOutput {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn claim_input(
        &mut self,
        pin: u32,
        _bias: Bias,
        _active_low: bool,
    ) -> Result<Box<dyn InputLine>, GpioError> {
        self.check_claim(pin)?;
        Ok(Box::new(MockInput {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn cleanup(&mut self) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        state.cleanups += 1;
        state.released = true;
        state.claimed.clear();
        debug!("Mock GPIO cleanup #{}", state.cleanups);
        Ok(())
    }
}

struct MockOutput {
    pin: u32,
    state: Arc<Mutex<MockGpioState>>,
}

impl OutputLine for MockOutput {
    fn pin(&self) -> u32 {
        self.pin
    }

    fn set_level(&mut self, level: Level) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        if state.released {
            return Err(GpioError::Released { pin: self.pin });
        }
        state.history.entry(self.pin).or_default().push(level);
        Ok(())
    }
}

struct MockInput {
    pin: u32,
    state: Arc<Mutex<MockGpioState>>,
}

impl InputLine for MockInput {
    fn pin(&self) -> u32 {
        self.pin
    }

    fn level(&mut self) -> Result<Level, GpioError> {
        // Clone the source out so it never runs under the state lock
        let source = {
            let state = self.state.lock();
            if state.released {
                return Err(GpioError::Released { pin: self.pin });
            }
            state.sources.get(&self.pin).cloned()
        };
        Ok(source.map(|f| f()).unwrap_or(Level::Low))
    }
}
