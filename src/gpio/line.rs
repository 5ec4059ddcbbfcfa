use crate::error::GpioError;

/// Logical line level. For active-low inputs `High` means "asserted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Requested input bias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    None,
    PullUp,
    PullDown,
}

pub trait OutputLine: Send {
    fn pin(&self) -> u32;

    fn set_level(&mut self, level: Level) -> Result<(), GpioError>;

    fn set_high(&mut self) -> Result<(), GpioError> {
        self.set_level(Level::High)
    }

    fn set_low(&mut self) -> Result<(), GpioError> {
        self.set_level(Level::Low)
    }
}

pub trait InputLine: Send {
    fn pin(&self) -> u32;

    fn level(&mut self) -> Result<Level, GpioError>;

    fn is_high(&mut self) -> Result<bool, GpioError> {
        Ok(self.level()?.is_high())
    }
}

/// Owner of the board's GPIO lines.
///
/// A backend hands out claimed lines and releases every one of them in
/// [`GpioBackend::cleanup`]. Lines used after cleanup report
/// [`GpioError::Released`] or an I/O error, depending on the backend.
pub trait GpioBackend: Send {
    fn name(&self) -> &'static str;

    fn claim_output(&mut self, pin: u32, initial: Level)
        -> Result<Box<dyn OutputLine>, GpioError>;

    fn claim_input(
        &mut self,
        pin: u32,
        bias: Bias,
        active_low: bool,
    ) -> Result<Box<dyn InputLine>, GpioError>;

    fn cleanup(&mut self) -> Result<(), GpioError>;
}
