mod line;
mod mock;
mod sysfs;
#[cfg(test)]
mod tests;

pub use line::{Bias, GpioBackend, InputLine, Level, OutputLine};
pub use mock::{MockGpio, MockLevel};
pub use sysfs::SysfsGpio;
