mod hardware;
mod reporter;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod supervisor;
mod types;

#[cfg(test)]
mod tests;

pub use hardware::{HardwareGuard, HardwareSetup};
pub use reporter::{console_line, ConsoleReporter};
pub use runtime::wait_for_signal;
pub use startup::{command_collaborators, device_hardware, simulated_hardware, SimulatedHardware};
pub use state::ComponentRegistry;
pub use supervisor::Supervisor;
pub use types::{ComponentState, ShutdownReason, ShutdownReport};
