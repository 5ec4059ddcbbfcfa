use super::{HardwareSetup, ShutdownReason, ShutdownReport, Supervisor};
use crate::error::Result;
use tracing::{error, info};

impl Supervisor {
    /// Run until SIGINT, SIGTERM or a user shutdown request
    pub async fn run_until_signal(&self, hardware: HardwareSetup) -> Result<ShutdownReport> {
        self.run(hardware, wait_for_signal()).await
    }
}

/// Resolve once the process receives SIGINT (Ctrl+C) or, on Unix, SIGTERM
pub async fn wait_for_signal() -> ShutdownReason {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                return tokio::select! {
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        ShutdownReason::Signal("SIGTERM".to_string())
                    }
                    reason = interrupt() => reason,
                };
            }
            Err(e) => error!("Failed to register SIGTERM handler: {}", e),
        }
    }

    interrupt().await
}

async fn interrupt() -> ShutdownReason {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received SIGINT signal (Ctrl+C)");
            ShutdownReason::Signal("SIGINT".to_string())
        }
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending().await
        }
    }
}
