use super::hardware::HardwareGuard;
use super::supervisor::{CAMERA, GESTURES, GPIO, KEYBOARD, RANGING, REPORTER};
use super::{ComponentState, Supervisor};
use crate::ranging::RangeSensor;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

impl Supervisor {
    /// Stop background tasks, then release the hardware. Returns the exit code.
    pub(super) async fn shutdown(
        &self,
        guard: HardwareGuard,
        ranging: JoinHandle<RangeSensor>,
        reporter: Option<JoinHandle<()>>,
    ) -> i32 {
        info!("Beginning graceful shutdown");
        self.components.set_all(ComponentState::Stopping);
        self.cancellation_token.cancel();

        let mut exit_code = 0;
        let limit = self.config.system.shutdown_timeout();

        if let Some(keyboard) = &self.keyboard {
            keyboard.stop().await;
            self.components.set(KEYBOARD, ComponentState::Stopped);
        }

        match timeout(limit, ranging).await {
            Ok(Ok(_sensor)) => {
                self.components.set(RANGING, ComponentState::Stopped);
                info!("{} component stopped", RANGING);
            }
            Ok(Err(e)) => {
                self.components.set(RANGING, ComponentState::Failed);
                error!("Ranging task failed: {}", e);
                exit_code = 1;
            }
            Err(_) => {
                self.components.set(RANGING, ComponentState::Failed);
                error!("Ranging task did not stop within {:?}", limit);
                exit_code = 1;
            }
        }

        if let Some(reporter) = reporter {
            if timeout(limit, reporter).await.is_err() {
                error!("Console reporter did not stop within {:?}", limit);
            }
        }
        self.components.set(REPORTER, ComponentState::Stopped);
        self.components.set(GESTURES, ComponentState::Stopped);

        if self.teardown_hardware(&guard) != 0 {
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }

    /// Release lines and stop the camera, recording the result per component
    pub(super) fn teardown_hardware(&self, guard: &HardwareGuard) -> i32 {
        match guard.teardown() {
            Ok(()) => {
                self.components.set(CAMERA, ComponentState::Stopped);
                self.components.set(GPIO, ComponentState::Stopped);
                0
            }
            Err(e) => {
                error!("Hardware teardown failed: {}", e);
                self.components.set(CAMERA, ComponentState::Failed);
                self.components.set(GPIO, ComponentState::Failed);
                1
            }
        }
    }
}
