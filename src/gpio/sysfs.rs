use super::line::{Bias, GpioBackend, InputLine, Level, OutputLine};
use crate::error::GpioError;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long to wait for udev to create `gpioN/` after an export
const EXPORT_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

/// GPIO backend over the Linux sysfs interface (`/sys/class/gpio`)
pub struct SysfsGpio {
    root: PathBuf,
    chip_base: u32,
    exported: Vec<u32>,
}

impl SysfsGpio {
    pub fn new<P: Into<PathBuf>>(root: P, chip_base: u32) -> Self {
        Self {
            root: root.into(),
            chip_base,
            exported: Vec::new(),
        }
    }

    fn line_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", self.chip_base + pin))
    }

    /// Export `pin` unless it is already visible, then wait for its directory
    fn export(&mut self, pin: u32) -> Result<PathBuf, GpioError> {
        let dir = self.line_dir(pin);
        if !dir.exists() {
            let number = self.chip_base + pin;
            fs::write(self.root.join("export"), number.to_string()).map_err(|e| {
                GpioError::Export {
                    pin,
                    details: e.to_string(),
                }
            })?;

            let deadline = Instant::now() + EXPORT_SETTLE_TIMEOUT;
            while !dir.join("value").exists() {
                if Instant::now() >= deadline {
                    return Err(GpioError::Export {
                        pin,
                        details: format!("{} did not appear", dir.display()),
                    });
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            debug!("Exported GPIO {} as {}", pin, dir.display());
        }

        if !self.exported.contains(&pin) {
            self.exported.push(pin);
        }
        Ok(dir)
    }

    fn write_attr(dir: &Path, attr: &str, value: &str, pin: u32) -> Result<(), GpioError> {
        fs::write(dir.join(attr), value).map_err(|e| GpioError::Direction {
            pin,
            details: format!("writing {}={}: {}", attr, value, e),
        })
    }
}

impl GpioBackend for SysfsGpio {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn claim_output(
        &mut self,
        pin: u32,
        initial: Level,
    ) -> Result<Box<dyn OutputLine>, GpioError> {
        let dir = self.export(pin)?;
        // "low"/"high" set direction and initial value atomically
        let direction = if initial.is_high() { "high" } else { "low" };
        Self::write_attr(&dir, "direction", direction, pin)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.join("value"))
            .map_err(|e| GpioError::Io {
                pin,
                details: e.to_string(),
            })?;

        info!("GPIO {} claimed as output ({:?})", pin, initial);
        Ok(Box::new(SysfsOutput { pin, file }))
    }

    fn claim_input(
        &mut self,
        pin: u32,
        bias: Bias,
        active_low: bool,
    ) -> Result<Box<dyn InputLine>, GpioError> {
        let dir = self.export(pin)?;
        Self::write_attr(&dir, "direction", "in", pin)?;
        Self::write_attr(&dir, "active_low", if active_low { "1" } else { "0" }, pin)?;

        if bias != Bias::None {
            warn!(
                "sysfs cannot configure {:?} on GPIO {}; relying on board or overlay",
                bias, pin
            );
        }

        let file = File::open(dir.join("value")).map_err(|e| GpioError::Io {
            pin,
            details: e.to_string(),
        })?;

        info!("GPIO {} claimed as input (active_low={})", pin, active_low);
        Ok(Box::new(SysfsInput { pin, file }))
    }

    fn cleanup(&mut self) -> Result<(), GpioError> {
        let mut first_error = None;

        for pin in self.exported.drain(..) {
            let number = self.chip_base + pin;
            match fs::write(self.root.join("unexport"), number.to_string()) {
                Ok(()) => debug!("Unexported GPIO {}", pin),
                Err(e) => {
                    warn!("Failed to unexport GPIO {}: {}", pin, e);
                    first_error.get_or_insert(GpioError::Io {
                        pin,
                        details: e.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct SysfsOutput {
    pin: u32,
    file: File,
}

impl OutputLine for SysfsOutput {
    fn pin(&self) -> u32 {
        self.pin
    }

    fn set_level(&mut self, level: Level) -> Result<(), GpioError> {
        let pin = self.pin;
        let io = |e: std::io::Error| GpioError::Io {
            pin,
            details: e.to_string(),
        };

        self.file.seek(SeekFrom::Start(0)).map_err(io)?;
        self.file
            .write_all(if level.is_high() { b"1" } else { b"0" })
            .map_err(io)?;
        self.file.flush().map_err(io)
    }
}

struct SysfsInput {
    pin: u32,
    file: File,
}

impl InputLine for SysfsInput {
    fn pin(&self) -> u32 {
        self.pin
    }

    fn level(&mut self) -> Result<Level, GpioError> {
        let pin = self.pin;
        let io = |e: std::io::Error| GpioError::Io {
            pin,
            details: e.to_string(),
        };

        let mut buf = [0u8; 1];
        self.file.seek(SeekFrom::Start(0)).map_err(io)?;
        self.file.read_exact(&mut buf).map_err(io)?;
        Ok(Level::from(buf[0] == b'1'))
    }
}
