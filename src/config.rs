use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GlassesConfig {
    pub gpio: GpioConfig,
    pub ranging: RangingConfig,
    pub gesture: GestureConfig,
    pub camera: CameraConfig,
    pub ocr: OcrConfig,
    pub speech: SpeechConfig,
    pub face: FaceConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GpioConfig {
    /// Root of the sysfs GPIO interface
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: String,

    /// Offset added to BCM numbers (non-zero on boards whose gpiochip does not start at 0)
    #[serde(default = "default_chip_base")]
    pub chip_base: u32,

    /// Ultrasonic trigger line (BCM)
    #[serde(default = "default_trigger_pin")]
    pub trigger_pin: u32,

    /// Ultrasonic echo line (BCM)
    #[serde(default = "default_echo_pin")]
    pub echo_pin: u32,

    /// Tap button line (BCM)
    #[serde(default = "default_tap_pin")]
    pub tap_pin: u32,

    /// Tap button pulls the line low when pressed
    #[serde(default = "default_tap_active_low")]
    pub tap_active_low: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RangingConfig {
    /// Delay between ranging cycles
    #[serde(default = "default_ranging_interval_ms")]
    pub interval_ms: u64,

    /// Width of the trigger pulse
    #[serde(default = "default_trigger_pulse_us")]
    pub trigger_pulse_us: u64,

    /// Bound on each echo transition wait
    #[serde(default = "default_echo_timeout_ms")]
    pub echo_timeout_ms: u64,

    /// Distances strictly below this raise a proximity alert
    #[serde(default = "default_alert_distance_cm")]
    pub alert_distance_cm: f64,

    #[serde(default = "default_speed_of_sound_cm_s")]
    pub speed_of_sound_cm_s: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GestureConfig {
    /// Presses closer together than this count towards a double tap
    #[serde(default = "default_double_tap_window_ms")]
    pub double_tap_window_ms: u64,

    /// Quiet period after a classification during which the line is not sampled
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Sleep between unpressed samples
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Settling time after the device is started
    #[serde(default = "default_camera_warmup_ms")]
    pub warmup_ms: u64,

    /// GStreamer source element description
    #[serde(default = "default_camera_pipeline")]
    pub pipeline: String,

    /// Bound on a single frame pull
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Grayscale values above this become white before OCR
    #[serde(default = "default_binarize_threshold")]
    pub binarize_threshold: u8,

    #[serde(default = "default_ocr_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_language")]
    pub language: String,

    #[serde(default = "default_synth_command")]
    pub synth_command: String,

    #[serde(default = "default_player_command")]
    pub player_command: String,

    /// Where the synthesized audio is written before playback
    #[serde(default = "default_speech_output_path")]
    pub output_path: String,

    #[serde(default = "default_speech_timeout_ms")]
    pub timeout_ms: u64,

    /// Speak a short notice when an action fails
    #[serde(default = "default_announce_failures")]
    pub announce_failures: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FaceConfig {
    #[serde(default = "default_face_helper_command")]
    pub helper_command: String,

    #[serde(default = "default_cascade_path")]
    pub cascade_path: String,

    /// Trained identity model; recognition is disabled when missing
    #[serde(default = "default_model_path")]
    pub model_path: String,

    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: u32,

    /// Predictions strictly below this confidence are accepted
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Display names indexed by label id, index 0 is "Unknown"
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    #[serde(default = "default_face_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Scratch directory for images handed to collaborators
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Bound on waiting for background tasks during shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl RangingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(self.trigger_pulse_us)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }
}

impl GestureConfig {
    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl CameraConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl FaceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SystemConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl GlassesConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("smart-glasses.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("gpio.sysfs_root", default_sysfs_root())?
            .set_default("gpio.chip_base", default_chip_base())?
            .set_default("gpio.trigger_pin", default_trigger_pin())?
            .set_default("gpio.echo_pin", default_echo_pin())?
            .set_default("gpio.tap_pin", default_tap_pin())?
            .set_default("gpio.tap_active_low", default_tap_active_low())?
            .set_default("ranging.interval_ms", default_ranging_interval_ms())?
            .set_default("ranging.trigger_pulse_us", default_trigger_pulse_us())?
            .set_default("ranging.echo_timeout_ms", default_echo_timeout_ms())?
            .set_default("ranging.alert_distance_cm", default_alert_distance_cm())?
            .set_default("ranging.speed_of_sound_cm_s", default_speed_of_sound_cm_s())?
            .set_default(
                "gesture.double_tap_window_ms",
                default_double_tap_window_ms(),
            )?
            .set_default("gesture.debounce_ms", default_debounce_ms())?
            .set_default("gesture.poll_interval_ms", default_poll_interval_ms())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.warmup_ms", default_camera_warmup_ms())?
            .set_default("camera.pipeline", default_camera_pipeline())?
            .set_default("camera.capture_timeout_ms", default_capture_timeout_ms())?
            .set_default("ocr.command", default_ocr_command())?
            .set_default("ocr.binarize_threshold", default_binarize_threshold())?
            .set_default("ocr.timeout_ms", default_ocr_timeout_ms())?
            .set_default("speech.language", default_speech_language())?
            .set_default("speech.synth_command", default_synth_command())?
            .set_default("speech.player_command", default_player_command())?
            .set_default("speech.output_path", default_speech_output_path())?
            .set_default("speech.timeout_ms", default_speech_timeout_ms())?
            .set_default("speech.announce_failures", default_announce_failures())?
            .set_default("face.helper_command", default_face_helper_command())?
            .set_default("face.cascade_path", default_cascade_path())?
            .set_default("face.model_path", default_model_path())?
            .set_default("face.scale_factor", default_scale_factor())?
            .set_default("face.min_neighbors", default_min_neighbors())?
            .set_default("face.confidence_threshold", default_confidence_threshold())?
            .set_default("face.labels", default_labels())?
            .set_default("face.timeout_ms", default_face_timeout_ms())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("system.work_dir", default_work_dir())?
            .set_default("system.shutdown_timeout_ms", default_shutdown_timeout_ms())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with GLASSES_ prefix
            .add_source(Environment::with_prefix("GLASSES").separator("_"))
            .build()?;

        let config: GlassesConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = [
            self.gpio.trigger_pin,
            self.gpio.echo_pin,
            self.gpio.tap_pin,
        ];
        if pins[0] == pins[1] || pins[0] == pins[2] || pins[1] == pins[2] {
            return Err(ConfigError::Message(
                "Trigger, echo and tap pins must be distinct".to_string(),
            ));
        }

        if self.ranging.echo_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Ranging echo_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.ranging.trigger_pulse_us == 0 {
            return Err(ConfigError::Message(
                "Ranging trigger_pulse_us must be greater than 0".to_string(),
            ));
        }

        if self.ranging.speed_of_sound_cm_s <= 0.0 {
            return Err(ConfigError::Message(
                "Speed of sound must be positive".to_string(),
            ));
        }

        if self.gesture.double_tap_window_ms == 0 {
            return Err(ConfigError::Message(
                "Gesture double_tap_window_ms must be greater than 0".to_string(),
            ));
        }

        if self.gesture.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Gesture poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.face.scale_factor <= 1.0 {
            return Err(ConfigError::Message(
                "Face scale_factor must be greater than 1.0".to_string(),
            ));
        }

        if self.face.labels.first().map(String::as_str) != Some("Unknown") {
            return Err(ConfigError::Message(
                "Face labels must start with the reserved \"Unknown\" entry".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GlassesConfig {
    fn default() -> Self {
        Self {
            gpio: GpioConfig {
                sysfs_root: default_sysfs_root(),
                chip_base: default_chip_base(),
                trigger_pin: default_trigger_pin(),
                echo_pin: default_echo_pin(),
                tap_pin: default_tap_pin(),
                tap_active_low: default_tap_active_low(),
            },
            ranging: RangingConfig {
                interval_ms: default_ranging_interval_ms(),
                trigger_pulse_us: default_trigger_pulse_us(),
                echo_timeout_ms: default_echo_timeout_ms(),
                alert_distance_cm: default_alert_distance_cm(),
                speed_of_sound_cm_s: default_speed_of_sound_cm_s(),
            },
            gesture: GestureConfig {
                double_tap_window_ms: default_double_tap_window_ms(),
                debounce_ms: default_debounce_ms(),
                poll_interval_ms: default_poll_interval_ms(),
            },
            camera: CameraConfig {
                resolution: default_camera_resolution(),
                warmup_ms: default_camera_warmup_ms(),
                pipeline: default_camera_pipeline(),
                capture_timeout_ms: default_capture_timeout_ms(),
            },
            ocr: OcrConfig {
                command: default_ocr_command(),
                binarize_threshold: default_binarize_threshold(),
                timeout_ms: default_ocr_timeout_ms(),
            },
            speech: SpeechConfig {
                language: default_speech_language(),
                synth_command: default_synth_command(),
                player_command: default_player_command(),
                output_path: default_speech_output_path(),
                timeout_ms: default_speech_timeout_ms(),
                announce_failures: default_announce_failures(),
            },
            face: FaceConfig {
                helper_command: default_face_helper_command(),
                cascade_path: default_cascade_path(),
                model_path: default_model_path(),
                scale_factor: default_scale_factor(),
                min_neighbors: default_min_neighbors(),
                confidence_threshold: default_confidence_threshold(),
                labels: default_labels(),
                timeout_ms: default_face_timeout_ms(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                work_dir: default_work_dir(),
                shutdown_timeout_ms: default_shutdown_timeout_ms(),
            },
        }
    }
}

// Default value functions
fn default_sysfs_root() -> String {
    "/sys/class/gpio".to_string()
}
fn default_chip_base() -> u32 {
    0
}
fn default_trigger_pin() -> u32 {
    23
}
fn default_echo_pin() -> u32 {
    24
}
fn default_tap_pin() -> u32 {
    17
}
fn default_tap_active_low() -> bool {
    true
}

fn default_ranging_interval_ms() -> u64 {
    1000
}
fn default_trigger_pulse_us() -> u64 {
    10
}
fn default_echo_timeout_ms() -> u64 {
    30
} // ~5 m round trip
fn default_alert_distance_cm() -> f64 {
    30.0
}
fn default_speed_of_sound_cm_s() -> f64 {
    34300.0
}

fn default_double_tap_window_ms() -> u64 {
    1000
}
fn default_debounce_ms() -> u64 {
    700
}
fn default_poll_interval_ms() -> u64 {
    10
}

fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_warmup_ms() -> u64 {
    2000
}
fn default_camera_pipeline() -> String {
    "libcamerasrc".to_string()
}
fn default_capture_timeout_ms() -> u64 {
    2000
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}
fn default_binarize_threshold() -> u8 {
    150
}
fn default_ocr_timeout_ms() -> u64 {
    15000
}

fn default_speech_language() -> String {
    "en".to_string()
}
fn default_synth_command() -> String {
    "gtts-cli".to_string()
}
fn default_player_command() -> String {
    "mpg123".to_string()
}
fn default_speech_output_path() -> String {
    "output.mp3".to_string()
}
fn default_speech_timeout_ms() -> u64 {
    30000
}
fn default_announce_failures() -> bool {
    true
}

fn default_face_helper_command() -> String {
    "face-helper".to_string()
}
fn default_cascade_path() -> String {
    "haarcascade_frontalface_default.xml".to_string()
}
fn default_model_path() -> String {
    "trainer.yml".to_string()
}
fn default_scale_factor() -> f64 {
    1.3
}
fn default_min_neighbors() -> u32 {
    5
}
fn default_confidence_threshold() -> f64 {
    80.0
}
fn default_labels() -> Vec<String> {
    vec![
        "Unknown".to_string(),
        "Person1".to_string(),
        "Person2".to_string(),
    ]
}
fn default_face_timeout_ms() -> u64 {
    10000
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_work_dir() -> String {
    "/tmp/smart-glasses".to_string()
}
fn default_shutdown_timeout_ms() -> u64 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GlassesConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gpio.tap_pin, 17);
        assert_eq!(config.ranging.echo_timeout(), Duration::from_millis(30));
        assert_eq!(config.gesture.debounce(), Duration::from_millis(700));
        assert_eq!(config.face.labels[0], "Unknown");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[gpio]\ntap_pin = 27\n\n[face]\nlabels = [\"Unknown\", \"Alice\"]\n"
        )
        .unwrap();

        let config = GlassesConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.gpio.tap_pin, 27);
        assert_eq!(config.gpio.trigger_pin, 23);
        assert_eq!(config.face.labels, vec!["Unknown", "Alice"]);
        assert_eq!(config.ranging.interval_ms, 1000);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = GlassesConfig::load_from_file("/nonexistent/smart-glasses.toml").unwrap();
        assert_eq!(config.camera.resolution, (1280, 720));
        assert_eq!(config.ocr.binarize_threshold, 150);
    }

    #[test]
    fn test_config_validation() {
        let mut config = GlassesConfig::default();

        config.gpio.echo_pin = config.gpio.trigger_pin;
        assert!(config.validate().is_err());
        config.gpio.echo_pin = 24;

        config.ranging.echo_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.ranging.echo_timeout_ms = 30;

        config.face.scale_factor = 1.0;
        assert!(config.validate().is_err());
        config.face.scale_factor = 1.3;

        config.face.labels.clear();
        assert!(config.validate().is_err());
        config.face.labels = default_labels();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_labels_must_reserve_unknown_first() {
        let mut config = GlassesConfig::default();
        config.face.labels = vec!["Alice".to_string(), "Bob".to_string()];
        assert!(config.validate().is_err());

        config.face.labels = vec!["Unknown".to_string(), "Alice".to_string()];
        assert!(config.validate().is_ok());
    }
}
