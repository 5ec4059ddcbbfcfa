use super::*;
use crate::camera::{DeviceCounters, SyntheticCamera, SyntheticPattern};
use crate::collaborators::{
    BoundingBox, IdentityLabels, MockFaceRecognizer, MockSpeech, MockTextRecognizer, Prediction,
};
use crate::config::GlassesConfig;
use crate::dispatch::Collaborators;
use crate::events::GlassesEvent;
use crate::gpio::{Level, MockGpio, MockLevel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

struct Rig {
    gpio: MockGpio,
    tap: MockLevel,
    counters: Arc<DeviceCounters>,
    hardware: HardwareSetup,
}

fn test_config() -> GlassesConfig {
    let mut config = GlassesConfig::default();
    config.camera.warmup_ms = 0;
    config.camera.resolution = (32, 16);
    config
}

fn rig(config: &GlassesConfig) -> Rig {
    let gpio = MockGpio::new();
    let tap = gpio.input_level(config.gpio.tap_pin);
    let camera = SyntheticCamera::new(32, 16, SyntheticPattern::Gradient);
    let counters = camera.counters();

    Rig {
        hardware: HardwareSetup {
            gpio: Box::new(gpio.clone()),
            camera: Box::new(camera),
        },
        gpio,
        tap,
        counters,
    }
}

fn collaborators(faces: MockFaceRecognizer) -> Collaborators {
    Collaborators {
        ocr: Arc::new(MockTextRecognizer::returning("hello")),
        speech: Arc::new(MockSpeech::new()),
        faces: Arc::new(faces),
        labels: IdentityLabels::default(),
    }
}

fn supervisor(config: GlassesConfig) -> Supervisor {
    Supervisor::new(config, collaborators(MockFaceRecognizer::new(Vec::new())))
}

async fn interrupt_after(delay: Duration) -> ShutdownReason {
    tokio::time::sleep(delay).await;
    ShutdownReason::Signal("SIGINT".to_string())
}

fn assert_torn_down_once(gpio: &MockGpio, counters: &DeviceCounters) {
    assert_eq!(gpio.cleanup_count(), 1);
    assert_eq!(counters.starts(), 1);
    assert_eq!(counters.stops(), 1);
}

#[tokio::test]
async fn test_interrupt_while_polling_tears_down_once() {
    let config = test_config();
    let rig = rig(&config);
    let supervisor = supervisor(config);

    let report = supervisor
        .run(rig.hardware, interrupt_after(Duration::from_millis(150)))
        .await
        .unwrap();

    assert_eq!(report.reason, ShutdownReason::Signal("SIGINT".to_string()));
    assert_eq!(report.exit_code, 0);
    assert_eq!(rig.gpio.cleanup_count(), 1);
    assert_eq!(rig.counters.starts(), 1);
    assert_eq!(rig.counters.stops(), 1);

    for (component, state) in supervisor.components().snapshot() {
        assert_eq!(state, ComponentState::Stopped, "component {}", component);
    }
}

#[tokio::test]
async fn test_interrupt_during_ranging() {
    let mut config = test_config();
    config.ranging.interval_ms = 1;
    let rig = rig(&config);

    // Echo stuck high: every cycle sits in the falling-edge wait
    let echo_reads = Arc::new(AtomicUsize::new(0));
    let reads = Arc::clone(&echo_reads);
    rig.gpio.script_input(config.gpio.echo_pin, move || {
        reads.fetch_add(1, Ordering::SeqCst);
        Level::High
    });

    let supervisor = supervisor(config);
    let started = Instant::now();
    let report = supervisor
        .run(rig.hardware, interrupt_after(Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(report.exit_code, 0);
    assert!(echo_reads.load(Ordering::SeqCst) > 0);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(rig.gpio.cleanup_count(), 1);
    assert_eq!(rig.counters.stops(), 1);
}

#[tokio::test]
async fn test_interrupt_during_in_flight_action() {
    let config = test_config();
    let rig = rig(&config);
    rig.tap.set(Level::High);

    let faces = MockFaceRecognizer::new(vec![BoundingBox::new(0, 0, 8, 8)])
        .with_latency(Duration::from_secs(10));
    let supervisor = Supervisor::new(config, collaborators(faces.clone()));

    let started = Instant::now();
    let report = supervisor
        .run(rig.hardware, interrupt_after(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(faces.detect_calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_torn_down_once(&rig.gpio, &rig.counters);
}

#[tokio::test]
async fn test_tap_runs_face_identification() {
    let config = test_config();
    let rig = rig(&config);

    let faces = MockFaceRecognizer::new(vec![BoundingBox::new(0, 0, 8, 8)]).with_predictions(
        vec![Prediction {
            label: 1,
            confidence: 20.0,
        }],
    );
    let supervisor = Supervisor::new(config, collaborators(faces));
    let mut events = supervisor.event_bus().subscribe();

    let tap = rig.tap.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        tap.set(Level::High);
        tokio::time::sleep(Duration::from_millis(50)).await;
        tap.set(Level::Low);
    });

    let report = supervisor
        .run(rig.hardware, interrupt_after(Duration::from_millis(400)))
        .await
        .unwrap();
    assert_eq!(report.exit_code, 0);

    let mut recognized = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let GlassesEvent::FaceRecognized { name, .. } = event {
            recognized.push(name);
        }
    }
    assert_eq!(recognized, vec!["Person1".to_string()]);
}

#[tokio::test]
async fn test_shutdown_request_on_bus_stops_run() {
    let config = test_config();
    let rig = rig(&config);
    let supervisor = supervisor(config);

    let bus = supervisor.event_bus();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = bus.publish(GlassesEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "test".to_string(),
        });
    });

    let report = supervisor
        .run(rig.hardware, std::future::pending())
        .await
        .unwrap();

    assert_eq!(report.reason, ShutdownReason::UserRequest);
    assert_torn_down_once(&rig.gpio, &rig.counters);
}

#[tokio::test]
async fn test_interrupt_during_camera_warmup_tears_down() {
    let mut config = test_config();
    config.camera.warmup_ms = 5_000;
    let rig = rig(&config);
    let supervisor = supervisor(config);

    let started = Instant::now();
    let report = supervisor
        .run(rig.hardware, interrupt_after(Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(report.reason, ShutdownReason::Signal("SIGINT".to_string()));
    assert_eq!(report.exit_code, 0);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_torn_down_once(&rig.gpio, &rig.counters);
    assert!(rig.gpio.claimed_pins().is_empty());
}

#[tokio::test]
async fn test_interrupt_during_camera_start_waits_and_stops() {
    let config = test_config();
    let gpio = MockGpio::new();
    let camera = SyntheticCamera::new(32, 16, SyntheticPattern::Gradient)
        .with_start_delay(Duration::from_millis(300));
    let counters = camera.counters();
    let hardware = HardwareSetup {
        gpio: Box::new(gpio.clone()),
        camera: Box::new(camera),
    };
    let supervisor = supervisor(config);

    let report = supervisor
        .run(hardware, interrupt_after(Duration::from_millis(50)))
        .await
        .unwrap();

    assert_eq!(report.exit_code, 0);
    assert_torn_down_once(&gpio, &counters);
}

#[tokio::test]
async fn test_init_failure_is_fatal_after_teardown() {
    let config = test_config();
    let rig = rig(&config);
    rig.gpio.fail_claim(config.gpio.tap_pin);
    let supervisor = supervisor(config);

    let result = supervisor
        .run(rig.hardware, interrupt_after(Duration::from_secs(5)))
        .await;

    assert!(result.is_err());
    assert_eq!(rig.gpio.cleanup_count(), 1);
    assert_eq!(rig.counters.starts(), 0);
    assert_eq!(
        supervisor.components().get("gpio"),
        Some(ComponentState::Failed)
    );
}

#[tokio::test]
async fn test_dry_run_initializes_and_tears_down() {
    let config = test_config();
    let rig = rig(&config);
    let supervisor = supervisor(config);

    let report = supervisor.dry_run(rig.hardware).await.unwrap();
    assert_eq!(report.exit_code, 0);
    assert_torn_down_once(&rig.gpio, &rig.counters);
    assert_eq!(rig.gpio.claim_history(), vec![23, 24, 17]);
    assert!(rig.gpio.claimed_pins().is_empty());
}

#[tokio::test]
async fn test_guard_teardown_is_idempotent() {
    let config = test_config();
    let rig = rig(&config);

    let guard = HardwareGuard::new(rig.hardware);
    guard.camera().start(Duration::ZERO).await.unwrap();

    guard.teardown().unwrap();
    guard.teardown().unwrap();
    drop(guard);

    assert_torn_down_once(&rig.gpio, &rig.counters);
}

#[tokio::test]
async fn test_guard_drop_tears_down() {
    let config = test_config();
    let rig = rig(&config);

    {
        let guard = HardwareGuard::new(rig.hardware);
        guard.camera().start(Duration::ZERO).await.unwrap();
        assert!(!guard.is_torn_down());
    }

    assert_torn_down_once(&rig.gpio, &rig.counters);
}

#[test]
fn test_console_lines() {
    assert_eq!(
        console_line(&GlassesEvent::proximity_alert(12.0)).as_deref(),
        Some("[ALERT] Object too close!")
    );
    assert_eq!(
        console_line(&GlassesEvent::FaceRecognized {
            name: "Person2".to_string(),
            confidence: 55.5
        })
        .as_deref(),
        Some("Recognized: Person2 (Confidence: 55.50)")
    );
    assert_eq!(
        console_line(&GlassesEvent::UnknownFace).as_deref(),
        Some("Face detected: Unknown")
    );
    assert_eq!(
        console_line(&GlassesEvent::NoTextFound).as_deref(),
        Some("No text found.")
    );
    assert_eq!(
        console_line(&GlassesEvent::TextNarrated {
            text: "Exit".to_string()
        })
        .as_deref(),
        Some("Speaking: Exit")
    );
    assert_eq!(
        console_line(&GlassesEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "q".to_string()
        }),
        None
    );
}

#[test]
fn test_shutdown_reason_display() {
    assert_eq!(
        ShutdownReason::Signal("SIGTERM".to_string()).to_string(),
        "signal SIGTERM"
    );
    assert_eq!(ShutdownReason::UserRequest.to_string(), "user request");
}
