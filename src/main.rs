use anyhow::Result;
use clap::Parser;
use smart_glasses::app::{command_collaborators, device_hardware, simulated_hardware};
use smart_glasses::{EventBus, GlassesConfig, KeyboardTapSimulator, Supervisor};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "smart-glasses")]
#[command(about = "Assistive smart glasses controller: obstacle alerts, text narration and face identification")]
#[command(version)]
#[command(long_about = "Runs the smart glasses controller: an ultrasonic range sensor raises \
proximity alerts, a single tap identifies faces in front of the camera and a double tap \
reads text aloud. Use --simulate to run on a development machine without the board.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "smart-glasses.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without touching the hardware")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize hardware, then tear it down
    #[arg(long, help = "Claim GPIO lines and start the camera, then release everything and exit")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a daily-rolling file
    #[arg(long, value_name = "PATH", help = "Write logs to PATH, rotated daily")]
    log_file: Option<String>,

    /// Run against mock GPIO and a synthetic camera
    #[arg(long, help = "Use simulated hardware instead of GPIO and the camera")]
    simulate: bool,

    /// Drive the simulated tap button from the keyboard
    #[arg(long, requires = "simulate", help = "Keyboard tap simulator: SPACE = tap, d = double tap, q = quit")]
    keyboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting smart glasses controller v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match GlassesConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let exit_code = run(&args, config).await?;
    info!("Smart glasses exited with code: {}", exit_code);

    drop(log_guard);
    std::process::exit(exit_code);
}

async fn run(args: &Args, config: GlassesConfig) -> Result<i32> {
    let collaborators = command_collaborators(&config);
    let event_bus = if args.debug {
        EventBus::with_debug_logging(config.system.event_bus_capacity)
    } else {
        EventBus::new(config.system.event_bus_capacity)
    };

    let (hardware, keyboard) = if args.simulate {
        let simulated = simulated_hardware(&config);
        let keyboard = args
            .keyboard
            .then(|| KeyboardTapSimulator::new(event_bus.clone(), simulated.tap.clone(), &config.gesture));
        (simulated.setup, keyboard)
    } else {
        let hardware = device_hardware(&config).map_err(|e| {
            error!("Failed to open hardware: {}", e);
            e
        })?;
        (hardware, None)
    };

    let mut supervisor =
        Supervisor::with_event_bus(config, collaborators, event_bus).with_console(!args.dry_run);
    if let Some(keyboard) = keyboard {
        supervisor = supervisor.with_keyboard(keyboard);
    }

    let report = if args.dry_run {
        let report = supervisor.dry_run(hardware).await.map_err(|e| {
            error!("Dry run failed: {}", e);
            e
        })?;
        println!("✓ Dry run completed successfully - hardware initialized and released");
        report
    } else {
        supervisor.run_until_signal(hardware).await.map_err(|e| {
            error!("Failed to initialize system: {}", e);
            e
        })?
    };

    if report.exit_code != 0 {
        warn!("Shutdown ({}) reported errors", report.reason);
    }
    Ok(report.exit_code)
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
    };

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smart_glasses={}", log_level)));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };
    layers.push(fmt_layer);

    // The guard flushes the background writer; it must outlive the subscriber
    let guard = match &args.log_file {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "smart-glasses.log".into());

            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Smart glasses configuration file");
    println!("# Every key is optional; environment variables override the file,");
    println!("# e.g. GLASSES_SPEECH_LANGUAGE=es");
    println!("#");
    println!("# [gpio]     BCM pin numbers; tap_active_low for a button wired to ground");
    println!("# [ranging]  alert_distance_cm raises the proximity alert below this distance");
    println!("# [gesture]  double_tap_window_ms separates single from double taps");
    println!("# [camera]   warmup_ms is waited once after the camera starts");
    println!("# [ocr]      command is run as `<command> <image> stdout`");
    println!("# [speech]   announce_failures speaks camera and collaborator errors");
    println!("# [face]     predictions below confidence_threshold are recognized");
    println!("# [system]   work_dir holds scratch images handed to collaborators");
    println!();

    let default_config = toml::to_string_pretty(&GlassesConfig::default())?;
    println!("{}", default_config);
    Ok(())
}
