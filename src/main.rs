use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use gesture_engine::{FrameInput, GestureEngineConfig, GestureManager, OutputDispatcher};

#[derive(Parser, Debug)]
#[command(name = "gesture-engine")]
#[command(about = "Classify hand gestures from a stream of hand-landmark frames")]
#[command(version)]
#[command(long_about = "Reads one JSON frame per line, each listing the visible hands and their \
21 landmarks, and runs every frame through the gesture detectors. Detected gestures and \
trajectory updates are logged and optionally forwarded to a TCP consumer.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gesture_engine.toml", help = "Path to TOML configuration file")]
    config: String,

    /// JSON-lines frame input
    #[arg(short, long, default_value = "-", help = "Frame input file, or - for stdin")]
    input: String,

    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    #[arg(long, value_name = "DIR", help = "Also write logs to a timestamped file in this directory")]
    log_dir: Option<PathBuf>,

    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    #[arg(long, help = "Print the effective configuration in TOML format and exit")]
    print_config: bool,

    #[arg(long, help = "Build the detectors and output without reading any frames")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args)?;

    info!("Starting gesture engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match GestureEngineConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }
    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let dispatcher = Arc::new(
        OutputDispatcher::from_config(&config.output).context("Failed to start event output")?,
    );
    let mut manager = GestureManager::from_config(&config, dispatcher.clone());

    if args.dry_run {
        info!(
            "Dry run: {} detectors ready, socket output {}",
            manager.detectors().len(),
            if dispatcher.has_transport() { "enabled" } else { "disabled" }
        );
        println!("✓ Dry run completed successfully");
        dispatcher.shutdown();
        return Ok(());
    }

    let reader = open_input(&args.input).await?;
    let result = run(reader, &mut manager).await;

    dispatcher.shutdown();
    log_summary(&manager, &dispatcher, config.output.socket_output);
    result
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin>> {
    if input == "-" {
        info!("Reading frames from stdin");
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open frame input {}", input))?;
    info!("Reading frames from {}", input);
    Ok(Box::new(BufReader::new(file)))
}

async fn run(reader: Box<dyn AsyncBufRead + Unpin>, manager: &mut GestureManager) -> Result<()> {
    let mut lines = reader.lines();
    let mut line_number = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read frame input")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        };
        let Some(line) = line else {
            info!("End of frame input");
            break;
        };

        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match FrameInput::parse_line(&line) {
            Ok(frame) => {
                let events = manager.process_frame(&frame.hands);
                if !events.is_empty() {
                    debug!("Line {}: {} events", line_number, events.len());
                }
            }
            Err(e) => warn!("Skipping malformed frame on line {}: {}", line_number, e),
        }
    }

    Ok(())
}

fn log_summary(manager: &GestureManager, dispatcher: &OutputDispatcher, socket_output: bool) {
    let stats = manager.stats();
    info!(
        "Processed {} frames ({} hands, {:.1} fps average)",
        stats.frames_processed, stats.hands_observed, stats.average_fps
    );
    info!(
        "Emitted {} gesture events and {} trail updates ({:.2} per frame)",
        stats.gesture_events,
        stats.trail_events,
        stats.events_per_frame()
    );
    if stats.detector_failures > 0 || stats.malformed_hands > 0 {
        warn!(
            "{} detector failures, {} malformed hands skipped",
            stats.detector_failures, stats.malformed_hands
        );
    }
    info!("{} hands lost", stats.hands_lost);

    if socket_output {
        let output = dispatcher.stats();
        info!(
            "Socket output: {} delivered, {} failed, {} trail updates dropped",
            output.delivered, output.failed, output.trails_dropped
        );
    }
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Console event lines are logged at info by the output module
    let default_directives = if log_level == "warn" {
        "gesture_engine=warn,gesture_engine::output=info".to_string()
    } else {
        format!("gesture_engine={}", log_level)
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = format!(
                "gesture_engine_{}.log",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            );
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}
