//! Power telemetry sensor CLI.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use corepwr_common::record::PowerRecord;
use corepwr_common::wire::Sample;
use corepwr_common::{LogConfig, init_logging};
use corepwr_sensor::config::{DEFAULT_BASE_DIR, DEFAULT_REGISTER_LEAF};
use corepwr_sensor::sensor::{MsrPowerSensor, Sensor};
use corepwr_sensor::store::{LogSink, MemoryLogSink};
use corepwr_sensor::SensorConfig;
use tracing::warn;

#[derive(Parser)]
#[command(name = "corepwr", about = "Per-core power telemetry sensor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample per-core power and print the decoded records
    Collect {
        /// Directory holding one register subdirectory per core
        #[arg(long, default_value = DEFAULT_BASE_DIR)]
        base_dir: PathBuf,

        /// Register file name inside each core directory
        #[arg(long, default_value = DEFAULT_REGISTER_LEAF)]
        leaf: String,

        /// Override the hostname recorded in each sample
        #[arg(long)]
        hostname: Option<String>,

        /// Number of sampling ticks to run
        #[arg(long, default_value_t = 1)]
        ticks: u32,

        /// Delay between ticks in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Output format (json or pretty)
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Also persist records to this SQLite database
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("info").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Collect {
            base_dir,
            leaf,
            hostname,
            ticks,
            interval_ms,
            format,
            database,
        } => collect(base_dir, leaf, hostname, ticks, interval_ms, format, database),
    }
}

fn collect(
    base_dir: PathBuf,
    leaf: String,
    hostname: Option<String>,
    ticks: u32,
    interval_ms: u64,
    format: OutputFormat,
    database: Option<PathBuf>,
) -> Result<()> {
    let mut config = SensorConfig::new()
        .with_base_dir(base_dir)
        .with_register_leaf(leaf);
    if let Some(hostname) = hostname {
        config = config.with_hostname(hostname);
    }

    let sink: Box<dyn LogSink> = match database {
        #[cfg(feature = "storage")]
        Some(path) => Box::new(
            corepwr_sensor::store::SqliteLogSink::open(&path)
                .with_context(|| format!("opening database {}", path.display()))?,
        ),
        #[cfg(not(feature = "storage"))]
        Some(_) => anyhow::bail!("this build has no storage support; rebuild with --features storage"),
        None => Box::new(MemoryLogSink::new()),
    };

    let mut sensor = MsrPowerSensor::new(config, sink);
    sensor
        .init()
        .context("power sensor failed to initialize")?;

    for tick in 0..ticks {
        if tick > 0 {
            std::thread::sleep(Duration::from_millis(interval_ms));
        }

        let Some(buf) = sensor.sample() else {
            continue;
        };

        // Play the consuming node too: decode for display, then feed the
        // sink through the sensor's own log path. A mid-pass eviction leaves
        // the buffer undecodable; that tick is dropped, as the consumer
        // would drop it.
        let sample = match Sample::decode(&buf) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(error = %err, "tick produced an undecodable sample, dropping");
                continue;
            }
        };
        let record = PowerRecord::from_sample(&sample);
        let output = match format {
            OutputFormat::Json => record.to_json()?,
            OutputFormat::Pretty => record.to_json_pretty()?,
        };
        println!("{output}");

        sensor.log(&buf);
    }

    Ok(())
}
