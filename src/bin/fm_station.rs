//! FM station runner
//! Loads a station configuration, starts the transmitter and runs the
//! periodic status poll a fixed number of times before powering down.
//!
//! No hardware transport ships with this crate, so the station runs on the
//! in-memory chip; the full command sequence is visible with RUST_LOG=debug.

use si4713_rs::{Device, LogSink, MockBus, RawConfig, Si4713, StartOutcome};
use std::env;
use std::time::Duration;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

const DEFAULT_POLLS: u32 = 3;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <config.json> [--polls N]", program);
    eprintln!("Example: {} station.json --polls 10", program);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("fm-station");

    let mut config_path = None;
    let mut polls = DEFAULT_POLLS;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--polls" => {
                let value = rest.next().unwrap_or_else(|| usage(program));
                polls = value
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid poll count {:?}: {}", value, e))?;
            }
            "-h" | "--help" => usage(program),
            path if config_path.is_none() => config_path = Some(path.to_string()),
            _ => usage(program),
        }
    }
    let config_path = config_path.unwrap_or_else(|| usage(program));

    tracing::info!("Loading station configuration from {}", config_path);
    let mut raw = RawConfig::from_json_file(&config_path)?;
    raw.log = Some(LogSink::tracing());

    let bus = MockBus::new();
    let mut radio = Si4713::from_raw(bus.clone(), raw)?;
    for notice in radio.config().notices() {
        tracing::debug!("Configuration notice: {}", notice.message());
    }

    match radio.start().await? {
        StartOutcome::StoppedAfterScan => {
            tracing::info!(
                "Scan finished with {} samples, not transmitting",
                radio.last_scan().len()
            );
            return Ok(());
        }
        StartOutcome::Broadcasting => {}
    }

    // interval() rejects a zero period
    let period = radio
        .config()
        .timing()
        .poll_interval
        .max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(period);
    for tick in 1..=polls {
        interval.tick().await;
        if let Some(report) = radio.poll().await? {
            tracing::info!(
                "Poll {}/{}: input level {} dBfs, RDS FIFO used {}",
                tick,
                polls,
                report.asq.input_level,
                report.rds_buffer.fifo_used
            );
        }
    }

    radio.halt().await?;
    tracing::info!("{} bus transactions", bus.events().len());
    Ok(())
}
