//! RF Decoder - reads demodulated packets and prints decoded device readings
//!
//! Packets arrive one per line in row notation, from a file, stdin or an
//! external demodulator. A pool of worker threads runs the device decoders
//! and every reading is printed as JSON or as labelled key/value pairs.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rf_decoder::config::{Config, OutputFormat};
use rf_decoder::decoder;
use rf_decoder::pipeline::{DecodePool, DecodedEvent, PoolConfig};
use rf_decoder::reading::Reading;
use rf_decoder::runner::PacketSource;
use rf_decoder::stats::DecodeStats;

/// One line of JSON output
#[derive(Serialize)]
struct OutputRecord<'a> {
    time: String,
    decoder: &'a str,
    #[serde(flatten)]
    reading: &'a Reading,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stdout carries readings, so logs go to stderr)
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   RF Decoder - ISM-band device decoders");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Input: {:?}", config.input());
    info!("  Workers: {}", config.workers);
    info!("  Mode: {:?}", config.decode_mode());
    info!("  Output: {:?}", config.output_format);
    info!(
        "  Decoders: {} registered, {} enabled by default",
        decoder::decoders().len(),
        decoder::enabled_decoders().count()
    );

    let stats = Arc::new(DecodeStats::new());

    let pool_config = PoolConfig {
        workers: config.workers,
        mode: config.decode_mode(),
        verbose: config.verbose,
    };
    let (pool, event_rx) = DecodePool::start(pool_config, stats.clone())?;

    // Feed the pool from the packet source; the sender drops when input ends
    let source = PacketSource::new(config.input(), stats.clone());
    let packet_tx = pool.sender();
    let source_handle = tokio::spawn(async move {
        if let Err(e) = source.run(packet_tx).await {
            error!("Packet source failed: {:#}", e);
        }
    });

    let stats_interval = Duration::from_secs(config.stats_interval_secs.max(1));
    let mut last_stats_report = Instant::now();
    let mut events_printed = 0u64;

    // Shut the pool's own sender so the event channel closes once input is drained
    let workers = tokio::task::spawn_blocking(move || pool.shutdown());

    loop {
        match event_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(event) => {
                print_event(&event, config.output_format);
                events_printed += 1;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // No reading, continue with periodic tasks
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("All decode workers finished");
                break;
            }
        }

        if last_stats_report.elapsed() >= stats_interval {
            info!("[Stats] {}", stats);
            last_stats_report = Instant::now();
        }
    }

    if let Err(e) = source_handle.await {
        warn!("Packet source task ended abnormally: {}", e);
    }
    if let Err(e) = workers.await {
        warn!("Decode pool shutdown failed: {}", e);
    }

    info!("[Stats] {}", stats);
    info!("Shutdown complete. Readings printed: {}", events_printed);
    Ok(())
}

fn print_event(event: &DecodedEvent, format: OutputFormat) {
    let time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    match format {
        OutputFormat::Json => {
            let record = OutputRecord {
                time,
                decoder: event.decoder,
                reading: &event.reading,
            };
            match serde_json::to_string(&record) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize reading: {}", e),
            }
        }
        OutputFormat::Kv => println!("{}", render_kv(&time, &event.reading)),
    }
}

/// `time: ...  model: ...  Label: value ...` on one line
fn render_kv(time: &str, reading: &Reading) -> String {
    let mut line = format!("time: {}", time);
    for field in reading.fields() {
        let name = match field.display_name() {
            "" => field.key,
            name => name,
        };
        line.push_str(&format!("  {}: {}", name, field.render()));
    }
    line
}
