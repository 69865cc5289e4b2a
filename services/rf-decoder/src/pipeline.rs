//! Decode worker pool
//!
//! Packets come in over a bounded crossbeam channel, a fixed set of worker
//! threads offers each one to the selected decoders, and every reading goes
//! out on a second channel. Workers share nothing but the statistics.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::bitbuffer::Packet;
use crate::decoder::{
    self, DecodeContext, DecodeMode, DecoderInfo, Diagnostics, NoDiagnostics, TracingDiagnostics,
};
use crate::reading::Reading;
use crate::stats::DecodeStats;

/// Channel capacity per direction
const QUEUE_DEPTH: usize = 1000;

/// One packet read from the input, optionally routed to a single decoder
#[derive(Debug, Clone, PartialEq)]
pub struct InputPacket {
    pub decoder: Option<String>,
    pub packet: Packet,
}

/// A reading together with the decoder that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub decoder: &'static str,
    pub reading: Reading,
}

/// Pool settings
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub workers: usize,
    pub mode: DecodeMode,
    pub verbose: bool,
}

/// Offer one packet to its decoder, or to every default decoder.
///
/// Each decoder's verdict is counted; only readings are returned.
pub fn decode_packet(
    input: &InputPacket,
    ctx: &DecodeContext<'_>,
    stats: &DecodeStats,
) -> Vec<DecodedEvent> {
    let selected: Vec<&'static DecoderInfo> = match &input.decoder {
        Some(key) => match decoder::find(key) {
            Some(info) => vec![info],
            None => {
                warn!("No decoder named '{}'", key);
                stats.record_unknown_decoder();
                return Vec::new();
            }
        },
        None => decoder::enabled_decoders().collect(),
    };

    let mut events = Vec::new();
    for info in selected {
        let result = info.decode(&input.packet, ctx);
        stats.record_result(&result);
        match result.into_reading() {
            Some(reading) => events.push(DecodedEvent {
                decoder: info.key,
                reading,
            }),
            None => continue,
        }
    }
    events
}

/// Running worker pool
pub struct DecodePool {
    input_tx: Sender<InputPacket>,
    workers: Vec<JoinHandle<()>>,
}

impl DecodePool {
    /// Spawn the workers and return the pool with the event receiver
    pub fn start(config: PoolConfig, stats: Arc<DecodeStats>) -> Result<(Self, Receiver<DecodedEvent>)> {
        let (input_tx, input_rx) = bounded::<InputPacket>(QUEUE_DEPTH);
        let (event_tx, event_rx) = bounded::<DecodedEvent>(QUEUE_DEPTH);

        let count = config.workers.max(1);
        info!("Starting {} decode worker(s), mode {:?}", count, config.mode);

        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let input_rx = input_rx.clone();
            let event_tx = event_tx.clone();
            let stats = stats.clone();
            let handle = thread::Builder::new()
                .name(format!("decode-{}", id))
                .spawn(move || run_worker(config, input_rx, event_tx, stats))
                .context("Failed to spawn decode worker")?;
            workers.push(handle);
        }

        Ok((Self { input_tx, workers }, event_rx))
    }

    /// Handle for feeding packets into the pool
    pub fn sender(&self) -> Sender<InputPacket> {
        self.input_tx.clone()
    }

    /// Close the input side and wait for the workers to drain it
    pub fn shutdown(self) {
        drop(self.input_tx);
        for handle in self.workers {
            if handle.join().is_err() {
                warn!("Decode worker panicked");
            }
        }
    }
}

/// Worker loop (runs in its own thread until the input channel closes)
fn run_worker(
    config: PoolConfig,
    input_rx: Receiver<InputPacket>,
    event_tx: Sender<DecodedEvent>,
    stats: Arc<DecodeStats>,
) {
    let diagnostics: &dyn Diagnostics = if config.verbose {
        &TracingDiagnostics
    } else {
        &NoDiagnostics
    };
    let ctx = DecodeContext::new(diagnostics, config.mode);

    for input in input_rx.iter() {
        for event in decode_packet(&input, &ctx, &stats) {
            if event_tx.send(event).is_err() {
                debug!("Event channel closed, worker exiting");
                return;
            }
        }
    }
}
