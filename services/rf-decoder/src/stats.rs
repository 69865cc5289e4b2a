//! Decode statistics shared between the reader, the workers and the main loop

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::decoder::DecodeResult;
use crate::error::Rejection;

/// Counters for one run (atomic for thread-safe access)
#[derive(Debug, Default)]
pub struct DecodeStats {
    pub packets_received: AtomicU64,
    pub parse_errors: AtomicU64,
    pub unknown_decoder: AtomicU64,
    pub readings: AtomicU64,
    pub no_event: AtomicU64,
    pub abort_early: AtomicU64,
    pub abort_length: AtomicU64,
    pub pattern_not_found: AtomicU64,
    pub fail_sanity: AtomicU64,
    pub fail_integrity: AtomicU64,
}

impl DecodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_packet(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_decoder(&self) {
        self.unknown_decoder.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one decoder's verdict on one packet
    pub fn record_result(&self, result: &DecodeResult) {
        let counter = match result {
            DecodeResult::Emit(_) => &self.readings,
            DecodeResult::NoEvent => &self.no_event,
            DecodeResult::Rejected(Rejection::AbortEarly) => &self.abort_early,
            DecodeResult::Rejected(Rejection::AbortLength) => &self.abort_length,
            DecodeResult::Rejected(Rejection::PatternNotFound) => &self.pattern_not_found,
            DecodeResult::Rejected(Rejection::FailSanity) => &self.fail_sanity,
            DecodeResult::Rejected(Rejection::FailIntegrity) => &self.fail_integrity,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_packets(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    pub fn get_readings(&self) -> u64 {
        self.readings.load(Ordering::Relaxed)
    }

    pub fn get_parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// Rejections of every kind
    pub fn get_rejections(&self) -> u64 {
        [
            &self.abort_early,
            &self.abort_length,
            &self.pattern_not_found,
            &self.fail_sanity,
            &self.fail_integrity,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }
}

impl fmt::Display for DecodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        write!(
            f,
            "packets={} readings={} no_event={} rejected={} (early={} length={} pattern={} sanity={} integrity={}) parse_errors={} unknown_decoder={}",
            self.get_packets(),
            self.get_readings(),
            load(&self.no_event),
            self.get_rejections(),
            load(&self.abort_early),
            load(&self.abort_length),
            load(&self.pattern_not_found),
            load(&self.fail_sanity),
            load(&self.fail_integrity),
            self.get_parse_errors(),
            load(&self.unknown_decoder),
        )
    }
}
