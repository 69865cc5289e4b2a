//! RF Decoder - protocol decoders for short-range ISM-band telemetry
//!
//! Demodulated packets come in as rows of bits; each device decoder checks
//! framing and integrity and turns a matching packet into a [`reading::Reading`].

pub mod bitbuffer;
pub mod config;
pub mod decoder;
pub mod devices;
pub mod error;
pub mod fields;
pub mod integrity;
pub mod linecode;
pub mod pipeline;
pub mod reading;
pub mod runner;
pub mod stats;
