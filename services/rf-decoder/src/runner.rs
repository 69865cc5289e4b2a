//! Packet source - reads row notation from a file, stdin or a demodulator subprocess

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::bitbuffer::Packet;
use crate::error::BitRowParseError;
use crate::pipeline::InputPacket;
use crate::stats::DecodeStats;

/// Where packet lines come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
    /// Shell command whose stdout carries one packet per line
    Command(String),
}

impl Input {
    /// `-` means stdin, anything else is a file path
    pub fn from_path(path: &str) -> Self {
        if path == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(path))
        }
    }
}

/// Reads packet lines and hands them to the decode pool
pub struct PacketSource {
    input: Input,
    running: Arc<AtomicBool>,
    stats: Arc<DecodeStats>,
}

impl PacketSource {
    pub fn new(input: Input, stats: Arc<DecodeStats>) -> Self {
        Self {
            input,
            running: Arc::new(AtomicBool::new(false)),
            stats,
        }
    }

    /// Read until end of input, sending every parsed packet to `tx`
    pub async fn run(&self, tx: Sender<InputPacket>) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);

        let result = match &self.input {
            Input::Stdin => {
                info!("Reading packets from stdin");
                self.read_lines(tokio::io::stdin(), &tx).await
            }
            Input::File(path) => {
                info!("Reading packets from {:?}", path);
                match tokio::fs::File::open(path).await {
                    Ok(file) => self.read_lines(file, &tx).await,
                    Err(e) => Err(e).with_context(|| format!("Failed to open {:?}", path)),
                }
            }
            Input::Command(cmd) => self.run_command(cmd, &tx).await,
        };

        self.running.store(false, Ordering::SeqCst);
        info!(
            "Packet source stopped. Packets: {}, Parse errors: {}",
            self.stats.get_packets(),
            self.stats.get_parse_errors()
        );
        result
    }

    async fn run_command(&self, cmd: &str, tx: &Sender<InputPacket>) -> Result<()> {
        let mut parts = cmd.split_whitespace();
        let program = parts.next().context("Empty demodulator command")?;
        info!("Starting demodulator: {}", cmd);

        let mut child = Command::new(program)
            .args(parts)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))?;

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture demodulator stdout")?;
        let stderr = child
            .stderr
            .take()
            .context("Failed to capture demodulator stderr")?;

        // demodulators print status to stderr, not just errors
        let name = program.to_string();
        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.is_empty() {
                    info!("{}: {}", name, line);
                }
            }
        });

        let result = self.read_lines(stdout, tx).await;

        let _ = child.kill().await;
        let _ = stderr_handle.await;
        result
    }

    async fn read_lines<R: AsyncRead + Unpin>(&self, reader: R, tx: &Sender<InputPacket>) -> Result<()> {
        let mut lines = BufReader::new(reader).lines();
        let mut first_packet = true;

        while self.running.load(Ordering::SeqCst) {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_packet_line(&line) {
                    Ok(Some(input)) => {
                        if first_packet {
                            debug!("First packet received");
                            first_packet = false;
                        }
                        self.stats.record_packet();
                        // bounded channel: wait for the workers without stalling the runtime
                        if tokio::task::block_in_place(|| tx.send(input)).is_err() {
                            warn!("Decode channel closed, stopping packet source");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.stats.record_parse_error();
                        warn!("Skipping line {:?}: {}", line, e);
                    }
                },
                Ok(None) => {
                    debug!("End of input");
                    break;
                }
                Err(e) => {
                    error!("Error reading input: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Parse one input line: `[decoder_key:] row [/ row ...]  [# comment]`.
///
/// Returns `None` for blank and comment-only lines.
pub fn parse_packet_line(line: &str) -> Result<Option<InputPacket>, BitRowParseError> {
    let line = match line.split_once('#') {
        Some((content, _)) => content,
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (decoder, rows) = match line.split_once(':') {
        Some((key, rows)) => (Some(key.trim().to_string()), rows),
        None => (None, line),
    };
    let packet: Packet = rows.parse()?;

    Ok(Some(InputPacket { decoder, packet }))
}
