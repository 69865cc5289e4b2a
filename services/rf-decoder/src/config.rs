//! Configuration loaded from environment variables

use crate::decoder::DecodeMode;
use crate::runner::Input;
use std::str::FromStr;

/// How readings are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// `label: value` pairs rendered through the format hints
    Kv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "kv" => Ok(Self::Kv),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Row-notation file, `-` for stdin
    pub input_path: String,

    /// Demodulator command to read instead of `input_path`
    pub demod_cmd: Option<String>,

    /// Decode worker threads
    pub workers: usize,

    /// Forward decoder diagnostics to the log
    pub verbose: bool,

    /// Tolerate line-code errors and attach debug fields
    pub diagnostic_mode: bool,

    pub output_format: OutputFormat,

    /// Statistics logging interval in seconds
    pub stats_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            input_path: var("DECODE_INPUT").unwrap_or_else(|| "-".to_string()),

            demod_cmd: var("DEMOD_CMD").filter(|s| !s.trim().is_empty()),

            workers: var("DECODE_WORKERS")
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(4),

            verbose: var("DECODE_VERBOSE")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),

            diagnostic_mode: var("DECODE_DIAGNOSTIC_MODE")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),

            output_format: var("OUTPUT_FORMAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),

            stats_interval_secs: var("STATS_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }

    pub fn input(&self) -> Input {
        match &self.demod_cmd {
            Some(cmd) => Input::Command(cmd.clone()),
            None => Input::from_path(&self.input_path),
        }
    }

    pub fn decode_mode(&self) -> DecodeMode {
        if self.diagnostic_mode {
            DecodeMode::Diagnostic
        } else {
            DecodeMode::Strict
        }
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        assert_eq!(config.input(), Input::Stdin);
        assert_eq!(config.workers, 4);
        assert!(!config.verbose);
        assert_eq!(config.decode_mode(), DecodeMode::Strict);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.stats_interval_secs, 10);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DECODE_INPUT", "captures.txt"),
            ("DECODE_WORKERS", "0"),
            ("DECODE_VERBOSE", "true"),
            ("DECODE_DIAGNOSTIC_MODE", "1"),
            ("OUTPUT_FORMAT", "KV"),
            ("STATS_INTERVAL_SECS", "60"),
        ]);
        assert_eq!(config.input(), Input::File(PathBuf::from("captures.txt")));
        assert_eq!(config.workers, 4);
        assert!(config.verbose);
        assert_eq!(config.decode_mode(), DecodeMode::Diagnostic);
        assert_eq!(config.output_format, OutputFormat::Kv);
        assert_eq!(config.stats_interval_secs, 60);
    }

    #[test]
    fn test_demod_cmd_wins() {
        let config = load(&[("DECODE_INPUT", "captures.txt"), ("DEMOD_CMD", "rtl_433 -R 0 -X")]);
        assert_eq!(config.input(), Input::Command("rtl_433 -R 0 -X".to_string()));

        let config = load(&[("DEMOD_CMD", "  ")]);
        assert_eq!(config.input(), Input::Stdin);
    }
}
