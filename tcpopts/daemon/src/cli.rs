//! Command-line configuration

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use tcpopts_common::constants::{DEFAULT_OBJECT_PATH, DEFAULT_PROGRAM_NAME};

use crate::{attach::AttachMode, error::ProbeError, exporter::ExporterType};

/// Locate TCP timestamp options on an interface with XDP
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Interface to attach the XDP program to
    #[clap(short, long)]
    pub interface: Option<String>,

    /// Path to the compiled XDP object file
    #[clap(short, long, default_value = DEFAULT_OBJECT_PATH)]
    pub obj: PathBuf,

    /// Name of the XDP program inside the object file
    #[clap(long, default_value = DEFAULT_PROGRAM_NAME)]
    pub program: String,

    /// Attachment mode (auto = native, falling back to generic)
    #[clap(short, long, value_enum, default_value_t = ModeSelection::Auto)]
    pub mode: ModeSelection,

    /// How often the idle loop checks for a shutdown request
    #[clap(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Write parser statistics to this file on shutdown
    #[clap(long)]
    pub stats_output: Option<PathBuf>,

    /// Format of the statistics file
    #[clap(long, value_enum, default_value_t = ExporterType::Json)]
    pub stats_format: ExporterType,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}

/// Which attachment modes to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeSelection {
    /// Driver mode, then generic mode
    Auto,
    /// Driver mode only
    Native,
    /// Generic (SKB) mode only
    Generic,
}

impl ModeSelection {
    /// Ordered list of modes to try
    pub fn strategies(self) -> Vec<AttachMode> {
        match self {
            ModeSelection::Auto => vec![AttachMode::Native, AttachMode::Generic],
            ModeSelection::Native => vec![AttachMode::Native],
            ModeSelection::Generic => vec![AttachMode::Generic],
        }
    }
}

impl Args {
    /// Checks clap cannot express; returns the interface name
    pub fn validate(&self) -> Result<&str, ProbeError> {
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::Argument(
                "--poll-interval-ms must be at least 1".to_string(),
            ));
        }

        match self.interface.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ProbeError::Argument(
                "missing interface argument (--interface)".to_string(),
            )),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["tcpopts", "-i", "eth0"]).unwrap();

        assert_eq!(args.validate().unwrap(), "eth0");
        assert_eq!(args.obj, PathBuf::from("/etc/tcpopts/xdp.o"));
        assert_eq!(args.program, "tcp_timestamps");
        assert_eq!(args.mode, ModeSelection::Auto);
        assert_eq!(args.poll_interval(), Duration::from_millis(500));
        assert_eq!(args.stats_format, ExporterType::Json);
        assert!(args.stats_output.is_none());
    }

    #[test]
    fn test_missing_interface() {
        let args = Args::try_parse_from(["tcpopts"]).unwrap();
        assert!(matches!(args.validate(), Err(ProbeError::Argument(_))));

        let args = Args::try_parse_from(["tcpopts", "--interface", "  "]).unwrap();
        assert!(matches!(args.validate(), Err(ProbeError::Argument(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let args =
            Args::try_parse_from(["tcpopts", "-i", "eth0", "--poll-interval-ms", "0"]).unwrap();
        assert!(matches!(args.validate(), Err(ProbeError::Argument(_))));
    }

    #[test]
    fn test_mode_selection() {
        let args = Args::try_parse_from(["tcpopts", "-i", "eth0", "--mode", "generic"]).unwrap();
        assert_eq!(args.mode.strategies(), vec![AttachMode::Generic]);
        assert_eq!(
            ModeSelection::Auto.strategies(),
            vec![AttachMode::Native, AttachMode::Generic]
        );
        assert!(Args::try_parse_from(["tcpopts", "--mode", "offload"]).is_err());
    }

    #[test]
    fn test_obj_override() {
        let args = Args::try_parse_from(["tcpopts", "-i", "eth0", "-o", "/tmp/xdp.o"]).unwrap();
        assert_eq!(args.obj, PathBuf::from("/tmp/xdp.o"));
    }
}
