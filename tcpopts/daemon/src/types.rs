//! Userspace type definitions
//!
//! ## Organization
//!
//! - **Kernel Types**: constants shared with the XDP program (from tcpopts_common)
//! - **Userspace Types**: aggregated counters and the exported report

use serde::{Deserialize, Serialize};

use crate::{attach::AttachMode, interface::Interface};

// ============================================================================
// Kernel Types (from the XDP program)
// ============================================================================

pub mod kernel {
    //! Values shared between the XDP program and userspace
    //!
    //! Re-exported from the tcpopts-common crate; the STATS map layout
    //! depends on them.

    pub use tcpopts_common::constants;
}

use kernel::constants::*;

/// Frame parser counters, summed over all CPUs
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames seen by the XDP program
    pub frames: u64,
    /// Frames dropped for a truncated mandatory header
    pub truncated: u64,
    /// Non-IPv4 frames passed through
    pub not_ipv4: u64,
    /// IPv4 non-TCP frames passed through
    pub not_tcp: u64,
    /// TCP segments without options
    pub no_options: u64,
    /// TCP segments whose options were scanned
    pub options_scanned: u64,
    /// Segments where the timestamp payload was located
    pub timestamps_found: u64,
}

impl ParserStats {
    /// Build from per-slot totals indexed by the STAT_* constants
    pub fn from_counters(counters: &[u64]) -> Self {
        let at = |index: u32| counters.get(index as usize).copied().unwrap_or(0);

        Self {
            frames: at(STAT_FRAMES),
            truncated: at(STAT_TRUNCATED),
            not_ipv4: at(STAT_NOT_IPV4),
            not_tcp: at(STAT_NOT_TCP),
            no_options: at(STAT_NO_OPTIONS),
            options_scanned: at(STAT_OPTIONS_SCANNED),
            timestamps_found: at(STAT_TIMESTAMPS_FOUND),
        }
    }

    /// Frames passed on to the network stack
    pub fn passed(&self) -> u64 {
        self.frames.saturating_sub(self.truncated)
    }

    /// Share of scanned TCP segments that carried timestamps, in percent
    pub fn timestamp_ratio(&self) -> f64 {
        if self.options_scanned == 0 {
            return 0.0;
        }
        self.timestamps_found as f64 * 100.0 / self.options_scanned as f64
    }
}

/// Summary written at shutdown
#[derive(Serialize, Debug, Clone)]
pub struct StatsReport {
    /// ISO 8601 timestamp when the report was generated
    pub timestamp: String,
    /// Interface the program was attached to
    pub interface: Interface,
    /// Mode the attachment ended up in
    pub mode: AttachMode,
    /// Seconds between attach and shutdown
    pub duration_seconds: u64,
    pub stats: ParserStats,
}

impl StatsReport {
    pub fn new(interface: Interface, mode: AttachMode, duration_seconds: u64, stats: ParserStats) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            interface,
            mode,
            duration_seconds,
            stats,
        }
    }
}
