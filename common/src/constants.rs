//! Shared constants for the tcpopts XDP program
//!
//! These constants are used by both the kernel program and the userspace
//! loader so both sides agree on protocol numbers and stat slots.

// ============================================================================
// Link / Network Layer
// ============================================================================

/// EtherType for IPv4 (from linux/if_ether.h)
pub const ETH_P_IP: u16 = 0x0800;

/// TCP protocol number (from linux/in.h)
pub const IPPROTO_TCP: u8 = 6;

// ============================================================================
// TCP Options
// ============================================================================

/// End of option list
pub const TCPOPT_EOL: u8 = 0x00;

/// No-operation, used for padding
pub const TCPOPT_NOP: u8 = 0x01;

/// Timestamps option (RFC 7323)
pub const TCPOPT_TIMESTAMP: u8 = 0x08;

/// Offset from the timestamp option kind byte to its payload (kind + length)
pub const TCPOPT_TIMESTAMP_PAYLOAD_OFFSET: usize = 2;

/// Size of the timestamp payload: TSval followed by TSecr
pub const TCPOPT_TIMESTAMP_PAYLOAD_LEN: usize = 8;

/// Maximum size of the TCP options region (doff = 15)
pub const TCP_OPTIONS_MAX_LEN: usize = 40;

// ============================================================================
// Statistics Counter Indices (for STATS map)
// ============================================================================

/// Total number of frames seen by the XDP program
pub const STAT_FRAMES: u32 = 0;

/// Frames dropped because a mandatory header was truncated
pub const STAT_TRUNCATED: u32 = 1;

/// Frames that were not IPv4
pub const STAT_NOT_IPV4: u32 = 2;

/// IPv4 frames that were not TCP
pub const STAT_NOT_TCP: u32 = 3;

/// TCP segments without options
pub const STAT_NO_OPTIONS: u32 = 4;

/// TCP segments whose options were scanned
pub const STAT_OPTIONS_SCANNED: u32 = 5;

/// TCP segments where the timestamp payload was located
pub const STAT_TIMESTAMPS_FOUND: u32 = 6;

/// Total number of statistics counters
pub const MAX_STATS: u32 = 7;

// ============================================================================
// Loader Defaults
// ============================================================================

/// Object file loaded when no path is given
pub const DEFAULT_OBJECT_PATH: &str = "/etc/tcpopts/xdp.o";

/// Name of the XDP function inside the object file
pub const DEFAULT_PROGRAM_NAME: &str = "tcp_timestamps";

/// Name of the per-CPU statistics map inside the object file
pub const STATS_MAP_NAME: &str = "STATS";
