//! TCP timestamp option locator
//!
//! Walks Ethernet -> IPv4 -> TCP -> TCP options for one frame and reports
//! where the timestamp option payload sits. The parser observes traffic, it
//! does not filter it: a frame is dropped only when it is too short to hold a
//! mandatory header, everything else passes.
//!
//! ## Frame layout
//!
//! ```text
//! 0        14             14 + ihl*4        +20               +doff*4
//! | eth    | ipv4 (+opts) | tcp            | options (<= 40) | payload
//!                                          ^ cursor 0
//! ```

use crate::{
    constants::*,
    frame::Frame,
    types::{EthHdr, Ipv4Hdr, TcpHdr},
};

/// Per-frame decision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Continue normal processing
    Pass,
    /// Discard the frame
    Drop,
}

/// Where parsing stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// A mandatory header did not fit in the frame
    Truncated,
    NotIpv4,
    NotTcp,
    /// TCP header without options (doff <= 5)
    NoOptions,
    /// The options region was walked
    OptionsScanned,
}

impl Disposition {
    #[inline(always)]
    pub fn verdict(self) -> Verdict {
        match self {
            Disposition::Truncated => Verdict::Drop,
            _ => Verdict::Pass,
        }
    }

    /// Slot in the STATS map counting this disposition
    #[inline(always)]
    pub fn stat_index(self) -> u32 {
        match self {
            Disposition::Truncated => STAT_TRUNCATED,
            Disposition::NotIpv4 => STAT_NOT_IPV4,
            Disposition::NotTcp => STAT_NOT_TCP,
            Disposition::NoOptions => STAT_NO_OPTIONS,
            Disposition::OptionsScanned => STAT_OPTIONS_SCANNED,
        }
    }
}

/// Frame-relative offsets of the two timestamp words
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestampLocation {
    sender: usize,
    receiver: usize,
}

impl TimestampLocation {
    /// Offset of TSval
    #[inline(always)]
    pub fn sender_offset(&self) -> usize {
        self.sender
    }

    /// Offset of TSecr
    #[inline(always)]
    pub fn receiver_offset(&self) -> usize {
        self.receiver
    }

    /// Read both words from the frame the location was computed for
    #[inline(always)]
    pub fn values(&self, frame: &Frame<'_>) -> Option<TimestampValues> {
        Some(TimestampValues {
            sender: frame.u32_be_at(self.sender)?,
            receiver: frame.u32_be_at(self.receiver)?,
        })
    }
}

/// TSval / TSecr in host byte order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestampValues {
    pub sender: u32,
    pub receiver: u32,
}

/// Result of parsing one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOutcome {
    disposition: Disposition,
    timestamps: Option<TimestampLocation>,
}

impl ParseOutcome {
    #[inline(always)]
    fn stopped(disposition: Disposition) -> Self {
        Self {
            disposition,
            timestamps: None,
        }
    }

    #[inline(always)]
    pub fn verdict(&self) -> Verdict {
        self.disposition.verdict()
    }

    #[inline(always)]
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    #[inline(always)]
    pub fn timestamps(&self) -> Option<TimestampLocation> {
        self.timestamps
    }
}

/// Parse one frame
#[inline(always)]
pub fn parse_frame(frame: &Frame<'_>) -> ParseOutcome {
    let Some(eth) = frame.overlay::<EthHdr>(0) else {
        return ParseOutcome::stopped(Disposition::Truncated);
    };

    if eth.ether_type() != ETH_P_IP {
        return ParseOutcome::stopped(Disposition::NotIpv4);
    }

    let Some(ip) = frame.overlay::<Ipv4Hdr>(EthHdr::LEN) else {
        return ParseOutcome::stopped(Disposition::Truncated);
    };

    if ip.proto != IPPROTO_TCP {
        return ParseOutcome::stopped(Disposition::NotTcp);
    }

    let tcp_off = EthHdr::LEN + ip.header_len();
    let Some(tcp) = frame.overlay::<TcpHdr>(tcp_off) else {
        return ParseOutcome::stopped(Disposition::Truncated);
    };

    let options_len = tcp.options_len();
    if options_len == 0 {
        return ParseOutcome::stopped(Disposition::NoOptions);
    }

    let options_off = tcp_off + TcpHdr::LEN;
    let timestamps = find_timestamp_payload(frame, options_off, options_len)
        .filter(|&start| frame.contains(start, TCPOPT_TIMESTAMP_PAYLOAD_LEN))
        .map(|start| TimestampLocation {
            sender: start,
            receiver: start + 4,
        });

    ParseOutcome {
        disposition: Disposition::OptionsScanned,
        timestamps,
    }
}

/// Scan the options region for the first timestamp option.
///
/// Returns the frame offset of its payload. The loop runs at most
/// `TCP_OPTIONS_MAX_LEN` times and the cursor never leaves
/// `[0, min(options_len, TCP_OPTIONS_MAX_LEN))`, whatever the option bytes say.
#[inline(always)]
fn find_timestamp_payload(frame: &Frame<'_>, options_off: usize, options_len: usize) -> Option<usize> {
    let limit = if options_len < TCP_OPTIONS_MAX_LEN {
        options_len
    } else {
        TCP_OPTIONS_MAX_LEN
    };
    let mut cursor = 0usize;

    for _ in 0..TCP_OPTIONS_MAX_LEN {
        if cursor >= limit {
            break;
        }

        let kind = frame.u8_at(options_off + cursor)?;

        match kind {
            TCPOPT_NOP => cursor += 1,
            TCPOPT_EOL => break,
            TCPOPT_TIMESTAMP => {
                return Some(options_off + cursor + TCPOPT_TIMESTAMP_PAYLOAD_OFFSET);
            }
            _ => {
                let len = frame.u8_at(options_off + cursor + 1)?;
                // Zero length would never advance
                cursor += if len > 0 { len as usize } else { 1 };
            }
        }
    }

    None
}
