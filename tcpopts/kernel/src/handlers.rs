//! XDP entry point
//!
//! Runs [`parse_frame`] on every frame received on the attached interface,
//! counts where parsing stopped, and returns the verdict. The frame is never
//! copied or modified.

use aya_ebpf::{macros::xdp, programs::XdpContext};
use tcpopts_common::{
    constants::{STAT_FRAMES, STAT_TIMESTAMPS_FOUND},
    frame::Frame,
    parser::{parse_frame, TimestampLocation},
};

use crate::helpers::{increment_stat, xdp_verdict};

/// Locate the TCP timestamp option of each received frame
///
/// Attached to: network interface (XDP, driver or generic mode)
#[xdp]
pub fn tcp_timestamps(ctx: XdpContext) -> u32 {
    // SAFETY: data/data_end delimit the frame for this invocation.
    let frame = unsafe { Frame::from_raw(ctx.data(), ctx.data_end()) };
    let outcome = parse_frame(&frame);

    increment_stat(STAT_FRAMES);
    increment_stat(outcome.disposition().stat_index());

    if let Some(location) = outcome.timestamps() {
        increment_stat(STAT_TIMESTAMPS_FOUND);
        trace_timestamps(&ctx, &frame, location);
    }

    xdp_verdict(outcome.verdict())
}

#[cfg(feature = "trace-options")]
#[inline(always)]
fn trace_timestamps(ctx: &XdpContext, frame: &Frame<'_>, location: TimestampLocation) {
    if let Some(values) = location.values(frame) {
        aya_log_ebpf::debug!(
            ctx,
            "TCP timestamps at offset {}: tsval={} tsecr={}",
            location.sender_offset() as u32,
            values.sender,
            values.receiver
        );
    }
}

#[cfg(not(feature = "trace-options"))]
#[inline(always)]
fn trace_timestamps(_ctx: &XdpContext, _frame: &Frame<'_>, _location: TimestampLocation) {}
