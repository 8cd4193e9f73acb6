//! Helper functions for the XDP program

use aya_ebpf::bindings::xdp_action;
use tcpopts_common::parser::Verdict;

use crate::maps::STATS;

/// Increment a statistics counter on the current CPU
#[inline(always)]
pub fn increment_stat(stat_id: u32) {
    // Per-CPU slot, no other invocation touches it concurrently
    unsafe {
        if let Some(count) = STATS.get_ptr_mut(stat_id) {
            *count += 1;
        }
    }
}

/// Map a parser verdict to an XDP action code
#[inline(always)]
pub fn xdp_verdict(verdict: Verdict) -> u32 {
    match verdict {
        Verdict::Pass => xdp_action::XDP_PASS,
        Verdict::Drop => xdp_action::XDP_DROP,
    }
}
