//! BPF map definitions for the XDP program

use aya_ebpf::{macros::map, maps::PerCpuArray};
use tcpopts_common::constants::MAX_STATS;

/// Statistics counter map
///
/// One slot per STAT_* constant, one copy per CPU so concurrent
/// invocations never share a counter. The loader sums the CPUs.
#[map]
pub static STATS: PerCpuArray<u64> = PerCpuArray::with_max_entries(MAX_STATS, 0);
