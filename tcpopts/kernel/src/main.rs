//! tcpopts - Kernel Space Program
//!
//! XDP program that locates the TCP timestamp option (kind 8) of every
//! frame received on the attached interface, before the kernel's network
//! stack sees it.
//!
//! ## Architecture
//!
//! ```text
//! NIC rx -> tcp_timestamps() -> parse_frame()  (tcpopts-common)
//!                  |
//!                  v
//!           STATS per-CPU counters -> read by the loader on shutdown
//! ```
//!
//! Frames too short for a mandatory header are dropped, everything else
//! passes.
//!
//! ## Usage
//!
//! This program must be compiled for the bpfel-unknown-none target:
//!
//! ```bash
//! cargo build --release --target=bpfel-unknown-none -p tcpopts-ebpf
//! ```
//!
//! Install the object as `/etc/tcpopts/xdp.o` or pass it to the loader
//! with `--obj`.

#![no_std]
#![no_main]

mod handlers;
mod helpers;
mod maps;

pub use handlers::tcp_timestamps;
pub use maps::STATS;

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    // The verifier rejects any program that could reach this
    loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 4] = *b"GPL\0";
