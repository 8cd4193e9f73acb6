//! Shared types and the frame parser for the tcpopts XDP program
//!
//! This crate is compiled both into the eBPF object (bpfel-unknown-none)
//! and into the userspace loader, so it stays `no_std` and allocation free.
//! Unit tests run on the host with `std`.

#![cfg_attr(not(test), no_std)]

pub mod constants;
pub mod frame;
pub mod parser;
pub mod types;

// Re-export commonly used types
pub use constants::*;
pub use frame::{Frame, Overlay};
pub use parser::{parse_frame, Disposition, ParseOutcome, TimestampLocation, TimestampValues, Verdict};
pub use types::{EthHdr, Ipv4Hdr, TcpHdr};
