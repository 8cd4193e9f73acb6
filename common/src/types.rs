//! Header views overlaid on the frame buffer
//!
//! Every field is a byte array so the structs have alignment 1 and can be
//! cast onto any offset of the packet. Multi-byte fields are in network byte
//! order; accessors convert to host order.

use crate::frame::Overlay;

/// Ethernet II header
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct EthHdr {
    /// Destination MAC address
    pub dst_addr: [u8; 6],
    /// Source MAC address
    pub src_addr: [u8; 6],
    /// EtherType (network byte order)
    pub ether_type: [u8; 2],
}

impl EthHdr {
    pub const LEN: usize = core::mem::size_of::<Self>();

    #[inline(always)]
    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.ether_type)
    }
}

/// IPv4 header without options
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Ipv4Hdr {
    /// Version (high nibble) and IHL (low nibble)
    pub vihl: u8,
    pub tos: u8,
    pub tot_len: [u8; 2],
    pub id: [u8; 2],
    pub frag_off: [u8; 2],
    pub ttl: u8,
    pub proto: u8,
    pub check: [u8; 2],
    pub src_addr: [u8; 4],
    pub dst_addr: [u8; 4],
}

impl Ipv4Hdr {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Header length in 32-bit words
    #[inline(always)]
    pub fn ihl(&self) -> u8 {
        self.vihl & 0x0f
    }

    /// Header length in bytes, options included
    #[inline(always)]
    pub fn header_len(&self) -> usize {
        self.ihl() as usize * 4
    }
}

/// TCP header without options
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TcpHdr {
    pub source: [u8; 2],
    pub dest: [u8; 2],
    pub seq: [u8; 4],
    pub ack_seq: [u8; 4],
    /// Data offset (4 bits), reserved (3 bits), flags (9 bits)
    pub off_res_flags: [u8; 2],
    pub window: [u8; 2],
    pub check: [u8; 2],
    pub urg_ptr: [u8; 2],
}

impl TcpHdr {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Data offset in 32-bit words
    #[inline(always)]
    pub fn doff(&self) -> u8 {
        self.off_res_flags[0] >> 4
    }

    /// Length of the options region in bytes, zero for malformed offsets
    #[inline(always)]
    pub fn options_len(&self) -> usize {
        (self.doff() as usize * 4).saturating_sub(Self::LEN)
    }
}

// SAFETY: plain byte arrays, alignment 1, every bit pattern is valid.
unsafe impl Overlay for EthHdr {}
unsafe impl Overlay for Ipv4Hdr {}
unsafe impl Overlay for TcpHdr {}

// Compile-time layout checks
// These will fail to compile if a header picks up padding or alignment
const _: () = {
    assert!(EthHdr::LEN == 14);
    assert!(Ipv4Hdr::LEN == 20);
    assert!(TcpHdr::LEN == 20);
    assert!(core::mem::align_of::<EthHdr>() == 1);
    assert!(core::mem::align_of::<Ipv4Hdr>() == 1);
    assert!(core::mem::align_of::<TcpHdr>() == 1);
};
