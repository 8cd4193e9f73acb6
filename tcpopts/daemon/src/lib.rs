//! tcpopts Userspace Library
//!
//! Loads the XDP timestamp locator, attaches it to an interface with
//! driver -> generic fallback, and detaches it on shutdown.

pub mod attach;
pub mod cli;
pub mod error;
pub mod exporter;
pub mod interface;
pub mod loader;
pub mod shutdown;
pub mod types;

pub use attach::{AttachMode, AttachState, AttachedHandle, AttachmentManager, XdpAttach};
pub use error::ProbeError;
pub use interface::Interface;
pub use loader::ProgramLoader;
pub use shutdown::ShutdownFlag;
pub use types::*;
