//! Error taxonomy for the loader
//!
//! Every setup failure is fatal and surfaces through `main` as an
//! `anyhow::Error`. Detachment and stats failures are only ever logged.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::attach::{AttachFailure, AttachMode};

/// Boxed diagnostic from aya (I/O error, ELF parse error, verifier log)
pub type Diagnostic = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while setting up or tearing down the probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Missing or invalid command-line input
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Interface name does not resolve to an index
    #[error("interface `{name}` not found: {source}")]
    Resolution {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Object file missing, malformed, or rejected by the verifier
    #[error("failed to load eBPF program from {}: {what}", path.display())]
    Load {
        path: PathBuf,
        what: String,
        #[source]
        source: Diagnostic,
    },

    /// Every attachment mode was rejected
    #[error("failed to attach XDP program to `{interface}` (last tried {mode}): {source}")]
    Attachment {
        interface: String,
        mode: AttachMode,
        #[source]
        source: AttachFailure,
    },

    /// Removing the attachment failed
    #[error("failed to detach XDP program from `{interface}`: {source}")]
    Detachment {
        interface: String,
        #[source]
        source: AttachFailure,
    },

    /// Statistics map missing or unreadable
    #[error("failed to read parser statistics: {0}")]
    Stats(String),

    /// Report could not be written
    #[error("failed to export statistics to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: Diagnostic,
    },
}

impl ProbeError {
    /// Create a load error
    pub fn load(
        path: impl Into<PathBuf>,
        what: impl Into<String>,
        source: impl Into<Diagnostic>,
    ) -> Self {
        Self::Load {
            path: path.into(),
            what: what.into(),
            source: source.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            ProbeError::Argument(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_error_carries_negated_errno() {
        let err = ProbeError::Attachment {
            interface: "eth0".to_string(),
            mode: AttachMode::Generic,
            source: AttachFailure::from_errno(libc::EOPNOTSUPP),
        };

        let message = err.to_string();
        assert!(message.contains("eth0"));
        assert!(message.contains("generic"));
        assert!(message.contains(&format!("{}", -libc::EOPNOTSUPP)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProbeError::Argument("x".into()).exit_code(), 2);
        assert_eq!(ProbeError::Stats("x".into()).exit_code(), 1);
    }
}
