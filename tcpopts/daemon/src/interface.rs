//! Network interface resolution

use std::{ffi::CString, fmt, io};

use serde::Serialize;

use crate::error::ProbeError;

/// Interface the program is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    name: String,
    index: u32,
}

impl Interface {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Look up the kernel index of `name`
    pub fn resolve(name: &str) -> Result<Self, ProbeError> {
        let c_name = CString::new(name).map_err(|_| {
            ProbeError::Argument(format!("interface name {name:?} contains a NUL byte"))
        })?;

        let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
        if index == 0 {
            return Err(ProbeError::Resolution {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self::new(name, index))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ifindex {})", self.name, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_loopback() {
        let lo = Interface::resolve("lo").unwrap();
        assert_eq!(lo.name(), "lo");
        assert!(lo.index() > 0);
    }

    #[test]
    fn test_unknown_interface() {
        let err = Interface::resolve("tcpopts-nope0").unwrap_err();
        assert!(matches!(err, ProbeError::Resolution { ref name, .. } if name == "tcpopts-nope0"));
    }

    #[test]
    fn test_nul_byte_is_argument_error() {
        assert!(matches!(
            Interface::resolve("eth\0"),
            Err(ProbeError::Argument(_))
        ));
    }
}
