//! XDP attachment with driver -> generic fallback
//!
//! The manager walks an ordered list of attachment modes and keeps the first
//! one the kernel accepts. Driver (native) mode runs the program inside the
//! NIC driver and is not supported everywhere; generic mode runs it on the
//! SKB path and is always available.
//!
//! ```text
//! Unattached -> FastModeAttempted -> AttachedFast
//!                     |
//!                     v
//!              FallbackAttempted -> AttachedCompat
//!                     |
//!                     v
//!                   Failed
//! ```

use std::{error::Error, fmt, io};

use aya::programs::{xdp::XdpLinkId, Xdp, XdpFlags};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{error::ProbeError, interface::Interface};

/// How the XDP program is hooked into the receive path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachMode {
    /// Driver mode (fast path, needs driver support)
    Native,
    /// Generic SKB mode (compatibility path)
    Generic,
}

impl AttachMode {
    /// Attach flags for this mode
    ///
    /// Only the mode bit: `bpf_link_create` rejects anything else with
    /// `EINVAL`. A link never replaces a program already on the interface,
    /// the kernel answers `EBUSY` instead.
    pub fn flags(self) -> XdpFlags {
        match self {
            AttachMode::Native => XdpFlags::DRV_MODE,
            AttachMode::Generic => XdpFlags::SKB_MODE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttachMode::Native => "native",
            AttachMode::Generic => "generic",
        }
    }
}

impl fmt::Display for AttachMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attachment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    FastModeAttempted,
    AttachedFast,
    FallbackAttempted,
    AttachedCompat,
    Failed,
}

impl AttachState {
    fn attempting(mode: AttachMode) -> Self {
        match mode {
            AttachMode::Native => AttachState::FastModeAttempted,
            AttachMode::Generic => AttachState::FallbackAttempted,
        }
    }

    fn attached(mode: AttachMode) -> Self {
        match mode {
            AttachMode::Native => AttachState::AttachedFast,
            AttachMode::Generic => AttachState::AttachedCompat,
        }
    }

    pub fn is_attached(self) -> bool {
        matches!(self, AttachState::AttachedFast | AttachState::AttachedCompat)
    }
}

/// Kernel rejection of an attach or detach request
///
/// Carries the negated errno when the underlying error exposes one.
#[derive(Debug)]
pub struct AttachFailure {
    errno: Option<i32>,
    message: String,
}

impl AttachFailure {
    pub fn from_errno(errno: i32) -> Self {
        Self {
            errno: Some(errno),
            message: io::Error::from_raw_os_error(errno).to_string(),
        }
    }

    /// Flatten an error chain, picking up the first OS error code in it
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut errno = os_errno(err);
        let mut message = err.to_string();
        let mut current = err.source();

        while let Some(e) = current {
            errno = errno.or_else(|| os_errno(e));
            message.push_str(": ");
            message.push_str(&e.to_string());
            current = e.source();
        }

        Self { errno, message }
    }

    /// Negated system error code, as returned by the attach syscall
    pub fn code(&self) -> Option<i32> {
        self.errno.map(|errno| -errno)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AttachFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for AttachFailure {}

fn os_errno(err: &(dyn Error + 'static)) -> Option<i32> {
    err.downcast_ref::<io::Error>().and_then(io::Error::raw_os_error)
}

/// A program that can be hooked onto an interface
pub trait XdpAttach {
    type LinkId;

    fn attach_mode(&mut self, if_index: u32, mode: AttachMode) -> Result<Self::LinkId, AttachFailure>;

    fn detach_link(&mut self, link: Self::LinkId) -> Result<(), AttachFailure>;
}

impl XdpAttach for Xdp {
    type LinkId = XdpLinkId;

    fn attach_mode(&mut self, if_index: u32, mode: AttachMode) -> Result<XdpLinkId, AttachFailure> {
        self.attach_to_if_index(if_index, mode.flags())
            .map_err(|e| AttachFailure::from_error(&e))
    }

    fn detach_link(&mut self, link: XdpLinkId) -> Result<(), AttachFailure> {
        self.detach(link).map_err(|e| AttachFailure::from_error(&e))
    }
}

/// Tries attachment modes in order, stopping at the first success
#[derive(Debug, Clone)]
pub struct AttachmentManager {
    strategies: Vec<AttachMode>,
}

impl Default for AttachmentManager {
    fn default() -> Self {
        Self::with_fallback()
    }
}

impl AttachmentManager {
    pub fn new(strategies: Vec<AttachMode>) -> Result<Self, ProbeError> {
        if strategies.is_empty() {
            return Err(ProbeError::Argument(
                "at least one XDP attach mode is required".to_string(),
            ));
        }
        Ok(Self { strategies })
    }

    /// Driver mode first, generic mode as fallback
    pub fn with_fallback() -> Self {
        Self {
            strategies: vec![AttachMode::Native, AttachMode::Generic],
        }
    }

    pub fn strategies(&self) -> &[AttachMode] {
        &self.strategies
    }

    /// Attach `program` to `interface`
    ///
    /// Returns the last failure if every mode is rejected. Nothing stays
    /// attached in that case.
    pub fn attach<P: XdpAttach>(
        &self,
        program: &mut P,
        interface: &Interface,
    ) -> Result<AttachedHandle<P::LinkId>, ProbeError> {
        let mut state = AttachState::Unattached;
        let mut last_failure = None;

        for (attempt, &mode) in self.strategies.iter().enumerate() {
            transition(interface, &mut state, AttachState::attempting(mode));

            match program.attach_mode(interface.index(), mode) {
                Ok(link) => {
                    transition(interface, &mut state, AttachState::attached(mode));
                    info!("  ✓ Attached XDP program to {} ({} mode)", interface, mode);
                    return Ok(AttachedHandle {
                        interface: interface.clone(),
                        mode,
                        state,
                        link: Some(link),
                    });
                }
                Err(failure) => {
                    match self.strategies.get(attempt + 1) {
                        Some(next) => warn!(
                            "  ⚠ {} mode not supported on {}: {}. Trying {} mode instead.",
                            mode, interface, failure, next
                        ),
                        None => warn!("  ⚠ {} mode rejected on {}: {}", mode, interface, failure),
                    }
                    last_failure = Some((mode, failure));
                }
            }
        }

        transition(interface, &mut state, AttachState::Failed);

        match last_failure {
            Some((mode, source)) => Err(ProbeError::Attachment {
                interface: interface.name().to_string(),
                mode,
                source,
            }),
            None => Err(ProbeError::Argument(
                "at least one XDP attach mode is required".to_string(),
            )),
        }
    }
}

fn transition(interface: &Interface, state: &mut AttachState, next: AttachState) {
    debug!("{}: {:?} -> {:?}", interface, state, next);
    *state = next;
}

/// Live attachment of the program to one interface
#[derive(Debug)]
pub struct AttachedHandle<L> {
    interface: Interface,
    mode: AttachMode,
    state: AttachState,
    link: Option<L>,
}

impl<L> AttachedHandle<L> {
    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn mode(&self) -> AttachMode {
        self.mode
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    /// Remove the attachment, best effort
    ///
    /// Safe to call any number of times. Returns whether a live attachment
    /// was removed; failures are logged and otherwise ignored so shutdown
    /// always completes.
    pub fn detach<P: XdpAttach<LinkId = L>>(&mut self, program: &mut P) -> bool {
        let Some(link) = self.link.take() else {
            debug!("{}: XDP program already detached", self.interface);
            return false;
        };
        transition(&self.interface, &mut self.state, AttachState::Unattached);

        match program.detach_link(link) {
            Ok(()) => {
                info!("Detached XDP program from {} ({} mode)", self.interface, self.mode);
                true
            }
            Err(source) => {
                let err = ProbeError::Detachment {
                    interface: self.interface.name().to_string(),
                    source,
                };
                warn!("{}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Attach target that replays scripted kernel answers
    #[derive(Default)]
    struct ScriptedProgram {
        answers: VecDeque<Result<(), i32>>,
        detach_errno: Option<i32>,
        attempts: Vec<(u32, AttachMode)>,
        live: Vec<u32>,
        detach_calls: usize,
        next_link: u32,
    }

    impl ScriptedProgram {
        fn answering(answers: &[Result<(), i32>]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Default::default()
            }
        }

        fn modes(&self) -> Vec<AttachMode> {
            self.attempts.iter().map(|(_, mode)| *mode).collect()
        }
    }

    impl XdpAttach for ScriptedProgram {
        type LinkId = u32;

        fn attach_mode(&mut self, if_index: u32, mode: AttachMode) -> Result<u32, AttachFailure> {
            self.attempts.push((if_index, mode));
            // BPF links accept mode bits only
            let link_modes = XdpFlags::SKB_MODE | XdpFlags::DRV_MODE | XdpFlags::HW_MODE;
            if !link_modes.contains(mode.flags()) {
                return Err(AttachFailure::from_errno(libc::EINVAL));
            }
            match self.answers.pop_front().unwrap_or(Err(libc::EINVAL)) {
                Ok(()) => {
                    self.next_link += 1;
                    self.live.push(self.next_link);
                    Ok(self.next_link)
                }
                Err(errno) => Err(AttachFailure::from_errno(errno)),
            }
        }

        fn detach_link(&mut self, link: u32) -> Result<(), AttachFailure> {
            self.detach_calls += 1;
            if let Some(errno) = self.detach_errno {
                return Err(AttachFailure::from_errno(errno));
            }
            self.live.retain(|&l| l != link);
            Ok(())
        }
    }

    fn eth0() -> Interface {
        Interface::new("eth0", 7)
    }

    #[test]
    fn test_fast_mode_first() {
        let mut program = ScriptedProgram::answering(&[Ok(())]);
        let handle = AttachmentManager::with_fallback()
            .attach(&mut program, &eth0())
            .unwrap();

        assert_eq!(program.attempts, vec![(7, AttachMode::Native)]);
        assert_eq!(handle.mode(), AttachMode::Native);
        assert_eq!(handle.state(), AttachState::AttachedFast);
        assert!(handle.is_attached());
    }

    #[test]
    fn test_fallback_retries_once() {
        let mut program = ScriptedProgram::answering(&[Err(libc::EOPNOTSUPP), Ok(())]);
        let handle = AttachmentManager::with_fallback()
            .attach(&mut program, &eth0())
            .unwrap();

        assert_eq!(program.modes(), vec![AttachMode::Native, AttachMode::Generic]);
        assert_eq!(handle.mode(), AttachMode::Generic);
        assert_eq!(handle.state(), AttachState::AttachedCompat);
        assert!(handle.state().is_attached());
        assert_eq!(program.live.len(), 1);
    }

    #[test]
    fn test_both_modes_fail() {
        let mut program =
            ScriptedProgram::answering(&[Err(libc::EOPNOTSUPP), Err(libc::EPERM)]);
        let err = AttachmentManager::with_fallback()
            .attach(&mut program, &eth0())
            .unwrap_err();

        assert_eq!(program.attempts.len(), 2);
        assert!(program.live.is_empty());
        match err {
            ProbeError::Attachment {
                interface,
                mode,
                source,
            } => {
                assert_eq!(interface, "eth0");
                assert_eq!(mode, AttachMode::Generic);
                // Error from the second attempt, negated
                assert_eq!(source.code(), Some(-libc::EPERM));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_single_mode_selection() {
        let mut program = ScriptedProgram::answering(&[Err(libc::EOPNOTSUPP), Ok(())]);
        let manager = AttachmentManager::new(vec![AttachMode::Native]).unwrap();

        assert!(manager.attach(&mut program, &eth0()).is_err());
        assert_eq!(program.modes(), vec![AttachMode::Native]);
    }

    #[test]
    fn test_empty_strategy_list_rejected() {
        assert!(matches!(
            AttachmentManager::new(Vec::new()),
            Err(ProbeError::Argument(_))
        ));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut program = ScriptedProgram::answering(&[Ok(())]);
        let mut handle = AttachmentManager::with_fallback()
            .attach(&mut program, &eth0())
            .unwrap();

        assert!(handle.detach(&mut program));
        assert!(!handle.detach(&mut program));
        assert!(!handle.is_attached());
        assert_eq!(handle.state(), AttachState::Unattached);
        assert_eq!(program.detach_calls, 1);
        assert!(program.live.is_empty());
    }

    #[test]
    fn test_detach_failure_not_escalated() {
        let mut program = ScriptedProgram::answering(&[Ok(())]);
        let mut handle = AttachmentManager::with_fallback()
            .attach(&mut program, &eth0())
            .unwrap();
        program.detach_errno = Some(libc::ENODEV);

        assert!(!handle.detach(&mut program));
        assert!(!handle.detach(&mut program));
        assert_eq!(program.detach_calls, 1);
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(AttachMode::Native.flags().bits(), XdpFlags::DRV_MODE.bits());
        assert_eq!(AttachMode::Generic.flags().bits(), XdpFlags::SKB_MODE.bits());
        assert!(!AttachMode::Native.flags().contains(XdpFlags::UPDATE_IF_NOEXIST));
        assert!(!AttachMode::Generic.flags().contains(XdpFlags::UPDATE_IF_NOEXIST));
    }

    #[test]
    fn test_native_unsupported_falls_back_with_link_flags() {
        // Kernel answer for driver mode on an interface without native XDP
        let mut program = ScriptedProgram::answering(&[Err(libc::EOPNOTSUPP), Ok(())]);
        let handle = AttachmentManager::with_fallback()
            .attach(&mut program, &Interface::new("lo", 1))
            .unwrap();

        assert_eq!(program.attempts, vec![(1, AttachMode::Native), (1, AttachMode::Generic)]);
        assert_eq!(handle.mode(), AttachMode::Generic);
        assert_eq!(program.live.len(), 1);
    }

    #[test]
    fn test_failure_from_error_chain() {
        #[derive(Debug)]
        struct Wrapper(io::Error);

        impl fmt::Display for Wrapper {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("netlink error while attaching XDP program")
            }
        }

        impl Error for Wrapper {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                Some(&self.0)
            }
        }

        let failure = AttachFailure::from_error(&Wrapper(io::Error::from_raw_os_error(libc::EBUSY)));
        assert_eq!(failure.code(), Some(-libc::EBUSY));
        assert!(failure.message().starts_with("netlink error"));
    }
}
