use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::{find_program, WakeLockProvider};
use crate::{Error, Result};

/// How long a freshly spawned inhibitor must survive to count as holding the lock
const STARTUP_GRACE: Duration = Duration::from_millis(150);

/// Platform inhibitor program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InhibitorKind {
    /// `systemd-inhibit` (Linux with logind)
    SystemdInhibit,
    /// `caffeinate` (macOS)
    Caffeinate,
}

impl InhibitorKind {
    fn command(&self) -> &'static str {
        match self {
            InhibitorKind::SystemdInhibit => "systemd-inhibit",
            InhibitorKind::Caffeinate => "caffeinate",
        }
    }

    fn base_args(&self) -> Vec<&'static str> {
        match self {
            InhibitorKind::SystemdInhibit => vec![
                "--what=idle:sleep",
                "--who=prompter",
                "--why=Teleprompter playback",
                "--mode=block",
                "sleep",
                "infinity",
            ],
            InhibitorKind::Caffeinate => vec!["-d", "-i"],
        }
    }

    /// Probe for a native inhibitor on this system
    pub fn detect() -> Option<Self> {
        let candidates: &[InhibitorKind] = if cfg!(target_os = "macos") {
            &[InhibitorKind::Caffeinate]
        } else {
            &[InhibitorKind::SystemdInhibit]
        };

        candidates
            .iter()
            .copied()
            .find(|kind| find_program(kind.command()).is_some())
    }
}

/// Holds the lock by keeping an inhibitor process alive for the session
pub struct InhibitorProvider {
    kind: InhibitorKind,
    child: Option<Child>,
}

impl InhibitorProvider {
    pub fn new(kind: InhibitorKind) -> Self {
        Self { kind, child: None }
    }
}

#[async_trait::async_trait]
impl WakeLockProvider for InhibitorProvider {
    fn name(&self) -> &str {
        self.kind.command()
    }

    async fn acquire(&mut self) -> Result<()> {
        if self.is_held() {
            return Ok(());
        }

        let mut child = Command::new(self.kind.command())
            .args(self.kind.base_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Other(format!("Failed to spawn {}: {}", self.kind.command(), e)))?;

        // An inhibitor that is refused (e.g. by polkit) exits straight away
        match tokio::time::timeout(STARTUP_GRACE, child.wait()).await {
            Ok(Ok(status)) => Err(Error::Other(format!(
                "{} exited immediately ({})",
                self.kind.command(),
                status
            ))),
            Ok(Err(e)) => Err(Error::Other(format!(
                "Failed to wait for {}: {}",
                self.kind.command(),
                e
            ))),
            Err(_) => {
                debug!(program = self.kind.command(), pid = ?child.id(), "Inhibitor running");
                self.child = Some(child);
                Ok(())
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!(program = self.kind.command(), error = %e, "Failed to stop inhibitor");
            }
        }
    }

    fn is_held(&mut self) -> bool {
        let state = match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => return false,
        };
        match state {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(program = self.kind.command(), %status, "Inhibitor exited, lock lost");
                self.child = None;
                false
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inhibitor_commands() {
        assert_eq!(InhibitorKind::SystemdInhibit.command(), "systemd-inhibit");
        assert!(InhibitorKind::SystemdInhibit.base_args().contains(&"--what=idle:sleep"));
        assert_eq!(InhibitorKind::Caffeinate.command(), "caffeinate");
    }

    #[test]
    fn test_fresh_provider_not_held() {
        let mut provider = InhibitorProvider::new(InhibitorKind::SystemdInhibit);
        assert!(!provider.is_held());
        // Releasing without a child is a no-op
        provider.release();
        assert!(!provider.is_held());
    }
}
