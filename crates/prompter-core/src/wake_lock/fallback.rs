use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{find_program, WakeLockProvider};
use crate::{Error, Result};

const PROGRAM: &str = "xdg-screensaver";
const ARGS: &[&str] = &["reset"];

/// Upper bound on a single keep-awake nudge
const NUDGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Keeps the display awake by periodically resetting the screensaver idle timer
///
/// Used where no inhibitor is available. The session is held while the
/// heartbeat task is alive.
pub struct HeartbeatProvider {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatProvider {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_secs(1)),
            task: None,
        }
    }

    pub fn is_available() -> bool {
        find_program(PROGRAM).is_some()
    }
}

async fn nudge() -> Result<()> {
    let run = Command::new(PROGRAM)
        .args(ARGS)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    let status = tokio::time::timeout(NUDGE_TIMEOUT, run)
        .await
        .map_err(|_| Error::Other(format!("{} timed out", PROGRAM)))??;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Other(format!("{} failed ({})", PROGRAM, status)))
    }
}

#[async_trait::async_trait]
impl WakeLockProvider for HeartbeatProvider {
    fn name(&self) -> &str {
        PROGRAM
    }

    async fn acquire(&mut self) -> Result<()> {
        if self.is_held() {
            return Ok(());
        }

        // The first nudge runs inline so a broken mechanism is reported to the caller
        nudge().await?;

        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the inline nudge already covered it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = nudge().await {
                    warn!(error = %e, "Keep-awake heartbeat failed");
                }
            }
        }));
        debug!(interval_secs = interval.as_secs(), "Keep-awake heartbeat started");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Keep-awake heartbeat stopped");
        }
    }

    fn is_held(&mut self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for HeartbeatProvider {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_floor() {
        let provider = HeartbeatProvider::new(Duration::from_millis(10));
        assert_eq!(provider.interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_release_without_task() {
        let mut provider = HeartbeatProvider::new(Duration::from_secs(30));
        assert!(!provider.is_held());
        provider.release();
        assert!(!provider.is_held());
    }
}
