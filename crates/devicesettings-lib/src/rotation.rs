//! Rotation refresh — tell the window system to re-layout after a mode change.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

/// Environment variable carrying the `always_send_configuration` flag.
pub const ENV_SEND_CONFIGURATION: &str = "DEVICESETTINGS_SEND_CONFIGURATION";
/// Environment variable carrying the `force_relayout` flag.
pub const ENV_FORCE_RELAYOUT: &str = "DEVICESETTINGS_FORCE_RELAYOUT";

/// Default timeout for the refresh command (30 seconds).
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval when waiting for the refresh command to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fire-and-forget rotation update. Implementations never fail; problems are
/// logged.
pub trait RotationRefresher {
    fn update_rotation(&self, always_send_configuration: bool, force_relayout: bool);
}

/// Does nothing. Used when no rotation command is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRefresher;

impl RotationRefresher for NoopRefresher {
    fn update_rotation(&self, _always_send_configuration: bool, _force_relayout: bool) {}
}

/// Runs a shell command, passing the two flags as `1`/`0` environment
/// variables. Empty commands are ignored.
#[derive(Debug, Clone)]
pub struct CommandRefresher {
    command: String,
    timeout: Duration,
}

impl CommandRefresher {
    pub fn new(command: impl Into<String>) -> Self {
        CommandRefresher {
            command: command.into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl RotationRefresher for CommandRefresher {
    fn update_rotation(&self, always_send_configuration: bool, force_relayout: bool) {
        let command = self.command.trim();
        if command.is_empty() {
            return;
        }
        let env = [
            (ENV_SEND_CONFIGURATION, flag(always_send_configuration)),
            (ENV_FORCE_RELAYOUT, flag(force_relayout)),
        ];
        match run_with_timeout(command, &env, self.timeout) {
            Ok(s) if !s.success() => {
                log::warn!("rotation command exited with {s}: {command}");
            }
            Err(e) => {
                log::warn!("rotation command failed: {e}: {command}");
            }
            _ => log::debug!("rotation updated: {command}"),
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Run a shell command with a timeout. Kills the process if it exceeds the deadline.
fn run_with_timeout(
    command: &str,
    env: &[(&str, &str)],
    timeout: Duration,
) -> io::Result<ExitStatus> {
    let mut child = std::process::Command::new("sh")
        .args(["-c", command])
        .envs(env.iter().copied())
        .spawn()?;

    let max_polls = (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1) as u64;
    for _ in 0..max_polls {
        match child.try_wait()? {
            Some(status) => return Ok(status),
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }

    // Timed out: kill and reap
    log::warn!("rotation command timed out after {timeout:?}, killing: {command}");
    let _ = child.kill();
    child.wait()
}

/// Recording refresher for unit and integration tests.
#[doc(hidden)]
pub mod mock {
    use super::RotationRefresher;
    use std::cell::RefCell;

    #[derive(Default)]
    pub struct MockRefresher {
        /// Recorded calls: (always_send_configuration, force_relayout).
        pub calls: RefCell<Vec<(bool, bool)>>,
    }

    impl MockRefresher {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl RotationRefresher for MockRefresher {
        fn update_rotation(&self, always_send_configuration: bool, force_relayout: bool) {
            self.calls
                .borrow_mut()
                .push((always_send_configuration, force_relayout));
        }
    }
}
