//! Process role detection.

use std::fmt;
use std::sync::OnceLock;

/// Environment variable a master sets on the workers it spawns.
pub const ROLE_ENV: &str = "SEED_PROCESS_ROLE";

/// The only value of [`ROLE_ENV`] that selects the worker role.
pub const ROLE_WORKER: &str = "worker";

/// Role of this process, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Owns the listening socket and supervises workers.
    Master,
    /// Serves requests on a socket inherited from the master.
    Worker,
}

impl Mode {
    /// Interpret a role marker. Anything but the exact worker marker,
    /// including garbage, means master.
    pub fn from_marker(marker: Option<&str>) -> Self {
        match marker {
            Some(ROLE_WORKER) => Mode::Worker,
            _ => Mode::Master,
        }
    }

    /// Role of the current process, read from the environment once.
    pub fn current() -> Self {
        static MODE: OnceLock<Mode> = OnceLock::new();
        *MODE.get_or_init(|| Mode::from_marker(std::env::var(ROLE_ENV).ok().as_deref()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Master => "master",
            Mode::Worker => "worker",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
