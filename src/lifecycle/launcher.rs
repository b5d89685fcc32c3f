//! Worker process spawning.
//!
//! A worker is a fresh process image that finds the master's listening socket
//! at [`INHERITED_FD`](crate::net::INHERITED_FD) and the role marker in its
//! environment.

use std::ffi::OsString;
use std::io;
use std::net::TcpListener;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use crate::lifecycle::mode::{ROLE_ENV, ROLE_WORKER};
use crate::net::listener::place_inherited;

/// Starts worker processes that inherit the listening socket.
pub trait WorkerLauncher: Send + Sync + 'static {
    /// Spawn one worker. `generation` increases by one per spawn.
    fn launch(&self, listener: &TcpListener, generation: u64) -> io::Result<WorkerHandle>;
}

/// Launches workers by executing a program with the role marker set.
///
/// [`ExecLauncher::current`] re-executes the running binary with its own
/// arguments.
#[derive(Debug, Clone)]
pub struct ExecLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExecLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Launcher for the current executable and command line.
    pub fn current() -> io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: std::env::args_os().skip(1).collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

impl WorkerLauncher for ExecLauncher {
    fn launch(&self, listener: &TcpListener, generation: u64) -> io::Result<WorkerHandle> {
        let fd = listener.as_raw_fd();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(ROLE_ENV, ROLE_WORKER)
            .kill_on_drop(true);

        // SAFETY: `place_inherited` only calls dup2/fcntl, which are
        // async-signal-safe, and touches no memory shared with the parent.
        unsafe {
            command.pre_exec(move || place_inherited(fd));
        }

        let child = command.spawn()?;
        let handle = WorkerHandle::new(child, generation)?;

        tracing::info!(
            pid = handle.pid(),
            generation,
            program = ?self.program,
            "Worker spawned"
        );
        Ok(handle)
    }
}

/// A spawned worker owned by the supervisor.
#[derive(Debug)]
pub struct WorkerHandle {
    child: Child,
    pid: u32,
    generation: u64,
    started: Instant,
}

impl WorkerHandle {
    /// Wrap a freshly spawned child. Fails if it has already been reaped.
    pub fn new(child: Child, generation: u64) -> io::Result<Self> {
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("worker exited before it could be tracked"))?;
        Ok(Self {
            child,
            pid,
            generation,
            started: Instant::now(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Wait for the worker to exit. Cancel safe.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Ask the worker to drain and exit.
    pub fn terminate(&self) -> io::Result<()> {
        let pid = i32::try_from(self.pid).map_err(io::Error::other)?;
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            // Exited but not yet reaped.
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Terminate the worker and reap it, killing it if it outlives `deadline`.
    pub async fn stop(mut self, deadline: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        self.terminate()?;
        match tokio::time::timeout(deadline, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(pid = self.pid, generation = self.generation, %status, "Worker stopped");
                Ok(status)
            }
            Err(_) => {
                tracing::warn!(
                    pid = self.pid,
                    generation = self.generation,
                    deadline_ms = deadline.as_millis() as u64,
                    "Worker ignored stop deadline, killing"
                );
                self.child.start_kill()?;
                self.child.wait().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").unwrap()
    }

    #[tokio::test]
    async fn launches_with_role_marker() {
        let launcher = ExecLauncher::new("sh")
            .arg("-c")
            .arg(format!("test \"${ROLE_ENV}\" = {ROLE_WORKER}"));

        let mut worker = launcher.launch(&listener(), 1).unwrap();
        assert_eq!(worker.generation(), 1);
        assert!(worker.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn listener_is_placed_at_inherited_descriptor() {
        let launcher = ExecLauncher::new("sh")
            .arg("-c")
            .arg("case $(readlink /proc/$$/fd/3) in socket:*) exit 0 ;; esac; exit 1");

        let mut worker = launcher.launch(&listener(), 1).unwrap();
        assert!(worker.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn stop_terminates_worker() {
        let worker = ExecLauncher::new("sleep").arg("30").launch(&listener(), 1).unwrap();

        let status = worker.stop(Duration::from_secs(5)).await.unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    }

    #[tokio::test]
    async fn stop_kills_worker_past_deadline() {
        let worker = ExecLauncher::new("sh")
            .arg("-c")
            .arg("trap '' TERM; sleep 30")
            .launch(&listener(), 1)
            .unwrap();
        // Let the shell install its trap.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = worker.stop(Duration::from_millis(200)).await.unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let result = ExecLauncher::new("/nonexistent/seed-worker").launch(&listener(), 1);
        assert!(result.is_err());
    }
}
