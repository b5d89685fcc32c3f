//! Master-side worker supervision.
//!
//! # Responsibilities
//! - Bind the listening socket once and keep it open across reloads
//! - Keep exactly one current worker alive, respawning it when it exits
//! - Overlap old and new workers on reload so no connection is refused
//! - Drain everything on shutdown
//!
//! # Design Decisions
//! - One monitor loop owns every worker handle; control events and exit
//!   notifications are serialized through a biased `select!`, so a reload
//!   racing an exit never spawns two workers off one event
//! - Shutdown is checked first on every iteration, and queued control
//!   events are drained before every spawn so a pending shutdown
//!   suppresses it
//! - Retired workers are stopped by background tasks that the shutdown
//!   latch cuts short

use std::io;
use std::net::TcpListener;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::config::SupervisorConfig;
use crate::lifecycle::launcher::{WorkerHandle, WorkerLauncher};
use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};
use crate::lifecycle::signals::ControlSignal;
use crate::lifecycle::SupervisorError;
use crate::net::SharedListener;
use crate::resilience::Backoff;

/// Workers that die sooner than this after spawning count as failed starts.
const MIN_HEALTHY_UPTIME: Duration = Duration::from_secs(1);

/// Observable supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Uninitialized,
    MasterBound,
    WorkerAlive,
    WorkerRespawning,
    Draining,
    Terminated,
}

enum Event {
    Control(ControlSignal),
    Exited(io::Result<ExitStatus>),
}

/// Supervises worker processes serving one shared listening socket.
pub struct Supervisor<L> {
    config: SupervisorConfig,
    launcher: L,
    listener: SharedListener,
    state: watch::Sender<SupervisorState>,
}

impl<L: WorkerLauncher> Supervisor<L> {
    pub fn new(config: SupervisorConfig, launcher: L) -> Self {
        let (state, _) = watch::channel(SupervisorState::Uninitialized);
        Self {
            config,
            launcher,
            listener: SharedListener::new(),
            state,
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn listener(&self) -> &SharedListener {
        &self.listener
    }

    fn set_state(&self, next: SupervisorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "Supervisor state changed");
        }
    }

    /// Bind `addr` (or reuse the socket bound by an earlier run), start a
    /// worker and supervise it until a shutdown event arrives.
    ///
    /// Bind failures and a failed first spawn are returned to the caller.
    /// Later spawn failures are logged and retried with backoff. A closed
    /// control channel is treated as shutdown.
    pub async fn run(
        &self,
        addr: &str,
        mut control: mpsc::UnboundedReceiver<ControlSignal>,
    ) -> Result<(), SupervisorError> {
        let listener = self.listener.get_or_bind(addr)?;
        self.set_state(SupervisorState::MasterBound);

        let shutdown = Shutdown::new();
        let mut retiring = JoinSet::new();
        let mut backoff = Backoff::new(
            self.config.respawn_base_delay_ms,
            self.config.respawn_max_delay_ms,
        );
        let mut generation = 1;

        let first = self
            .launcher
            .launch(&listener, generation)
            .map_err(SupervisorError::Spawn)?;
        let mut current = Some(first);
        self.set_state(SupervisorState::WorkerAlive);

        // Delay before the next respawn attempt while `current` is empty.
        let mut pending = Duration::ZERO;

        loop {
            let Some(worker) = current.as_mut() else {
                self.set_state(SupervisorState::WorkerRespawning);
                if !pending.is_zero() {
                    tracing::info!(delay_ms = pending.as_millis() as u64, "Waiting before respawn");
                    let stop = tokio::select! {
                        biased;
                        event = control.recv() => {
                            matches!(event, None | Some(ControlSignal::Shutdown))
                        }
                        _ = tokio::time::sleep(pending) => false,
                    };
                    if stop {
                        break;
                    }
                }
                if shutdown_pending(&mut control) {
                    break;
                }

                generation += 1;
                match self.launcher.launch(&listener, generation) {
                    Ok(handle) => {
                        current = Some(handle);
                        self.set_state(SupervisorState::WorkerAlive);
                    }
                    Err(e) => {
                        pending = backoff.next_delay();
                        tracing::error!(
                            error = %e,
                            generation,
                            failures = backoff.failures(),
                            "Worker respawn failed"
                        );
                    }
                }
                continue;
            };

            let event = tokio::select! {
                biased;
                event = control.recv() => Event::Control(event.unwrap_or(ControlSignal::Shutdown)),
                status = worker.wait() => Event::Exited(status),
            };

            match event {
                Event::Control(ControlSignal::Shutdown) => break,
                Event::Control(ControlSignal::Reload) => {
                    if shutdown_pending(&mut control) {
                        break;
                    }
                    generation += 1;
                    match self.launcher.launch(&listener, generation) {
                        Ok(fresh) => {
                            if let Some(old) = current.replace(fresh) {
                                tracing::info!(
                                    pid = old.pid(),
                                    generation = old.generation(),
                                    "Retiring worker after reload"
                                );
                                retiring.spawn(retire(
                                    old,
                                    self.config.reload_grace(),
                                    self.config.stop_deadline(),
                                    shutdown.subscribe(),
                                ));
                            }
                        }
                        // The current worker keeps serving.
                        Err(e) => tracing::error!(error = %e, generation, "Reload spawn failed"),
                    }
                }
                Event::Exited(status) => {
                    let uptime = worker.uptime();
                    match status {
                        Ok(status) => tracing::warn!(
                            pid = worker.pid(),
                            generation = worker.generation(),
                            %status,
                            uptime_ms = uptime.as_millis() as u64,
                            "Worker exited unexpectedly"
                        ),
                        Err(e) => tracing::error!(
                            pid = worker.pid(),
                            error = %e,
                            "Failed to wait on worker"
                        ),
                    }
                    current = None;
                    if uptime >= MIN_HEALTHY_UPTIME {
                        backoff.reset();
                        pending = Duration::ZERO;
                    } else {
                        pending = backoff.next_delay();
                    }
                }
            }

            // Reap retire tasks that already finished.
            while let Some(done) = retiring.try_join_next() {
                if let Err(e) = done {
                    tracing::error!(error = %e, "Retire task failed");
                }
            }
        }

        self.drain(listener, current, retiring, &shutdown).await;
        Ok(())
    }

    async fn drain(
        &self,
        listener: Arc<TcpListener>,
        current: Option<WorkerHandle>,
        mut retiring: JoinSet<()>,
        shutdown: &Shutdown,
    ) {
        // Both handles must go for the master's descriptor to close.
        self.listener.close();
        drop(listener);

        self.set_state(SupervisorState::Draining);
        tracing::info!("Supervisor draining");
        shutdown.trigger();

        if let Some(worker) = current {
            let pid = worker.pid();
            if let Err(e) = worker.stop(self.config.stop_deadline()).await {
                tracing::error!(pid, error = %e, "Failed to stop worker");
            }
        }
        while let Some(done) = retiring.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Retire task failed");
            }
        }

        self.set_state(SupervisorState::Terminated);
        tracing::info!("Supervisor terminated");
    }
}

/// Consume queued control events. True if any of them, or a closed
/// channel, asks the supervisor to stop.
fn shutdown_pending(control: &mut mpsc::UnboundedReceiver<ControlSignal>) -> bool {
    loop {
        match control.try_recv() {
            Ok(ControlSignal::Shutdown) | Err(TryRecvError::Disconnected) => return true,
            Ok(ControlSignal::Reload) => {
                tracing::debug!("Coalescing queued reload");
            }
            Err(TryRecvError::Empty) => return false,
        }
    }
}

/// Let `old` overlap with its replacement for `grace`, then stop it.
async fn retire(
    old: WorkerHandle,
    grace: Duration,
    deadline: Duration,
    mut shutdown: ShutdownListener,
) {
    tokio::select! {
        _ = tokio::time::sleep(grace) => {}
        _ = shutdown.wait() => {}
    }
    let pid = old.pid();
    if let Err(e) = old.stop(deadline).await {
        tracing::error!(pid, error = %e, "Failed to stop retired worker");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::launcher::ExecLauncher;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    use std::net::TcpStream;
    use std::sync::Mutex;

    struct Recording {
        inner: ExecLauncher,
        spawned: Arc<Mutex<Vec<u32>>>,
    }

    impl WorkerLauncher for Recording {
        fn launch(&self, listener: &TcpListener, generation: u64) -> io::Result<WorkerHandle> {
            let handle = self.inner.launch(listener, generation)?;
            self.spawned.lock().unwrap().push(handle.pid());
            Ok(handle)
        }
    }

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            drain_timeout_secs: 1,
            stop_timeout_secs: 1,
            reload_grace_ms: 50,
            respawn_base_delay_ms: 10,
            respawn_max_delay_ms: 50,
        }
    }

    fn recording(program: ExecLauncher) -> (Recording, Arc<Mutex<Vec<u32>>>) {
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let launcher = Recording {
            inner: program,
            spawned: Arc::clone(&spawned),
        };
        (launcher, spawned)
    }

    async fn wait_for_spawns(spawned: &Arc<Mutex<Vec<u32>>>, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while spawned.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("workers were not spawned in time");
    }

    fn is_alive(pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[tokio::test]
    async fn reload_overlaps_then_shutdown_stops_everything() {
        let (launcher, spawned) = recording(ExecLauncher::new("sleep").arg("30"));
        let supervisor = Arc::new(Supervisor::new(fast_config(), launcher));
        let mut states = supervisor.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run("127.0.0.1:0", rx).await }
        });

        wait_for_spawns(&spawned, 1).await;
        states
            .wait_for(|s| *s == SupervisorState::WorkerAlive)
            .await
            .unwrap();
        let addr = supervisor.listener().local_addr().unwrap();

        tx.send(ControlSignal::Reload).unwrap();
        wait_for_spawns(&spawned, 2).await;

        let (old, new) = {
            let pids = spawned.lock().unwrap();
            (pids[0], pids[1])
        };
        assert_ne!(old, new);

        // The old worker is retired once the grace period passes.
        tokio::time::timeout(Duration::from_secs(5), async {
            while is_alive(old) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("old worker was not retired");
        assert!(is_alive(new));

        tx.send(ControlSignal::Shutdown).unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(supervisor.state(), SupervisorState::Terminated);
        assert!(!supervisor.listener().is_bound());
        assert!(TcpStream::connect(addr).is_err());
        assert!(!is_alive(new));
        assert_eq!(spawned.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exited_worker_is_respawned() {
        let (launcher, spawned) = recording(ExecLauncher::new("false"));
        let supervisor = Arc::new(Supervisor::new(fast_config(), launcher));
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run("127.0.0.1:0", rx).await }
        });

        wait_for_spawns(&spawned, 3).await;

        tx.send(ControlSignal::Shutdown).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Terminated);
    }

    #[tokio::test]
    async fn closed_control_channel_shuts_down() {
        let (launcher, spawned) = recording(ExecLauncher::new("sleep").arg("30"));
        let supervisor = Supervisor::new(fast_config(), launcher);
        let (tx, rx) = mpsc::unbounded_channel::<ControlSignal>();
        drop(tx);

        supervisor.run("127.0.0.1:0", rx).await.unwrap();

        let pid = spawned.lock().unwrap()[0];
        assert!(!is_alive(pid));
        assert_eq!(supervisor.state(), SupervisorState::Terminated);
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let supervisor = Supervisor::new(fast_config(), ExecLauncher::new("sleep").arg("30"));
        let (_tx, rx) = mpsc::unbounded_channel();

        let err = supervisor.run("not-an-address", rx).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Listener(_)));
        assert_eq!(supervisor.state(), SupervisorState::Uninitialized);
    }

    #[tokio::test]
    async fn first_spawn_failure_is_fatal() {
        let supervisor = Supervisor::new(fast_config(), ExecLauncher::new("/nonexistent/seed-worker"));
        let (_tx, rx) = mpsc::unbounded_channel();

        let err = supervisor.run("127.0.0.1:0", rx).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn(_)));
        assert_eq!(supervisor.state(), SupervisorState::MasterBound);
    }

    #[tokio::test]
    async fn listener_refuses_connections_while_draining() {
        // The worker drops its copy of the socket and ignores SIGTERM, so
        // draining lasts until the kill deadline and only the master could
        // still be accepting.
        let (launcher, spawned) = recording(
            ExecLauncher::new("sh")
                .arg("-c")
                .arg("exec 3>&-; trap '' TERM; sleep 30"),
        );
        let supervisor = Arc::new(Supervisor::new(fast_config(), launcher));
        let mut states = supervisor.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run("127.0.0.1:0", rx).await }
        });

        wait_for_spawns(&spawned, 1).await;
        let addr = supervisor.listener().local_addr().unwrap();
        // Let the shell close its descriptor and install the trap.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(TcpStream::connect(addr).is_ok());

        tx.send(ControlSignal::Shutdown).unwrap();
        states
            .wait_for(|s| *s == SupervisorState::Draining)
            .await
            .unwrap();
        assert!(TcpStream::connect(addr).is_err());

        task.await.unwrap().unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Terminated);
    }

    #[tokio::test]
    async fn queued_shutdown_suppresses_reload_spawn() {
        let (launcher, spawned) = recording(ExecLauncher::new("sleep").arg("30"));
        let supervisor = Arc::new(Supervisor::new(fast_config(), launcher));
        let mut states = supervisor.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run("127.0.0.1:0", rx).await }
        });

        states
            .wait_for(|s| *s == SupervisorState::WorkerAlive)
            .await
            .unwrap();
        tx.send(ControlSignal::Reload).unwrap();
        tx.send(ControlSignal::Shutdown).unwrap();

        task.await.unwrap().unwrap();
        assert_eq!(spawned.lock().unwrap().len(), 1);
        assert_eq!(supervisor.state(), SupervisorState::Terminated);
    }
}
