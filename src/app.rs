//! Application facade tying the router to the process supervisor.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::{SeedConfig, TlsConfig};
use crate::lifecycle::signals::forward_os_signals;
use crate::lifecycle::{
    serve_inherited, ExecLauncher, Mode, Supervisor, SupervisorError, WorkerLauncher,
};
use crate::net::tls::load_tls_config;
use crate::routing::{Router, RouterService};

/// An application served by a master/worker process pair.
///
/// The same program runs in both roles: in the master, [`Seed::run`] binds
/// the socket and supervises workers; in a worker it serves the router on
/// the inherited socket. Register every route before calling `run`.
pub struct Seed<L = ExecLauncher> {
    config: SeedConfig,
    config_path: Option<PathBuf>,
    service: RouterService,
    supervisor: Supervisor<L>,
}

impl Seed<ExecLauncher> {
    /// Serve `router` with workers that re-execute the current binary.
    pub fn new(config: SeedConfig, router: Router) -> Result<Self, SupervisorError> {
        let launcher = ExecLauncher::current().map_err(SupervisorError::Spawn)?;
        Ok(Self::with_launcher(config, router, launcher))
    }
}

impl<L: WorkerLauncher> Seed<L> {
    pub fn with_launcher(config: SeedConfig, router: Router, launcher: L) -> Self {
        let supervisor = Supervisor::new(config.supervisor.clone(), launcher);
        Self {
            config,
            config_path: None,
            service: router.into_service(),
            supervisor,
        }
    }

    /// Watch `path` in the master and hot reload when it changes.
    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    pub fn service(&self) -> &RouterService {
        &self.service
    }

    pub fn supervisor(&self) -> &Supervisor<L> {
        &self.supervisor
    }

    /// Serve plain HTTP. `addr` overrides the configured bind address.
    pub async fn run(&self, addr: Option<&str>) -> Result<(), SupervisorError> {
        self.start(addr, self.config.listener.tls.clone()).await
    }

    /// Serve HTTPS with the given PEM files.
    pub async fn run_tls(
        &self,
        cert_path: &str,
        key_path: &str,
        addr: Option<&str>,
    ) -> Result<(), SupervisorError> {
        let tls = TlsConfig {
            cert_path: cert_path.to_string(),
            key_path: key_path.to_string(),
        };
        self.start(addr, Some(tls)).await
    }

    async fn start(&self, addr: Option<&str>, tls: Option<TlsConfig>) -> Result<(), SupervisorError> {
        let mut config = self.config.clone();
        if let Some(addr) = addr {
            config.listener.bind_address = addr.to_string();
        }
        config.listener.tls = tls;

        match Mode::current() {
            Mode::Master => self.supervise(&config).await,
            Mode::Worker => serve_inherited(self.service.clone(), &config).await,
        }
    }

    async fn supervise(&self, config: &SeedConfig) -> Result<(), SupervisorError> {
        // Unreadable key material fails the master before any worker spawns.
        if let Some(tls) = &config.listener.tls {
            load_tls_config(tls).await.map_err(SupervisorError::Tls)?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let signals = forward_os_signals(tx.clone()).map_err(SupervisorError::Signal)?;

        let _watcher = match &self.config_path {
            Some(path) => match ConfigWatcher::new(path, tx.clone()).run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, path = ?path, "Config watcher unavailable");
                    None
                }
            },
            None => None,
        };
        drop(tx);

        tracing::info!(
            address = %config.listener.bind_address,
            tls = config.listener.tls.is_some(),
            routes = self.service.router().route_count(),
            "Master starting"
        );

        let result = self.supervisor.run(&config.listener.bind_address, rx).await;
        signals.abort();
        result
    }
}
