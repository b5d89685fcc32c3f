//! Worker-side serving on the inherited socket.

use crate::config::SeedConfig;
use crate::http::server::HttpServer;
use crate::lifecycle::signals::stop_requested;
use crate::lifecycle::SupervisorError;
use crate::net::listener::inherit;
use crate::net::tls::load_tls_config;
use crate::net::INHERITED_FD;
use crate::routing::RouterService;

/// Serve `service` on the listener inherited from the master until SIGINT or
/// SIGTERM, then drain for at most the configured drain timeout.
pub async fn serve_inherited(
    service: RouterService,
    config: &SeedConfig,
) -> Result<(), SupervisorError> {
    let listener = inherit(INHERITED_FD)?;

    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(tls).await.map_err(SupervisorError::Tls)?),
        None => None,
    };
    let stop = stop_requested().map_err(SupervisorError::Signal)?;

    HttpServer::new(
        service,
        &config.timeouts,
        config.supervisor.drain_timeout(),
    )
    .run(listener, tls, stop)
    .await
    .map_err(SupervisorError::Serve)
}
