//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the dispatcher as the fallback service of an Axum router
//! - Wire up engine layers (tracing, timeout, request ID)
//! - Serve plain or TLS connections on an already-bound listener
//! - Drain in-flight requests when told to stop

use std::future::Future;
use std::net::TcpListener;
use std::time::Duration;

use axum::http::HeaderName;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;
use crate::routing::RouterService;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP server for a frozen dispatcher.
pub struct HttpServer {
    app: Router,
    drain_timeout: Duration,
}

impl HttpServer {
    pub fn new(service: RouterService, timeouts: &TimeoutConfig, drain_timeout: Duration) -> Self {
        Self {
            app: build_app(service, timeouts),
            drain_timeout,
        }
    }

    /// Serve on `listener` until `stop` resolves, then drain.
    ///
    /// New connections are refused as soon as `stop` fires; connections
    /// still open after the drain timeout are closed.
    pub async fn run(
        self,
        listener: TcpListener,
        tls: Option<RustlsConfig>,
        stop: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let handle = Handle::new();

        tracing::info!(
            address = %addr,
            tls = tls.is_some(),
            "HTTP server starting"
        );

        let make_service = self.app.into_make_service();
        match tls {
            Some(tls) => {
                let server = axum_server::tls_rustls::from_tcp_rustls(listener, tls)
                    .handle(handle.clone())
                    .serve(make_service);
                drive(server, handle, stop, self.drain_timeout).await?;
            }
            None => {
                let server = axum_server::from_tcp(listener)
                    .handle(handle.clone())
                    .serve(make_service);
                drive(server, handle, stop, self.drain_timeout).await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum application around the dispatcher.
#[allow(deprecated)]
pub fn build_app(service: RouterService, timeouts: &TimeoutConfig) -> Router {
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .fallback_service(service)
        .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

async fn drive(
    server: impl Future<Output = std::io::Result<()>>,
    handle: Handle,
    stop: impl Future<Output = ()>,
    drain: Duration,
) -> std::io::Result<()> {
    tokio::pin!(server);
    tokio::select! {
        result = &mut server => return result,
        _ = stop => {}
    }

    tracing::info!(
        connections = handle.connection_count(),
        drain_ms = drain.as_millis() as u64,
        "Draining connections"
    );
    handle.graceful_shutdown(Some(drain));
    server.await
}
