//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use seed_server::config::TimeoutConfig;
use seed_server::http::HttpServer;
use seed_server::routing::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Bind an ephemeral loopback listener the way the master does.
pub fn loopback_listener() -> TcpListener {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    listener
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Client without connection reuse, so every request takes a fresh
/// connection from the listener's accept queue.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// A server running in the background until `stop` is sent.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub stop: oneshot::Sender<()>,
    pub task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Serve `router` on `listener` with the given drain timeout.
pub fn spawn_server(router: Router, listener: TcpListener, drain: Duration) -> RunningServer {
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = HttpServer::new(router.into_service(), &TimeoutConfig::default(), drain);

    let task = tokio::spawn(server.run(listener, None, async move {
        let _ = stopped.await;
    }));
    RunningServer { addr, stop, task }
}
