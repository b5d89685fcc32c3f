//! Structured access log emitted after the rest of the chain unwinds.

use std::time::Instant;

use futures_util::future::BoxFuture;

use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

/// Log method, path, status and latency for every request passing through.
pub fn access_log() -> AccessLog {
    AccessLog
}

impl Middleware for AccessLog {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let started = Instant::now();
            let method = cx.method().clone();
            let path = cx.path().to_string();

            let reached = next.run(cx).await;

            tracing::info!(
                method = %method,
                path = %path,
                status = cx.status().as_u16(),
                handled = reached,
                latency_ms = started.elapsed().as_millis() as u64,
                "request served"
            );
            reached
        })
    }
}
