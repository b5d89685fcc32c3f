//! A registered endpoint.

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::http::context::Context;
use crate::http::handler::Handler;
use crate::http::middleware::Endpoint;

/// Binding of (method, path) to a handler composed with its middleware.
/// Immutable once registered.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    endpoint: Endpoint,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            method,
            path: path.into(),
            endpoint,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path as registered, including any group prefixes.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run the route's chain and handler against `cx`.
    pub async fn dispatch(&self, cx: &mut Context) -> bool {
        self.endpoint.dispatch(cx).await
    }
}

impl Handler for Route {
    fn serve<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, ()> {
        self.endpoint.serve(cx)
    }
}
