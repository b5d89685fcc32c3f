//! Terminal request handlers.

use std::future::Future;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;

use crate::http::context::Context;

/// The business logic at the end of a middleware chain.
pub trait Handler: Send + Sync + 'static {
    /// Produce a response by writing into the context's sink.
    fn serve<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, ()>;
}

/// Adapter returned by [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Turn an `async fn(Request<Body>) -> impl IntoResponse` into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    HandlerFn { f }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn serve<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let request = cx.take_request();
            let response = (self.f)(request).await;
            cx.respond(response);
        })
    }
}

/// Built-in responder used when no route matches and no custom not-found
/// handler was installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Handler for NotFound {
    fn serve<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            cx.respond((StatusCode::NOT_FOUND, "404 page not found"));
        })
    }
}
