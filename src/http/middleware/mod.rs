//! Continuation-based middleware chain.
//!
//! # Data Flow
//! ```text
//! Context
//!     → m1 ── next.run ──▶ m2 ── next.run ──▶ ... ──▶ terminal handler
//!     ◀──────── unwinds in reverse for code placed after next.run ─────────
//! ```
//!
//! # Design Decisions
//! - Insertion order is execution order
//! - An interceptor that returns without calling `next` stops the chain;
//!   nothing after it runs, including the terminal handler
//! - `Next::run` reports `true` only when the terminal handler was reached
//! - Chains are copied, never shared mutably, when a group extends them

pub mod access_log;
pub mod auth;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::context::Context;
use crate::http::handler::Handler;

pub use access_log::access_log;
pub use auth::bearer_auth;

/// A pipeline stage that may observe, modify, short-circuit, or pass
/// through to the rest of the chain.
pub trait Middleware: Send + Sync + 'static {
    /// Run this stage. Call `next.run(cx)` to continue; return its result
    /// (or `false` without calling it to stop the chain).
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, bool>;
}

/// Shared, type-erased middleware.
pub type MiddlewareRef = Arc<dyn Middleware>;

/// Continuation handed to every interceptor: the not-yet-run remainder of
/// the chain plus the terminal handler.
pub struct Next<'a> {
    remaining: &'a [MiddlewareRef],
    endpoint: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Continue with the next interceptor, or the terminal handler when the
    /// chain is exhausted.
    pub fn run<'c>(self, cx: &'c mut Context) -> BoxFuture<'c, bool>
    where
        'a: 'c,
    {
        match self.remaining.split_first() {
            Some((head, tail)) => head.call(
                cx,
                Next {
                    remaining: tail,
                    endpoint: self.endpoint,
                },
            ),
            None => {
                let endpoint = self.endpoint;
                Box::pin(async move {
                    endpoint.serve(cx).await;
                    true
                })
            }
        }
    }

    /// Number of interceptors still ahead of the terminal handler.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

/// Adapter returned by [`from_fn`].
pub struct MiddlewareFn<F> {
    f: F,
}

/// Build a middleware from a closure returning a boxed future.
///
/// ```ignore
/// let stage = from_fn(|cx, next| Box::pin(async move {
///     if cx.headers().contains_key("x-block") {
///         return false;
///     }
///     next.run(cx).await
/// }));
/// ```
pub fn from_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, bool> + Send + Sync + 'static,
{
    MiddlewareFn { f }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, bool> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, bool> {
        (self.f)(cx, next)
    }
}

/// Middleware that runs `handler` and then continues the chain.
pub struct FromHandler<H> {
    handler: H,
}

/// Run a full handler as a pass-through stage.
pub fn from_handler<H: Handler>(handler: H) -> FromHandler<H> {
    FromHandler { handler }
}

impl<H: Handler> Middleware for FromHandler<H> {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.handler.serve(cx).await;
            next.run(cx).await
        })
    }
}

/// Ordered interceptor list. Cloning copies the list, not the stages.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stack: Vec<MiddlewareRef>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append interceptors in order.
    pub fn push(&mut self, middleware: impl IntoIterator<Item = MiddlewareRef>) {
        self.stack.extend(middleware);
    }

    /// A new chain holding this chain's interceptors followed by `more`.
    ///
    /// The copy is sized from the parent so no inherited stage is lost,
    /// whatever the length of `more`.
    pub fn extended(&self, more: &[MiddlewareRef]) -> Self {
        let mut stack = Vec::with_capacity(self.stack.len() + more.len());
        stack.extend(self.stack.iter().cloned());
        stack.extend(more.iter().cloned());
        Self { stack }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Execute the chain in front of `endpoint`.
    ///
    /// Returns `true` if the request made it through every interceptor to
    /// the terminal handler.
    pub async fn run(&self, cx: &mut Context, endpoint: &dyn Handler) -> bool {
        Next {
            remaining: &self.stack,
            endpoint,
        }
        .run(cx)
        .await
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.stack.len())
            .finish()
    }
}

/// A terminal handler with its middleware chain baked in.
#[derive(Clone)]
pub struct Endpoint {
    chain: MiddlewareChain,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    pub fn new(chain: MiddlewareChain, handler: Arc<dyn Handler>) -> Self {
        Self { chain, handler }
    }

    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Run the chain and handler, returning whether the handler ran.
    pub async fn dispatch(&self, cx: &mut Context) -> bool {
        self.chain.run(cx, self.handler.as_ref()).await
    }
}

impl Handler for Endpoint {
    fn serve<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.dispatch(cx).await;
        })
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("chain", &self.chain).finish()
    }
}
